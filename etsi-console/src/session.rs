//! Command loop
//!
//! One task owns the instrument. Input arrives over a channel, the simulated
//! transceiver advances on a timer, and replies are written in order.

use std::collections::VecDeque;
use std::time::Duration;

use etsi_protocol::{Instrument, Processed};
use etsi_sim::VirtualTransceiver;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::transport::Transport;

/// Answer every complete command waiting in `source`
pub fn drain(
    instrument: &mut Instrument<VirtualTransceiver>,
    source: &mut VecDeque<u8>,
) -> Vec<u8> {
    let mut sink = Vec::new();
    loop {
        match instrument.process(source, &mut sink) {
            Ok(Processed::Idle) => break,
            Ok(Processed::Executed(outcome)) => debug!("Executed: {:?}", outcome),
            Err(e) => debug!("Framing error: {}", e),
        }
    }
    sink
}

/// Serve `transport` until input closes or the process is interrupted
pub async fn run(
    mut instrument: Instrument<VirtualTransceiver>,
    transport: Transport,
    packet_interval: Duration,
) -> anyhow::Result<()> {
    info!("Serving {} on {}", instrument.device().idn(), transport.name());

    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
    let mut writer = transport.start(tx);
    let mut source = VecDeque::new();

    let mut packets = interval(packet_interval.max(Duration::from_millis(1)));
    packets.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            data = rx.recv() => {
                let Some(bytes) = data else {
                    info!("Input closed");
                    break;
                };
                source.extend(bytes);
                let replies = drain(&mut instrument, &mut source);
                if !replies.is_empty() {
                    writer.write_all(&replies).await?;
                    writer.flush().await?;
                }
            }
            _ = packets.tick() => {
                instrument.driver_mut().tick();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}
