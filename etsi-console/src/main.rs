//! etsi-test: run an ETSI test instrument on stdin/stdout or a serial port
//!
//! The instrument answers the line-oriented command protocol using either a
//! device description file or the built-in RM-01 demo device. PER tests run
//! against a simulated transceiver.

mod session;
mod settings;
mod transport;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use etsi_protocol::Instrument;
use etsi_sim::{DeviceConfig, VirtualTransceiver};
use serialport::{available_ports, SerialPortType};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::ConsoleSettings;
use crate::transport::Transport;

#[derive(Parser, Debug)]
#[command(name = "etsi-test")]
#[command(about = "ETSI radio test instrument command console")]
#[command(version)]
pub struct Args {
    /// Device description (JSON); defaults to the RM-01 demo device
    #[arg(long)]
    pub device: Option<PathBuf>,

    /// Serial port to serve instead of stdin/stdout
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Milliseconds between simulated PER packets
    #[arg(long)]
    pub packet_interval_ms: Option<u64>,

    /// Lose every n-th simulated packet
    #[arg(long)]
    pub loss_every: Option<u16>,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Print the device description as JSON and exit
    #[arg(long)]
    pub dump_device: bool,

    /// Store the effective settings in the settings file
    #[arg(long)]
    pub save_settings: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "etsi_test=info,etsi_protocol=info,etsi_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.list_ports {
        return list_ports();
    }

    let mut settings = ConsoleSettings::load();
    settings.apply(&args);
    if args.save_settings {
        let path = settings.save()?;
        info!("Settings saved to {}", path.display());
    }

    let device = match &settings.device_file {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("Failed to load device from {}", path.display()))?,
        None => DeviceConfig::demo(),
    };
    if args.dump_device {
        println!("{}", device.to_json()?);
        return Ok(());
    }

    let descriptor = device.into_descriptor()?;
    let radio = VirtualTransceiver::from_config(settings.transceiver.clone());
    let instrument = Instrument::with_config(descriptor, radio, settings.instrument.clone())?;

    let transport = match &settings.port {
        Some(port) => Transport::serial(port, settings.baud_rate)
            .with_context(|| format!("Failed to open {}", port))?,
        None => Transport::stdio(),
    };

    session::run(
        instrument,
        transport,
        Duration::from_millis(settings.packet_interval_ms),
    )
    .await
}

fn list_ports() -> anyhow::Result<()> {
    let ports = available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        let description = match port.port_type {
            SerialPortType::UsbPort(usb) => format!(
                "USB {:04x}:{:04x} {}",
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => "Unknown".to_string(),
        };
        println!("{}\t{}", port.port_name, description);
    }
    Ok(())
}
