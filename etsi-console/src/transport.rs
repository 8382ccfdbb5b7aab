//! Byte transport for the command loop
//!
//! Input bytes are forwarded to the session through a channel by a reader
//! running on its own task (serial port) or thread (stdin). Replies go out
//! through a single async writer.

use std::io::Read;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Size of one read from the input
const READ_CHUNK: usize = 256;

type Reader = Box<dyn AsyncRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

enum Input {
    Stdin,
    Stream(Reader),
}

/// Where commands come from and replies go to
pub struct Transport {
    name: String,
    input: Input,
    writer: Writer,
}

impl Transport {
    /// Serve commands on stdin/stdout
    pub fn stdio() -> Self {
        Self {
            name: "stdio".to_string(),
            input: Input::Stdin,
            writer: Box::new(tokio::io::stdout()),
        }
    }

    /// Serve commands on a serial port
    pub fn serial(port_name: &str, baud_rate: u32) -> Result<Self, tokio_serial::Error> {
        let stream = tokio_serial::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;
        info!("Opened {} at {} baud", port_name, baud_rate);

        let (reader, writer) = tokio::io::split(stream);
        Ok(Self {
            name: port_name.to_string(),
            input: Input::Stream(Box::new(reader)),
            writer: Box::new(writer),
        })
    }

    /// Human-readable transport name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start forwarding input to `tx` and hand back the writer
    ///
    /// The channel closes when the input reaches end of file or fails.
    pub fn start(self, tx: mpsc::Sender<Vec<u8>>) -> Writer {
        match self.input {
            Input::Stdin => {
                std::thread::spawn(move || read_stdin(tx));
            }
            Input::Stream(reader) => {
                tokio::spawn(read_stream(reader, tx));
            }
        }
        self.writer
    }
}

fn read_stdin(tx: mpsc::Sender<Vec<u8>>) {
    let mut stdin = std::io::stdin().lock();
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        match stdin.read(&mut buffer) {
            Ok(0) => {
                debug!("stdin closed");
                break;
            }
            Ok(n) => {
                if tx.blocking_send(buffer[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("stdin read error: {}", e);
                break;
            }
        }
    }
}

async fn read_stream(mut reader: Reader, tx: mpsc::Sender<Vec<u8>>) {
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                debug!("Input stream closed");
                break;
            }
            Ok(n) => {
                if tx.send(buffer[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!("Serial read error: {}", e);
                break;
            }
        }
    }
}
