//! Serial transport: opening an EBB, auto-detecting its port, and the
//! bounded-backoff reconnect loop that keeps the supervisor resilient to a
//! USB unplug.

use std::time::Duration;

use serial2_tokio::SerialPort;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::error::EbbError;
use super::protocol::FirmwareVersion;

pub const EBB_BAUD_RATE: u32 = 9600;

const RECONNECT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const RECONNECT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Open a serial port at the EBB's fixed baud rate.
pub async fn open(path: &str) -> Result<SerialPort, EbbError> {
    info!(port = %path, "opening EBB serial port");
    Ok(SerialPort::open(path, EBB_BAUD_RATE)?)
}

/// Enumerate candidate serial ports and return the path of the first one
/// that answers a `V` query with a parseable firmware version.
///
/// `serial2` exposes only device paths, not USB manufacturer/VID:PID
/// metadata, so unlike the manufacturer-string match described for desktop
/// drivers this probes each candidate port directly — opening it, sending
/// `V\r`, and checking the reply parses as a firmware version. A plotter
/// that is mid-move when probed simply fails the probe and is skipped; the
/// caller should prefer a configured device path over auto-detection when
/// one is known.
pub async fn detect_port() -> Result<String, EbbError> {
    let candidates = SerialPort::available_ports()?;
    for path in candidates {
        let path = path.to_string_lossy().to_string();
        match probe(&path).await {
            Ok(version) => {
                info!(port = %path, ?version, "found EBB");
                return Ok(path);
            }
            Err(e) => debug!(port = %path, error = %e, "port did not answer as an EBB"),
        }
    }
    Err(EbbError::DeviceNotFound)
}

async fn probe(path: &str) -> Result<FirmwareVersion, EbbError> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
    use tokio::time::timeout;

    let port = open(path).await?;
    let mut io = BufStream::new(port);
    io.write_all(b"V\r").await?;
    io.flush().await?;
    let mut line = String::new();
    timeout(Duration::from_millis(300), io.read_line(&mut line))
        .await
        .map_err(|_| EbbError::Timeout)??;
    FirmwareVersion::parse(line.trim())
}

/// Reopen `path` with exponential backoff (100ms, doubling, capped at 5s),
/// retrying forever. Used after a transport-level disconnect so the
/// supervisor can resume accepting plans once the plotter is reconnected.
pub async fn reconnect_with_backoff(path: &str) -> SerialPort {
    let mut backoff = RECONNECT_INITIAL_BACKOFF;
    loop {
        match open(path).await {
            Ok(port) => return port,
            Err(e) => {
                warn!(port = %path, error = %e, backoff_ms = backoff.as_millis(), "reconnect failed, retrying");
                sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX_BACKOFF);
            }
        }
    }
}
