//! The transacting EBB driver: one outstanding serial request at a time,
//! firmware-version gating, and the LM/XM execution paths.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::device::Device;
use crate::motion::{PenMotion, XYMotion};

use super::error::EbbError;
use super::protocol::{
    enable_motors_command, lm_command_for_block, pen_command, pen_command_at_rate, step_multiplier, xm_command,
    FirmwareVersion, MotionStatus, SubStepAccumulator,
};

/// How each transaction expects its reply to terminate.
enum Reply {
    /// A single line (queries: `V`, `QM`).
    Single,
    /// Lines up to and including a line that is exactly `OK` (mutations).
    UntilOk,
}

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
/// Fallback sampling interval for `XM` execution on pre-LM firmware.
const XM_SAMPLE_MS: i64 = 15;

pub struct EbbDriver<T> {
    io: BufStream<T>,
    version: Option<FirmwareVersion>,
    mode: u8,
    accumulator: SubStepAccumulator,
}

impl<T> EbbDriver<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(transport: T) -> Self {
        Self {
            io: BufStream::new(transport),
            version: None,
            mode: 1,
            accumulator: SubStepAccumulator::new(),
        }
    }

    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.version
    }

    /// Reset all driver-local state cached across commands — the firmware
    /// version, microstepping mode, and sub-step accumulator — without
    /// touching the underlying transport. Called after any fatal protocol
    /// error so a stale accumulator or firmware-capability assumption never
    /// carries into the next plot; the next `pre_plot` re-handshakes before
    /// trusting any capability gating.
    pub fn reset_state(&mut self) {
        self.version = None;
        self.mode = 1;
        self.accumulator = SubStepAccumulator::new();
    }

    fn supports_lm(&self) -> bool {
        self.version.is_some_and(FirmwareVersion::supports_lm)
    }

    fn supports_sr(&self) -> bool {
        self.version.is_some_and(FirmwareVersion::supports_sr)
    }

    /// Serialise one transaction: write `cmd` followed by `\r`, then read
    /// reply lines until the expected terminator. Rejects on any line
    /// starting with `!`; the driver never retries — that decision belongs
    /// to the supervisor.
    async fn transact(&mut self, cmd: &str, expect: Reply) -> Result<Vec<String>, EbbError> {
        trace!(tx = %cmd, "EBB ->");
        self.io.write_all(cmd.as_bytes()).await?;
        self.io.write_all(b"\r").await?;
        self.io.flush().await?;

        let mut lines = Vec::new();
        loop {
            let mut raw = String::new();
            let n = timeout(REPLY_TIMEOUT, self.io.read_line(&mut raw))
                .await
                .map_err(|_| EbbError::Timeout)??;
            if n == 0 {
                return Err(EbbError::Disconnected);
            }
            let line = raw.trim().to_string();
            if line.is_empty() {
                continue;
            }
            trace!(rx = %line, "EBB <-");
            if let Some(reason) = line.strip_prefix('!') {
                return Err(EbbError::Rejected(reason.to_string()));
            }
            let done = match expect {
                Reply::Single => true,
                Reply::UntilOk => line == "OK",
            };
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Query `V` and cache the parsed firmware version. Must be called
    /// before any capability-gated command.
    pub async fn handshake(&mut self) -> Result<FirmwareVersion, EbbError> {
        let lines = self.transact("V", Reply::Single).await?;
        let version = FirmwareVersion::parse(&lines[0])?;
        debug!(?version, "EBB handshake complete");
        self.version = Some(version);
        Ok(version)
    }

    /// `EM,m,m` — enable motors at the given microstepping mode and record
    /// it for subsequent step-count scaling.
    pub async fn enable_motors(&mut self, mode: u8) -> Result<(), EbbError> {
        step_multiplier(mode)?;
        self.transact(&enable_motors_command(mode), Reply::UntilOk).await?;
        self.mode = mode;
        self.accumulator = SubStepAccumulator::new();
        Ok(())
    }

    /// Disable motors, preferring the servo power-off timeout (`SR`) over
    /// a blunt `EM,0,0` when the firmware supports it.
    pub async fn disable_motors(&mut self) -> Result<(), EbbError> {
        if self.supports_sr() {
            self.transact("SR,60000000,0", Reply::UntilOk).await?;
        } else {
            self.transact("EM,0,0", Reply::UntilOk).await?;
        }
        Ok(())
    }

    /// `S2,...` — move the RC pen servo for `pen`, on the pin appropriate
    /// to `device`'s hardware variant.
    pub async fn move_pen(&mut self, pen: &PenMotion, device: &Device) -> Result<(), EbbError> {
        let cmd = pen_command(pen, device.hardware.servo_pin());
        self.transact(&cmd, Reply::UntilOk).await?;
        Ok(())
    }

    /// `S2,...` — move the pen servo directly to `final_pos` at a
    /// caller-specified `rate`, used for an operator-driven `setPenHeight`
    /// request outside of a planned `PenMotion`.
    pub async fn set_pen_height(&mut self, final_pos: i32, rate: i32, device: &Device) -> Result<(), EbbError> {
        let cmd = pen_command_at_rate(final_pos, device.hardware.servo_pin(), rate);
        self.transact(&cmd, Reply::UntilOk).await?;
        Ok(())
    }

    /// `HM,rate` — home the carriage.
    pub async fn home(&mut self, rate: u32) -> Result<(), EbbError> {
        self.transact(&format!("HM,{rate}"), Reply::UntilOk).await?;
        Ok(())
    }

    /// `QM` — query motion status.
    pub async fn motion_status(&mut self) -> Result<MotionStatus, EbbError> {
        let lines = self.transact("QM", Reply::Single).await?;
        MotionStatus::parse(&lines[0])
    }

    /// Poll `QM` until both the command and FIFO queues report idle.
    pub async fn wait_idle(&mut self) -> Result<(), EbbError> {
        loop {
            let status = self.motion_status().await?;
            if status.is_idle() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Execute one `XYMotion`: one `LM` per block on LM-capable firmware,
    /// or fixed-interval `XM` sampling of `instant(t)` otherwise.
    pub async fn execute_xy_motion(&mut self, motion: &XYMotion) -> Result<(), EbbError> {
        let mult = step_multiplier(self.mode)? as f64;
        if self.supports_lm() {
            for block in motion.blocks() {
                if let Some(lm) = lm_command_for_block(block, mult, &mut self.accumulator) {
                    self.transact(&lm.to_wire(), Reply::UntilOk).await?;
                }
            }
            return Ok(());
        }

        let duration = motion.duration();
        let step = (XM_SAMPLE_MS as f64) / 1000.0;
        let mut t = 0.0;
        let mut prev = motion.instant(0.0).p;
        while t < duration {
            let next_t = (t + step).min(duration);
            let next_p = motion.instant(next_t).p;
            let dx = next_p.x - prev.x;
            let dy = next_p.y - prev.y;
            let duration_ms = ((next_t - t) * 1000.0).round() as i64;
            if let Some(cmd) = xm_command(duration_ms, dx, dy, mult, &mut self.accumulator) {
                self.transact(&cmd, Reply::UntilOk).await?;
            }
            prev = next_p;
            t = next_t;
        }
        Ok(())
    }
}
