//! The EBB serial protocol: command framing, firmware-version gating,
//! sub-step error accumulation, and the transacting driver.

pub mod driver;
pub mod error;
pub mod protocol;
pub mod transport;

pub use driver::EbbDriver;
pub use error::EbbError;
pub use protocol::{FirmwareVersion, MotionStatus, SubStepAccumulator};
pub use transport::{detect_port, open, reconnect_with_backoff, EBB_BAUD_RATE};
