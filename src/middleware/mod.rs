pub mod capture;
pub mod logging;

pub use capture::{CaptureErrors, CapturedError};
pub use logging::{AccessLog, AccessRecord};
