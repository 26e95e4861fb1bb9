//! Test support: capture what code under test writes to its output channels
//! and logging handlers, in the order it was written.

pub mod configuration;
pub mod data_capture;
pub mod error_handling;
pub mod logging;
pub mod stdio;

pub use data_capture::{
    capture, CaptureOptions, CaptureScope, CaptureSession, Channel, MergedView,
};
pub use error_handling::types::{CaptureError, ConfigError};
