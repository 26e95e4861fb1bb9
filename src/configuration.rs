pub mod config;

pub use config::{global, reset_global, set_global, CaptureConfig};
