pub mod merged_view;
pub mod recorded_sink;
pub mod redirection;
pub mod session;
pub mod timestamp;
pub mod types;

pub use merged_view::MergedView;
pub use recorded_sink::RecordedSink;
pub use redirection::{Holder, Redirection, RedirectionRegistry};
pub use session::{capture, CaptureOptions, CaptureScope, CaptureSession, SessionState};
pub use timestamp::TimestampSource;
pub use types::{CaptureSummary, Channel, Record, Transcript, TranscriptEntry};
