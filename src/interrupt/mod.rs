//! Multi-layer interruption detection during answer recording.

mod analyzer;
mod types;

pub use analyzer::{InterruptionAnalyzer, InterruptionConfig, InterruptionInput};
pub use types::{
    AudioIssue, AudioMetrics, CheckOutcome, InterruptionEvent, InterruptionReason, Severity,
    Trigger,
};
