use thiserror::Error;

/// Lifecycle-level failures that bubble up to the Stream Manager.
///
/// Per-segment failures (`InvalidSegment`, `TableBuildFailure`) never reach here: the
/// converter absorbs them into drop counters or pass-through behavior.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("unsupported HLS source: {0}")]
    UnsupportedSource(String),

    #[error("multicast sender initialization failed: {0}")]
    SenderInitFailure(String),

    #[error("stream '{0}' is not configured")]
    UnknownStream(String),
}

/// Per-segment failure inside the converter. Never bubbles past the pipeline worker.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertError {
    #[error("segment has no 188-byte-aligned prefix")]
    InvalidSegment,
}
