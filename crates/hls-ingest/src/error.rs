use thiserror::Error;

/// Failure modes surfaced by the HLS client.
#[derive(Error, Debug)]
pub enum HlsError {
    /// The manifest resolved to a VOD playlist (`#EXT-X-ENDLIST` present).
    #[error("playlist is not live (VOD)")]
    NotLive,

    /// No variant (or the lone media playlist) carries a supported codec/container.
    #[error("no MPEG-TS variant with a supported codec was found")]
    UnsupportedSource,

    /// Transient network failure; the caller should retry with backoff.
    #[error("transient network error: {0}")]
    TransientNetwork(#[source] reqwest::Error),

    /// Retries exhausted; the pipeline should treat the stream as dead.
    #[error("ingest failed permanently after retries: {0}")]
    FatalIngest(String),
}
