use bytes::Bytes;
use std::time::SystemTime;

/// A fetched MPEG-TS segment, as produced by the HLS client.
///
/// Consumed once by the converter and discarded; `sequence` is monotonic within one
/// stream session and resets whenever the client is recreated.
#[derive(Debug, Clone)]
pub struct HlsSegment {
    pub data: Bytes,
    pub sequence: u64,
    pub duration: f32,
    pub discontinuity: bool,
    pub fetched_at: SystemTime,
}

/// Immutable facts about the selected rendition, populated once at client startup.
#[derive(Debug, Clone, PartialEq)]
pub struct HlsStreamInfo {
    pub url: String,
    pub bandwidth: u64,
    pub codecs: String,
    pub width: u64,
    pub height: u64,
}

impl Default for HlsStreamInfo {
    /// Cosmetic defaults used only for fields the manifest left unspecified.
    fn default() -> Self {
        Self {
            url: String::new(),
            bandwidth: 2_000_000,
            codecs: "h264,aac".to_string(),
            width: 1280,
            height: 720,
        }
    }
}
