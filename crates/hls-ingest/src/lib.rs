//! HLS (HTTP Live Streaming) ingest: playlist parsing, variant selection, and the
//! blocking client that feeds fetched MPEG-TS segments to a pipeline.

pub mod client;
pub mod error;
pub mod playlist;
pub mod segment;

pub use client::HlsClient;
pub use error::HlsError;
pub use playlist::{MasterPlaylist, MediaPlaylist, ParseOutcome, ParsedPlaylist, SegmentEntry, Variant};
pub use segment::{HlsSegment, HlsStreamInfo};
