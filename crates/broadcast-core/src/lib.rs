//! # Broadcast Core
//!
//! DVB normalization and multicast emission for live HLS ingest: PSI table synthesis,
//! MPEG-TS continuity repair, the bounded segment buffer, and the multicast sender,
//! tied together by a per-channel pipeline and a single stream manager.
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

pub mod alert;
pub mod buffer;
pub mod config;
pub mod converter;
pub mod error;
pub mod manager;
pub mod multicast;
pub mod pipeline;
pub mod processor;
pub mod quality;
pub mod stats;

pub use alert::{AlertLevel, AlertRecord, AlertSink, InMemoryAlertSink};
pub use config::{AlertsConfig, Config, LoggingConfig, ServerConfig, StreamConfig};
pub use converter::{MpegTsConverter, MpegTsSegment};
pub use error::{ConvertError, CoreError};
pub use manager::StreamManager;
pub use multicast::{MulticastConfig, MulticastSender};
pub use pipeline::{PipelineState, StreamPipeline};
pub use processor::DvbProcessor;
pub use stats::StreamStats;
