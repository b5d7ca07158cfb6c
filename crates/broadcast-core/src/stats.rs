//! Snapshot statistics exposed through the Stream Manager.

/// A point-in-time snapshot of one pipeline's counters.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub segments_processed: u64,
    pub discontinuities_detected: u64,
    pub buffer_fill: usize,
    pub buffer_capacity: usize,
    pub packets_transmitted: u64,
    pub bitrate_bps: f64,
    pub resolution: (u64, u64),
    pub bandwidth: u64,
    pub codecs: String,
}
