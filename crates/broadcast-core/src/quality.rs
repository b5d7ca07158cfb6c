//! TS Quality Monitor: passively observes the transport stream a pipeline emits and
//! reports whether it still looks DVB-compliant.
//!
//! Supplements the normalization path (which repairs continuity counters and reinserts
//! PSI tables) with an independent read: if `analyze` still finds continuity errors or a
//! stale PSI table after the converter has run, something upstream of this monitor is
//! wrong, and that's worth an alert rather than a silent pass-through.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ts::raw::{self, TS_PACKET_LEN};

/// PSI tables must repeat at least this often to stay compliant with ETSI TR 101 211.
const MAX_TABLE_REPETITION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct TsQualityStats {
    pub pcr_discontinuities: u64,
    pub continuity_errors: u64,
    pub pcr_jitter_ms: f64,
    pub total_pcr_count: u64,
    pub bitrate_bps: f64,
    pub total_bytes: u64,
}

struct TableSighting {
    last_seen: Instant,
}

/// Tracks continuity, PCR jitter, and PSI repetition across segments for one pipeline.
pub struct TsQualityMonitor {
    stats: TsQualityStats,
    expected_cc: HashMap<u16, u8>,
    last_pcr: Option<(u64, Instant)>,
    table_sightings: HashMap<u16, TableSighting>,
    window_start: Instant,
    window_bytes: u64,
}

impl TsQualityMonitor {
    pub fn new(psi_pids: &[u16]) -> Self {
        let now = Instant::now();
        Self {
            stats: TsQualityStats::default(),
            expected_cc: HashMap::new(),
            last_pcr: None,
            table_sightings: psi_pids
                .iter()
                .map(|&pid| (pid, TableSighting { last_seen: now }))
                .collect(),
            window_start: now,
            window_bytes: 0,
        }
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        self.stats = TsQualityStats::default();
        self.expected_cc.clear();
        self.last_pcr = None;
        for sighting in self.table_sightings.values_mut() {
            sighting.last_seen = now;
        }
        self.window_start = now;
        self.window_bytes = 0;
    }

    /// Walk every packet in `segment`, updating continuity, PCR jitter, and table-repetition
    /// bookkeeping. Returns a snapshot of the running stats.
    pub fn analyze(&mut self, segment: &[u8]) -> TsQualityStats {
        let now = Instant::now();
        self.window_bytes += segment.len() as u64;
        self.stats.total_bytes += segment.len() as u64;

        for chunk in segment.chunks_exact(TS_PACKET_LEN) {
            if !raw::is_sync(chunk) {
                continue;
            }
            let pid = raw::pid(chunk);

            if let Some(sighting) = self.table_sightings.get_mut(&pid) {
                sighting.last_seen = now;
            }

            if raw::has_payload(chunk) {
                let cc = raw::continuity_counter(chunk);
                if let Some(&expected) = self.expected_cc.get(&pid) {
                    if cc != expected && !raw::discontinuity_indicator(chunk) {
                        self.stats.continuity_errors += 1;
                    }
                }
                self.expected_cc.insert(pid, (cc + 1) % 16);
            }

            if raw::has_pcr(chunk) {
                if raw::discontinuity_indicator(chunk) {
                    self.stats.pcr_discontinuities += 1;
                    self.last_pcr = None;
                }
                if let Some(pcr) = raw::pcr(chunk) {
                    let value = pcr.as_27mhz();
                    self.stats.total_pcr_count += 1;
                    if let Some((last_value, last_time)) = self.last_pcr {
                        let pcr_elapsed_ms = (value.saturating_sub(last_value)) as f64 / 27_000.0;
                        let wall_elapsed_ms = last_time.elapsed().as_secs_f64() * 1000.0;
                        self.stats.pcr_jitter_ms = (pcr_elapsed_ms - wall_elapsed_ms).abs();
                    }
                    self.last_pcr = Some((value, now));
                }
            }
        }

        if self.window_start.elapsed() >= Duration::from_secs(1) {
            self.stats.bitrate_bps = self.window_bytes as f64 * 8.0 / self.window_start.elapsed().as_secs_f64();
            self.window_start = now;
            self.window_bytes = 0;
        }

        self.stats.clone()
    }

    /// Whether every tracked PSI/SI table has repeated within the compliance window.
    pub fn tables_are_current(&self) -> bool {
        let now = Instant::now();
        self.table_sightings
            .values()
            .all(|s| now.duration_since(s.last_seen) <= MAX_TABLE_REPETITION)
    }

    pub fn stats(&self) -> TsQualityStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(pid: u16, cc: u8) -> [u8; TS_PACKET_LEN] {
        let mut p = [0u8; TS_PACKET_LEN];
        p[0] = raw::SYNC_BYTE;
        p[1] = (pid >> 8) as u8;
        p[2] = (pid & 0xFF) as u8;
        p[3] = 0x10 | (cc & 0x0F);
        p
    }

    #[test]
    fn continuity_error_is_flagged_on_unexpected_jump() {
        let mut monitor = TsQualityMonitor::new(&[]);
        monitor.analyze(&packet(0x100, 0));
        let stats = monitor.analyze(&packet(0x100, 5));
        assert_eq!(stats.continuity_errors, 1);
    }

    #[test]
    fn sequential_continuity_counters_raise_no_errors() {
        let mut monitor = TsQualityMonitor::new(&[]);
        monitor.analyze(&packet(0x100, 0));
        let stats = monitor.analyze(&packet(0x100, 1));
        assert_eq!(stats.continuity_errors, 0);
    }
}
