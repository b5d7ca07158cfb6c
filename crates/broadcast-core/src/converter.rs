//! MPEG-TS Converter: continuity-counter rewriting, PCR discontinuity flagging, and
//! handoff to the DVB Processor for PSI/SI insertion.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use hls_ingest::HlsSegment;
use ts::raw::{self, TS_PACKET_LEN};

use crate::error::ConvertError;
use crate::processor::{validate_segment_length, DvbProcessor};

/// A processed, DVB-ready segment ready for the buffer and sender.
#[derive(Debug, Clone)]
pub struct MpegTsSegment {
    pub data: Bytes,
    pub sequence: u64,
    pub duration: f32,
    pub discontinuity: bool,
    pub fetched_at: std::time::SystemTime,
}

const SENTINEL_PCR_PID: u16 = 0x1FFF;

/// Per-segment rewriter, owning continuity-counter and PCR bookkeeping plus its DVB processor.
pub struct MpegTsConverter {
    continuity_counter_by_pid: HashMap<u16, u8>,
    seen_pids: HashSet<u16>,
    last_pcr: Option<u64>,
    pcr_pid: u16,
    processor: DvbProcessor,
}

impl MpegTsConverter {
    pub fn new(transport_stream_id: u16, network_id: u16) -> Self {
        Self {
            continuity_counter_by_pid: HashMap::new(),
            seen_pids: HashSet::new(),
            last_pcr: None,
            pcr_pid: SENTINEL_PCR_PID,
            processor: DvbProcessor::new(transport_stream_id, network_id),
        }
    }

    /// Convert one fetched HLS segment into a DVB-ready segment.
    ///
    /// Returns `None` (logged) on unrecoverable failure; the caller drops the segment.
    pub fn convert(&mut self, segment: &HlsSegment) -> Option<MpegTsSegment> {
        let aligned_len = match validate_segment_length(&segment.data) {
            Ok(len) => len,
            Err(ConvertError::InvalidSegment) => {
                tracing::warn!(sequence = segment.sequence, "segment too short, dropping");
                return None;
            }
        };
        let mut packets = segment.data[..aligned_len].to_vec();

        if self.pcr_pid == SENTINEL_PCR_PID {
            for chunk in packets.chunks_exact(TS_PACKET_LEN) {
                if raw::is_sync(chunk) && raw::has_pcr(chunk) {
                    self.pcr_pid = raw::pid(chunk);
                    break;
                }
            }
        }

        let mut reissued_this_segment: HashSet<u16> = HashSet::new();
        let mut pcr_discontinuity_pending = segment.discontinuity;

        for chunk in packets.chunks_exact_mut(TS_PACKET_LEN) {
            if !raw::is_sync(chunk) {
                continue;
            }
            let pid = raw::pid(chunk);
            if pid == 0x1FFF {
                continue;
            }

            if raw::has_payload(chunk) {
                let first_sighting = self.seen_pids.insert(pid);
                let reset = first_sighting
                    || (segment.discontinuity && reissued_this_segment.insert(pid));
                let next = if reset {
                    0
                } else {
                    (self.continuity_counter_by_pid.get(&pid).copied().unwrap_or(0) + 1) % 16
                };
                self.continuity_counter_by_pid.insert(pid, next);
                raw::set_continuity_counter(chunk, next);
            }

            if raw::has_pcr(chunk) {
                if pcr_discontinuity_pending {
                    raw::set_discontinuity_indicator(chunk, true);
                    pcr_discontinuity_pending = false;
                }
                if let Some(pcr) = raw::pcr(chunk) {
                    let value = pcr.as_27mhz();
                    if let Some(last) = self.last_pcr {
                        if value < last {
                            tracing::warn!(pid, "PCR went backwards outside expected wrap");
                        }
                    }
                    self.last_pcr = Some(value);
                }
            }
        }

        let with_psi = self.processor.update_psi_tables(&packets, segment.discontinuity);

        Some(MpegTsSegment {
            data: Bytes::from(with_psi),
            sequence: segment.sequence,
            duration: segment.duration,
            discontinuity: segment.discontinuity,
            fetched_at: segment.fetched_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_with_one_payload_packet(sequence: u64, discontinuity: bool) -> HlsSegment {
        let mut p = [0u8; TS_PACKET_LEN];
        p[0] = raw::SYNC_BYTE;
        p[1] = 0x01; // pid 0x100
        p[2] = 0x00;
        p[3] = 0x10; // payload only, cc=0
        HlsSegment {
            data: Bytes::copy_from_slice(&p),
            sequence,
            duration: 4.0,
            discontinuity,
            fetched_at: std::time::SystemTime::now(),
        }
    }

    #[test]
    fn continuity_counter_increments_across_segments() {
        let mut converter = MpegTsConverter::new(1, 1);
        let out1 = converter.convert(&segment_with_one_payload_packet(0, false)).unwrap();
        let out2 = converter.convert(&segment_with_one_payload_packet(1, false)).unwrap();

        let find_content_cc = |data: &[u8]| {
            data.chunks_exact(TS_PACKET_LEN)
                .find(|c| raw::is_sync(c) && raw::pid(c) == 0x0100)
                .map(raw::continuity_counter)
        };
        assert_eq!(find_content_cc(&out1.data), Some(0));
        assert_eq!(find_content_cc(&out2.data), Some(1));
    }

    #[test]
    fn too_short_segment_is_dropped() {
        let mut converter = MpegTsConverter::new(1, 1);
        let segment = HlsSegment {
            data: Bytes::from_static(&[0u8; 10]),
            sequence: 0,
            duration: 4.0,
            discontinuity: false,
            fetched_at: std::time::SystemTime::now(),
        };
        assert!(converter.convert(&segment).is_none());
    }
}
