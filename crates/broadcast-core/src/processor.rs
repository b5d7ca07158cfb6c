//! DVB Processor: PID analysis, PSI/SI table (re)generation, and insertion into an
//! outgoing MPEG-TS segment.

use std::collections::HashMap;

use ts::dvb::{self, DvbService};
use ts::raw::{self, TS_PACKET_LEN};

use crate::error::ConvertError;

/// Reserved/well-known PIDs this converter's own tables occupy; never classified or kept
/// from the upstream segment.
fn is_psi_pid(pid: u16, pmt_pids: &[u16]) -> bool {
    pid < 0x20 || pid == dvb::PID_SDT || pmt_pids.contains(&pid)
}

/// PSI repetition cadence floor (ETSI EN 300 468 recommends PAT/PMT no less often than
/// every ~100 ms; at typical broadcast bitrates this is well under every 50 packets).
const MIN_REINSERT_PERIOD: usize = 50;

/// Stateful PSI/SI table generator owned by exactly one converter.
pub struct DvbProcessor {
    services: Vec<DvbService>,
    operator_configured: bool,
    transport_stream_id: u16,
    network_id: u16,
    v_pat: u8,
    v_sdt: u8,
    v_nit: u8,
    v_pmt: HashMap<u16, u8>,
    /// Persistent per-PID continuity counter for our own emitted PSI packets (PAT, SDT,
    /// NIT, and every PMT), so repeated insertions of the same table within one segment
    /// — and across segments — increment rather than restart at 0.
    cc_by_pid: HashMap<u16, u8>,
}

impl DvbProcessor {
    /// Initialize with no operator-configured services: a default single-program
    /// placeholder is installed immediately and replaced by discovered PIDs on first use.
    pub fn new(transport_stream_id: u16, network_id: u16) -> Self {
        let default_service = DvbService::default_service();
        let mut v_pmt = HashMap::new();
        v_pmt.insert(default_service.service_id, 0);
        Self {
            services: vec![default_service],
            operator_configured: false,
            transport_stream_id,
            network_id,
            v_pat: 0,
            v_sdt: 0,
            v_nit: 0,
            v_pmt,
            cc_by_pid: HashMap::new(),
        }
    }

    /// Initialize with an operator-configured service set; PID analysis never overwrites it.
    pub fn with_services(transport_stream_id: u16, network_id: u16, services: Vec<DvbService>) -> Self {
        let mut v_pmt = HashMap::new();
        for s in &services {
            v_pmt.insert(s.service_id, 0);
        }
        Self {
            services,
            operator_configured: true,
            transport_stream_id,
            network_id,
            v_pat: 0,
            v_sdt: 0,
            v_nit: 0,
            v_pmt,
            cc_by_pid: HashMap::new(),
        }
    }

    /// Rewrite each packet's continuity counter from `cc_by_pid`, advancing it mod 16.
    /// Every packet `packetize` emits carries a payload, so every one increments.
    fn stamp_cc(&mut self, packets: &mut [[u8; TS_PACKET_LEN]]) {
        for packet in packets {
            let pid = raw::pid(packet);
            let cc = self.cc_by_pid.entry(pid).or_insert(0);
            raw::set_continuity_counter(packet, *cc);
            *cc = (*cc + 1) % 16;
        }
    }

    fn bump_versions(&mut self) {
        self.v_pat = (self.v_pat + 1) % 32;
        self.v_sdt = (self.v_sdt + 1) % 32;
        self.v_nit = (self.v_nit + 1) % 32;
        for v in self.v_pmt.values_mut() {
            *v = (*v + 1) % 32;
        }
    }

    /// Classify PIDs seen in `segment`, excluding our own PSI PIDs, into video/audio/private.
    fn analyze_pids(&self, segment: &[u8]) -> Vec<(u16, u8)> {
        let pmt_pids: Vec<u16> = self.services.iter().map(|s| s.pmt_pid).collect();
        let mut counts: HashMap<u16, u32> = HashMap::new();
        let mut has_pcr: HashMap<u16, bool> = HashMap::new();
        let total_packets = segment.len() / TS_PACKET_LEN;

        for chunk in segment.chunks_exact(TS_PACKET_LEN) {
            if !raw::is_sync(chunk) {
                continue;
            }
            let pid = raw::pid(chunk);
            if pid == 0x1FFF || is_psi_pid(pid, &pmt_pids) {
                continue;
            }
            *counts.entry(pid).or_insert(0) += 1;
            if raw::has_pcr(chunk) {
                has_pcr.insert(pid, true);
            }
        }

        let mut discovered = Vec::new();
        for (pid, count) in counts {
            let stream_type = if *has_pcr.get(&pid).unwrap_or(&false) {
                ts::pmt::StreamType::H264
            } else if total_packets > 0 && (count as f64 / total_packets as f64) > 0.05 {
                ts::pmt::StreamType::Aac
            } else {
                ts::pmt::StreamType::Other(0x00)
            };
            discovered.push((pid, u8::from(stream_type)));
        }
        discovered.sort_by_key(|&(pid, _)| pid);
        discovered
    }

    /// Regenerate PAT/SDT/NIT/PMT and splice them into `segment`, honoring `discontinuity`.
    ///
    /// Returns the processed segment, or `segment` unchanged with a logged warning if the
    /// segment isn't 188-byte aligned (defensive per the table-build-failure contract).
    pub fn update_psi_tables(&mut self, segment: &[u8], discontinuity: bool) -> Vec<u8> {
        if segment.len() % TS_PACKET_LEN != 0 {
            tracing::warn!(
                len = segment.len(),
                "segment not 188-byte aligned, forwarding unchanged"
            );
            return segment.to_vec();
        }

        if discontinuity {
            self.bump_versions();
        }

        if !self.operator_configured {
            let discovered = self.analyze_pids(segment);
            if !discovered.is_empty() {
                let mut components = std::collections::BTreeMap::new();
                for (pid, stream_type) in discovered {
                    components.insert(pid, stream_type);
                }
                if let Some(service) = self.services.first_mut() {
                    if service.components != components {
                        service.components = components;
                        let version = self.v_pmt.entry(service.service_id).or_insert(0);
                        *version = (*version + 1) % 32;
                    }
                }
            }
        }

        let pmt_pids: Vec<u16> = self.services.iter().map(|s| s.pmt_pid).collect();
        let programs: Vec<ts::pat::PatProgram> = self
            .services
            .iter()
            .map(|s| ts::pat::PatProgram {
                program_number: s.service_id,
                pid: s.pmt_pid,
            })
            .collect();

        let mut psi_packets: Vec<[u8; TS_PACKET_LEN]> =
            dvb::build_pat(&programs, self.transport_stream_id, self.v_pat);
        psi_packets.extend(dvb::build_sdt(
            &self.services,
            self.transport_stream_id,
            self.network_id,
            self.v_sdt,
        ));
        psi_packets.extend(dvb::build_nit(
            &self.services,
            self.network_id,
            self.transport_stream_id,
            self.v_nit,
        ));
        for service in &self.services {
            let version = *self.v_pmt.get(&service.service_id).unwrap_or(&0);
            psi_packets.extend(dvb::build_pmt(service, version));
        }
        self.stamp_cc(&mut psi_packets);

        let mut output = Vec::with_capacity(segment.len() + psi_packets.len() * TS_PACKET_LEN);
        for packet in &psi_packets {
            output.extend_from_slice(packet);
        }

        let content_packets: Vec<&[u8]> = segment
            .chunks_exact(TS_PACKET_LEN)
            .filter(|chunk| {
                if !raw::is_sync(chunk) {
                    return true;
                }
                !is_psi_pid(raw::pid(chunk), &pmt_pids)
            })
            .collect();

        let psi_count = psi_packets.len().max(1);
        let total = content_packets.len().max(1);
        let period = MIN_REINSERT_PERIOD.max(total / (2 * psi_count));

        for (i, packet) in content_packets.iter().enumerate() {
            output.extend_from_slice(packet);
            if (i + 1) % period == 0 {
                let mut reinsert_pat = [dvb::build_pat(&programs, self.transport_stream_id, self.v_pat)[0]];
                self.stamp_cc(&mut reinsert_pat);
                output.extend_from_slice(&reinsert_pat[0]);

                for service in &self.services {
                    let version = *self.v_pmt.get(&service.service_id).unwrap_or(&0);
                    if let Some(first) = dvb::build_pmt(service, version).first() {
                        let mut reinsert_pmt = [*first];
                        self.stamp_cc(&mut reinsert_pmt);
                        output.extend_from_slice(&reinsert_pmt[0]);
                    }
                }
            }
        }

        output
    }
}

/// Validate `len(segment)` is non-zero and 188-byte aligned; used by the converter before
/// it even hands the segment to the processor.
pub fn validate_segment_length(segment: &[u8]) -> Result<usize, ConvertError> {
    let aligned = (segment.len() / TS_PACKET_LEN) * TS_PACKET_LEN;
    if aligned == 0 {
        Err(ConvertError::InvalidSegment)
    } else {
        Ok(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_segment() -> Vec<u8> {
        let mut p = raw::null_packet();
        p[1] = 0x01; // pid 0x100, a content pid
        p[2] = 0x00;
        p.to_vec()
    }

    #[test]
    fn psi_tables_are_prepended() {
        let mut processor = DvbProcessor::new(1, 1);
        let out = processor.update_psi_tables(&sample_segment(), false);
        assert!(out.len() > TS_PACKET_LEN);
        assert_eq!(raw::pid(&out[0..TS_PACKET_LEN]), dvb::PID_PAT);
    }

    #[test]
    fn discontinuity_bumps_version() {
        let mut processor = DvbProcessor::new(1, 1);
        assert_eq!(processor.v_pat, 0);
        processor.update_psi_tables(&sample_segment(), true);
        assert_eq!(processor.v_pat, 1);
    }

    #[test]
    fn pat_continuity_counter_increments_across_reinsertions() {
        let mut processor = DvbProcessor::new(1, 1);
        let mut content = Vec::new();
        for _ in 0..60 {
            content.extend_from_slice(&sample_segment());
        }
        let out = processor.update_psi_tables(&content, false);

        let pat_ccs: Vec<u8> = out
            .chunks_exact(TS_PACKET_LEN)
            .filter(|p| raw::is_sync(p) && raw::pid(p) == dvb::PID_PAT)
            .map(raw::continuity_counter)
            .collect();

        assert!(pat_ccs.len() >= 2, "expected at least one mid-stream PAT reinsertion");
        for pair in pat_ccs.windows(2) {
            assert_eq!(pair[1], (pair[0] + 1) % 16);
        }
    }

    #[test]
    fn pmt_version_bumps_when_discovered_components_change() {
        let mut processor = DvbProcessor::new(1, 1);
        let mut one_pid = raw::null_packet();
        one_pid[1] = 0x01;
        one_pid[2] = 0x00;
        processor.update_psi_tables(&one_pid, false);
        let version_before = processor.v_pmt[&1];

        let mut two_pids = Vec::new();
        two_pids.extend_from_slice(&one_pid);
        let mut second = raw::null_packet();
        second[1] = 0x02;
        second[2] = 0x00;
        two_pids.extend_from_slice(&second);
        // Repeat so the second PID clears the >5%-of-packets audio-candidate threshold.
        for _ in 0..20 {
            two_pids.extend_from_slice(&second);
        }
        processor.update_psi_tables(&two_pids, false);
        let version_after = processor.v_pmt[&1];

        assert_eq!(version_after, (version_before + 1) % 32);
    }
}
