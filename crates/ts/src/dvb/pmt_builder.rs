use super::descriptors::{avc_video_descriptor, audio_stream_descriptor, hevc_video_descriptor, video_stream_descriptor};
use super::section::{build_section, packetize};
use super::service::{DvbService, STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_HEVC, STREAM_TYPE_MPEG2_VIDEO, STREAM_TYPE_MPEG_AUDIO};
use crate::raw::TS_PACKET_LEN;

const TABLE_ID_PMT: u8 = 0x02;

fn stream_descriptor(stream_type: u8) -> Vec<u8> {
    match stream_type {
        STREAM_TYPE_H264 => avc_video_descriptor(),
        STREAM_TYPE_HEVC => hevc_video_descriptor(),
        STREAM_TYPE_MPEG2_VIDEO => video_stream_descriptor(),
        STREAM_TYPE_MPEG_AUDIO | STREAM_TYPE_AAC => audio_stream_descriptor(),
        _ => Vec::new(),
    }
}

/// Build a Program Map Table for `service` and split it into packets on its configured PMT PID.
pub fn build_pmt(service: &DvbService, version: u8) -> Vec<[u8; TS_PACKET_LEN]> {
    let pcr_pid = service.pcr_pid();
    let mut body = Vec::new();
    body.push(0xE0 | ((pcr_pid >> 8) as u8 & 0x1F));
    body.push((pcr_pid & 0xFF) as u8);
    // program_info_length: no program-level descriptors.
    body.push(0xF0);
    body.push(0x00);

    for (&pid, &stream_type) in &service.components {
        let descriptor = stream_descriptor(stream_type);
        body.push(stream_type);
        body.push(0xE0 | ((pid >> 8) as u8 & 0x1F));
        body.push((pid & 0xFF) as u8);
        let es_info_length = descriptor.len() as u16;
        body.push(0xF0 | ((es_info_length >> 8) as u8 & 0x0F));
        body.push((es_info_length & 0xFF) as u8);
        body.extend_from_slice(&descriptor);
    }

    let section = build_section(
        TABLE_ID_PMT,
        service.service_id,
        version,
        true,
        0,
        0,
        &body,
    );
    packetize(&section, service.pmt_pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcr_pid_prefers_video_component() {
        let service = DvbService::default_service();
        assert_eq!(service.pcr_pid(), 0x1001);
        let packets = build_pmt(&service, 0);
        assert!(!packets.is_empty());
    }
}
