//! Descriptor builders for the PMT/SDT/NIT tables assembled in this module.
//!
//! Counterpart to the parsing-side tag constants in [`crate::descriptor`]; tags not
//! re-declared here (AC-3, E-AC-3, ISO 639 language, ...) are read but never synthesized
//! by this converter.

use super::text::encode_dvb_text;

/// video_stream_descriptor (ISO/IEC 13818-1 §2.6.2), used for MPEG-2 video components.
pub const TAG_VIDEO_STREAM: u8 = 0x02;
/// audio_stream_descriptor (ISO/IEC 13818-1 §2.6.4), used for MPEG/AAC audio components.
pub const TAG_AUDIO_STREAM: u8 = 0x03;
/// AVC_video_descriptor (ISO/IEC 13818-1 §2.6.64).
pub const TAG_AVC_VIDEO: u8 = 0x28;
/// HEVC_video_descriptor (ISO/IEC 13818-1 §2.6.95).
pub const TAG_HEVC_VIDEO: u8 = 0x38;
/// service_descriptor (ETSI EN 300 468 §6.2.33).
pub const TAG_SERVICE: u8 = 0x48;
/// network_name_descriptor (ETSI EN 300 468 §6.2.27).
pub const TAG_NETWORK_NAME: u8 = 0x40;
/// service_list_descriptor (ETSI EN 300 468 §6.2.35).
pub const TAG_SERVICE_LIST: u8 = 0x41;

fn wrap(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + body.len());
    out.push(tag);
    out.push(body.len() as u8);
    out.extend_from_slice(body);
    out
}

/// Minimal video_stream_descriptor: a single reserved/placeholder byte, enough to flag an
/// MPEG-2 video elementary stream without claiming frame-rate or profile information the
/// converter never learns from the incoming HLS segments.
pub fn video_stream_descriptor() -> Vec<u8> {
    wrap(TAG_VIDEO_STREAM, &[0x00])
}

/// Minimal audio_stream_descriptor, shared by MPEG-1/2 audio and AAC components.
pub fn audio_stream_descriptor() -> Vec<u8> {
    wrap(TAG_AUDIO_STREAM, &[0x00])
}

/// AVC_video_descriptor for H.264 components.
///
/// profile/constraint/level bytes are left at 0 since the converter remuxes existing AVC
/// access units rather than encoding them, and downstream DVB receivers only use this
/// descriptor to distinguish AVC from MPEG-2 video, not to gate decode capability here.
pub fn avc_video_descriptor() -> Vec<u8> {
    wrap(TAG_AVC_VIDEO, &[0x00, 0x00, 0x00, 0x3F])
}

/// HEVC_video_descriptor for H.265 components, simplified to its minimum valid length.
pub fn hevc_video_descriptor() -> Vec<u8> {
    wrap(TAG_HEVC_VIDEO, &[0u8; 13])
}

/// service_descriptor for an SDT entry.
pub fn service_descriptor(service_type: u8, provider: &str, name: &str) -> Vec<u8> {
    let provider = encode_dvb_text(provider);
    let name = encode_dvb_text(name);
    let mut body = Vec::with_capacity(3 + provider.len() + name.len());
    body.push(service_type);
    body.push(provider.len() as u8);
    body.extend_from_slice(&provider);
    body.push(name.len() as u8);
    body.extend_from_slice(&name);
    wrap(TAG_SERVICE, &body)
}

/// network_name_descriptor for the NIT.
pub fn network_name_descriptor(name: &str) -> Vec<u8> {
    wrap(TAG_NETWORK_NAME, &encode_dvb_text(name))
}

/// service_list_descriptor for the NIT: one (service_id, service_type) pair per service.
pub fn service_list_descriptor(services: &[(u16, u8)]) -> Vec<u8> {
    let mut body = Vec::with_capacity(services.len() * 3);
    for &(service_id, service_type) in services {
        body.push((service_id >> 8) as u8);
        body.push((service_id & 0xFF) as u8);
        body.push(service_type);
    }
    wrap(TAG_SERVICE_LIST, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_descriptor_lengths_are_consistent() {
        let d = service_descriptor(0x01, "HLS to DVB", "Service HLS");
        assert_eq!(d[0], TAG_SERVICE);
        let declared_len = d[1] as usize;
        assert_eq!(d.len(), 2 + declared_len);
    }

    #[test]
    fn service_list_descriptor_packs_three_bytes_per_entry() {
        let d = service_list_descriptor(&[(1, 0x01), (2, 0x02)]);
        assert_eq!(d[1] as usize, 6);
        assert_eq!(d.len(), 8);
    }

    #[test]
    fn hevc_descriptor_has_minimum_valid_length() {
        let d = hevc_video_descriptor();
        assert_eq!(d[1] as usize, 13);
    }
}
