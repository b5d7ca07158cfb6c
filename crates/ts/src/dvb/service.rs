use std::collections::BTreeMap;

/// A DVB service (one program) carried in a transport stream.
///
/// `components` maps elementary PID to its ISO/IEC 13818-1 stream_type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvbService {
    pub service_id: u16,
    pub pmt_pid: u16,
    pub name: String,
    pub provider: String,
    /// 0x01 = digital television service, 0x02 = digital radio sound service.
    pub service_type: u8,
    pub components: BTreeMap<u16, u8>,
}

/// ISO/IEC 13818-1 stream_type: MPEG-2 video.
pub const STREAM_TYPE_MPEG2_VIDEO: u8 = 0x02;
/// ISO/IEC 13818-1 stream_type: MPEG-1/2 audio.
pub const STREAM_TYPE_MPEG_AUDIO: u8 = 0x03;
/// ISO/IEC 13818-1 stream_type: AVC/H.264 video.
pub const STREAM_TYPE_H264: u8 = 0x1B;
/// ISO/IEC 13818-1 stream_type: HEVC/H.265 video.
pub const STREAM_TYPE_HEVC: u8 = 0x24;
/// ISO/IEC 13818-1 stream_type: ADTS AAC audio.
pub const STREAM_TYPE_AAC: u8 = 0x0F;

/// Whether `stream_type` identifies a video elementary stream eligible to carry PCR.
pub fn is_video_stream_type(stream_type: u8) -> bool {
    matches!(
        stream_type,
        STREAM_TYPE_MPEG2_VIDEO | STREAM_TYPE_H264 | STREAM_TYPE_HEVC
    )
}

impl DvbService {
    /// The default single-program service synthesized when an HLS input carries no
    /// operator-configured services (§4.5 "on initialize").
    pub fn default_service() -> Self {
        let mut components = BTreeMap::new();
        components.insert(0x1001, STREAM_TYPE_H264);
        components.insert(0x1002, STREAM_TYPE_MPEG_AUDIO);
        DvbService {
            service_id: 1,
            pmt_pid: 0x1000,
            name: "Service HLS".to_string(),
            provider: "HLS to DVB".to_string(),
            service_type: 0x01,
            components,
        }
    }

    /// PCR PID per §4.4: the first video component, else the first component, else 0x1FFF.
    pub fn pcr_pid(&self) -> u16 {
        self.components
            .iter()
            .find(|(_, &stream_type)| is_video_stream_type(stream_type))
            .or_else(|| self.components.iter().next())
            .map(|(&pid, _)| pid)
            .unwrap_or(0x1FFF)
    }
}
