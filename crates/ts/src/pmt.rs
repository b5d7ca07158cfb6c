use crate::Result;
use crate::parser_zero_copy::PmtRef;
use bytes::Bytes;

/// Elementary stream type, per ISO/IEC 13818-1 Table 2-34 (values actually used by this crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Mpeg2Video,
    Mpeg1Audio,
    Mpeg2Audio,
    Aac,
    LatmAac,
    H264,
    Hevc,
    Ac3,
    EAc3,
    Scte35,
    Private(u8),
    Other(u8),
}

impl From<u8> for StreamType {
    fn from(value: u8) -> Self {
        match value {
            0x02 => StreamType::Mpeg2Video,
            0x03 => StreamType::Mpeg1Audio,
            0x04 => StreamType::Mpeg2Audio,
            0x0F => StreamType::Aac,
            0x11 => StreamType::LatmAac,
            0x1B => StreamType::H264,
            0x24 => StreamType::Hevc,
            0x81 => StreamType::Ac3,
            0x87 => StreamType::EAc3,
            0x86 => StreamType::Scte35,
            0x06 => StreamType::Private(value),
            other => StreamType::Other(other),
        }
    }
}

impl From<StreamType> for u8 {
    fn from(value: StreamType) -> Self {
        match value {
            StreamType::Mpeg2Video => 0x02,
            StreamType::Mpeg1Audio => 0x03,
            StreamType::Mpeg2Audio => 0x04,
            StreamType::Aac => 0x0F,
            StreamType::LatmAac => 0x11,
            StreamType::H264 => 0x1B,
            StreamType::Hevc => 0x24,
            StreamType::Ac3 => 0x81,
            StreamType::EAc3 => 0x87,
            StreamType::Scte35 => 0x86,
            StreamType::Private(v) | StreamType::Other(v) => v,
        }
    }
}

impl StreamType {
    /// Whether this stream type is carried on a video elementary stream.
    pub fn is_video(self) -> bool {
        matches!(
            self,
            StreamType::Mpeg2Video | StreamType::H264 | StreamType::Hevc
        )
    }

    /// Whether this stream type is carried on an audio elementary stream.
    pub fn is_audio(self) -> bool {
        matches!(
            self,
            StreamType::Mpeg1Audio
                | StreamType::Mpeg2Audio
                | StreamType::Aac
                | StreamType::LatmAac
                | StreamType::Ac3
                | StreamType::EAc3
        )
    }
}

/// One elementary stream entry of a Program Map Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtStream {
    pub stream_type: StreamType,
    pub elementary_pid: u16,
}

/// Owned Program Map Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pmt {
    pub program_number: u16,
    pub version_number: u8,
    pub current_next_indicator: bool,
    pub pcr_pid: u16,
    pub streams: Vec<PmtStream>,
}

impl Pmt {
    /// Parse a PMT from a PSI section (pointer field already stripped).
    pub fn parse(data: Bytes) -> Result<Self> {
        let pmt = PmtRef::parse(data)?;
        let mut streams = Vec::new();
        for stream in pmt.streams() {
            let stream = stream?;
            streams.push(PmtStream {
                stream_type: stream.stream_type,
                elementary_pid: stream.elementary_pid,
            });
        }
        Ok(Pmt {
            program_number: pmt.program_number,
            version_number: pmt.version_number,
            current_next_indicator: pmt.current_next_indicator,
            pcr_pid: pmt.pcr_pid,
            streams,
        })
    }
}
