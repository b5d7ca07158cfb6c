use crate::Result;
use crate::parser_zero_copy::PatRef;
use bytes::Bytes;

/// One program entry of a Program Association Table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatProgram {
    pub program_number: u16,
    /// PID of the PMT (for `program_number != 0`) or the network PID (for `program_number == 0`).
    pub pid: u16,
}

/// Owned Program Association Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pat {
    pub transport_stream_id: u16,
    pub version_number: u8,
    pub current_next_indicator: bool,
    pub programs: Vec<PatProgram>,
}

impl Pat {
    /// Parse a PAT from a PSI section (pointer field already stripped).
    pub fn parse(data: Bytes) -> Result<Self> {
        let pat = PatRef::parse(data)?;
        let programs = pat
            .programs()
            .map(|p| PatProgram {
                program_number: p.program_number,
                pid: p.pid,
            })
            .collect();
        Ok(Pat {
            transport_stream_id: pat.transport_stream_id,
            version_number: pat.version_number,
            current_next_indicator: pat.current_next_indicator,
            programs,
        })
    }

    /// Program map PID for `program_number`, if present.
    pub fn pmt_pid(&self, program_number: u16) -> Option<u16> {
        self.programs
            .iter()
            .find(|p| p.program_number == program_number)
            .map(|p| p.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvb::build_pat;

    #[test]
    fn round_trips_through_builder() {
        let programs = vec![PatProgram {
            program_number: 1,
            pid: 0x1000,
        }];
        let packets = build_pat(&programs, 0x0001, 3);
        let section = crate::packet::TsPacket::parse(Bytes::copy_from_slice(&packets[0]))
            .unwrap()
            .get_psi_payload()
            .unwrap();
        let parsed = Pat::parse(section).unwrap();
        assert_eq!(parsed.transport_stream_id, 0x0001);
        assert_eq!(parsed.version_number, 3);
        assert_eq!(parsed.programs, programs);
    }
}
