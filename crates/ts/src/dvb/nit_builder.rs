use super::descriptors::{network_name_descriptor, service_list_descriptor};
use super::section::{build_section, packetize};
use super::service::DvbService;
use super::PID_NIT;
use crate::raw::TS_PACKET_LEN;

/// table_id for the "actual network" Network Information Table.
const TABLE_ID_NIT_ACTUAL: u8 = 0x40;

/// Build a Network Information Table describing the single transport stream this converter emits.
pub fn build_nit(
    services: &[DvbService],
    network_id: u16,
    transport_stream_id: u16,
    version: u8,
) -> Vec<[u8; TS_PACKET_LEN]> {
    let network_name = network_name_descriptor("HLS to DVB");
    let network_descriptors_length = network_name.len() as u16;

    let service_entries: Vec<(u16, u8)> = services
        .iter()
        .map(|s| (s.service_id, s.service_type))
        .collect();
    let service_list = service_list_descriptor(&service_entries);
    let transport_descriptors_length = service_list.len() as u16;

    let mut body = Vec::new();
    body.push(0xF0 | ((network_descriptors_length >> 8) as u8 & 0x0F));
    body.push((network_descriptors_length & 0xFF) as u8);
    body.extend_from_slice(&network_name);

    // transport_stream_loop_length: one transport stream entry.
    let ts_loop_len = 6 + transport_descriptors_length;
    body.push(0xF0 | ((ts_loop_len >> 8) as u8 & 0x0F));
    body.push((ts_loop_len & 0xFF) as u8);

    body.push((transport_stream_id >> 8) as u8);
    body.push((transport_stream_id & 0xFF) as u8);
    body.push((network_id >> 8) as u8);
    body.push((network_id & 0xFF) as u8);
    body.push(0xF0 | ((transport_descriptors_length >> 8) as u8 & 0x0F));
    body.push((transport_descriptors_length & 0xFF) as u8);
    body.extend_from_slice(&service_list);

    let section = build_section(TABLE_ID_NIT_ACTUAL, network_id, version, true, 0, 0, &body);
    packetize(&section, PID_NIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nit_lists_every_service() {
        let services = vec![DvbService::default_service()];
        let packets = build_nit(&services, 1, 1, 0);
        assert!(!packets.is_empty());
    }
}
