use super::descriptors::service_descriptor;
use super::section::{build_section, packetize};
use super::service::DvbService;
use super::PID_SDT;
use crate::raw::TS_PACKET_LEN;

/// table_id for the "actual transport stream" Service Description Table.
const TABLE_ID_SDT_ACTUAL: u8 = 0x42;

/// Build a Service Description Table listing every service carried on this transport stream.
pub fn build_sdt(
    services: &[DvbService],
    transport_stream_id: u16,
    original_network_id: u16,
    version: u8,
) -> Vec<[u8; TS_PACKET_LEN]> {
    let mut body = Vec::new();
    body.push((original_network_id >> 8) as u8);
    body.push((original_network_id & 0xFF) as u8);
    body.push(0xFF); // reserved_future_use

    for service in services {
        let descriptor = service_descriptor(service.service_type, &service.provider, &service.name);
        body.push((service.service_id >> 8) as u8);
        body.push((service.service_id & 0xFF) as u8);
        body.push(0xFC); // reserved(6) + EIT_schedule_flag(0) + EIT_present_following_flag(0)
        let descriptors_loop_length = descriptor.len() as u16;
        // running_status = 4 (running), free_CA_mode = 0
        body.push(0x80 | ((descriptors_loop_length >> 8) as u8 & 0x0F));
        body.push((descriptors_loop_length & 0xFF) as u8);
        body.extend_from_slice(&descriptor);
    }

    let section = build_section(
        TABLE_ID_SDT_ACTUAL,
        transport_stream_id,
        version,
        true,
        0,
        0,
        &body,
    );
    packetize(&section, PID_SDT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdt_carries_one_entry_per_service() {
        let services = vec![DvbService::default_service()];
        let packets = build_sdt(&services, 1, 1, 0);
        assert!(!packets.is_empty());
    }
}
