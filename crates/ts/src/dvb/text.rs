/// Encode a UTF-8 string as DVB text per ETSI EN 300 468 Annex A.
///
/// Pure-ASCII strings are passed through verbatim (the default ISO 6937 table is a
/// superset of ASCII). Anything else is prefixed with the UTF-8 encoding selector byte
/// (`0x15`, Table A.4) so downstream equipment decodes it correctly.
pub fn encode_dvb_text(s: &str) -> Vec<u8> {
    if s.is_ascii() {
        s.as_bytes().to_vec()
    } else {
        let mut out = Vec::with_capacity(1 + s.len());
        out.push(0x15);
        out.extend_from_slice(s.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passthrough() {
        assert_eq!(encode_dvb_text("HLS to DVB"), b"HLS to DVB".to_vec());
    }

    #[test]
    fn non_ascii_gets_selector_byte() {
        let encoded = encode_dvb_text("Télé");
        assert_eq!(encoded[0], 0x15);
        assert_eq!(&encoded[1..], "Télé".as_bytes());
    }
}
