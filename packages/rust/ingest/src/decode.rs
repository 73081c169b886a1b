//! Text decoding for review exports.
//!
//! Play Console exports are UTF-16 with a byte-order mark; hand-edited or
//! re-saved files are usually UTF-8.

/// Decode raw file bytes, choosing the encoding from the BOM.
pub(crate) fn decode_text(bytes: &[u8]) -> Result<String, String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => decode_utf8(rest),
        _ => decode_utf8(bytes),
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("not valid UTF-8: {e}"))
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("UTF-16 data has an odd number of bytes".into());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| format!("not valid UTF-16: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le_with_bom(s: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_utf16le_export() {
        let bytes = utf16le_with_bom("Star Rating,Review Text\n1,ゲームが落ちる\n");
        let text = decode_text(&bytes).unwrap();
        assert!(text.starts_with("Star Rating"));
        assert!(text.contains("ゲームが落ちる"));
    }

    #[test]
    fn decodes_utf16be() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "a,b".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text(&bytes).unwrap(), "a,b");
    }

    #[test]
    fn strips_utf8_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'o', b'k'];
        assert_eq!(decode_text(&bytes).unwrap(), "ok");
    }

    #[test]
    fn plain_utf8_passes_through() {
        assert_eq!(decode_text("très bien".as_bytes()).unwrap(), "très bien");
    }

    #[test]
    fn odd_utf16_length_is_rejected() {
        let err = decode_text(&[0xFF, 0xFE, 0x41]).unwrap_err();
        assert!(err.contains("odd"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(decode_text(&[0xC3, 0x28]).is_err());
    }
}
