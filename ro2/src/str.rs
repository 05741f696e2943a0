//! String codecs shared by both formats: null-padded code page 51949
//! (EUC-KR) name fields for the archive, UTF-16LE strings for the table.

use std::io::{Read, Result as IoResult, Write};

use encoding_rs::EUC_KR;

use crate::bin::{Readable, Writable};
use crate::error::{Error, Result};

/// Decode a null-padded code page 51949 field, stopping at the first null
/// byte. Undecodable bytes become replacement characters; names inside
/// existing archives are read best-effort.
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let (name, _, _) = EUC_KR.decode(&field[..end]);
    name.into_owned()
}

/// Encode a name into a null-padded code page 51949 field of `width` bytes.
/// The final byte is reserved for the terminator, so the encoded form must
/// be shorter than `width`.
pub fn encode_name(name: &str, width: usize) -> Result<Vec<u8>> {
    let (bytes, _, unmappable) = EUC_KR.encode(name);
    if unmappable || bytes.len() >= width {
        return Err(Error::UnencodableName(name.to_owned()));
    }
    let mut field = vec![0u8; width];
    field[..bytes.len()].copy_from_slice(&bytes);
    Ok(field)
}

/// Read a UTF-16LE string prefixed with its `u32` length in code units.
/// A zero length is the empty string, with no trailing bytes.
pub fn read_utf16<R: Read>(mut reader: R) -> IoResult<String> {
    let len = u32::read_bin(&mut reader)? as usize;
    let units = u16::read_bin_many(&mut reader, len)?;
    Ok(String::from_utf16_lossy(&units))
}

/// Write a string as a `u32` code-unit count followed by UTF-16LE units.
pub fn write_utf16<W: Write>(s: &str, mut writer: W) -> IoResult<()> {
    let units: Vec<u16> = s.encode_utf16().collect();
    (units.len() as u32).write_bin(&mut writer)?;
    for unit in units {
        unit.write_bin(&mut writer)?;
    }
    Ok(())
}

/// The UTF-16LE code units of `s`, without length prefix or terminator.
pub fn utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Decode UTF-16LE from `buf` up to the first null unit.
pub fn decode_utf16_nul(buf: &[u8]) -> String {
    let mut units = Vec::new();
    for pair in buf.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn name_round_trip_korean() {
        let field = encode_name("아이템.ct", 128).unwrap();
        assert_eq!(field.len(), 128);
        assert_eq!(decode_name(&field), "아이템.ct");
    }

    #[test]
    fn name_fills_but_never_reaches_field_width() {
        let name = "a".repeat(127);
        let field = encode_name(&name, 128).unwrap();
        assert_eq!(field[126], b'a');
        assert_eq!(field[127], 0);
        assert_eq!(decode_name(&field), name);
    }

    #[test]
    fn name_at_field_width_is_rejected() {
        let err = encode_name(&"a".repeat(128), 128).unwrap_err();
        assert!(matches!(err, Error::UnencodableName(_)));
    }

    #[test]
    fn name_outside_code_page_is_rejected() {
        let err = encode_name("emoji\u{1F600}", 128).unwrap_err();
        assert!(matches!(err, Error::UnencodableName(_)));
    }

    #[test]
    fn utf16_round_trip() {
        for s in ["", "Description", "한글 값"] {
            let mut out = Vec::new();
            write_utf16(s, &mut out).unwrap();
            assert_eq!(read_utf16(Cursor::new(&out)).unwrap(), s);
        }
    }

    #[test]
    fn empty_utf16_is_a_bare_length() {
        let mut out = Vec::new();
        write_utf16("", &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn utf16_nul_stops_at_terminator() {
        let mut buf = utf16_bytes("abc");
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&utf16_bytes("junk"));
        assert_eq!(decode_utf16_nul(&buf), "abc");
    }
}
