//! The CT column type system: wire codes, display names and per-type value
//! codecs.

use std::fmt;
use std::io::{self, Read, Write};

use crate::bin::{Readable, Writable};
use crate::str;

/// A CT column type, keyed by its `u32` wire code. Codes that no known
/// client uses are preserved as [`CtType::Unknown`] and carried as `i32`
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtType {
    Byte,
    Short,
    Word,
    Int,
    Dword,
    DwordHex,
    String,
    Float,
    Int64,
    Bool,
    Unknown(u32),
}

impl CtType {
    pub fn from_code(code: u32) -> CtType {
        match code {
            2 => CtType::Byte,
            3 => CtType::Short,
            4 => CtType::Word,
            5 => CtType::Int,
            6 => CtType::Dword,
            7 => CtType::DwordHex,
            8 => CtType::String,
            9 => CtType::Float,
            11 => CtType::Int64,
            12 => CtType::Bool,
            other => CtType::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            CtType::Byte => 2,
            CtType::Short => 3,
            CtType::Word => 4,
            CtType::Int => 5,
            CtType::Dword => 6,
            CtType::DwordHex => 7,
            CtType::String => 8,
            CtType::Float => 9,
            CtType::Int64 => 11,
            CtType::Bool => 12,
            CtType::Unknown(code) => code,
        }
    }

    pub fn from_name(name: &str) -> Option<CtType> {
        Some(match name {
            "BYTE" => CtType::Byte,
            "SHORT" => CtType::Short,
            "WORD" => CtType::Word,
            "INT" => CtType::Int,
            "DWORD" => CtType::Dword,
            "DWORD_HEX" => CtType::DwordHex,
            "STRING" => CtType::String,
            "FLOAT" => CtType::Float,
            "INT64" => CtType::Int64,
            "BOOL" => CtType::Bool,
            _ => CtType::Unknown(name.strip_prefix("UNKNOWN_")?.parse().ok()?),
        })
    }

    /// Read one wire value and render it as cell text.
    pub fn decode<R: Read>(self, mut reader: R) -> io::Result<String> {
        Ok(match self {
            CtType::Byte | CtType::Bool => u8::read_bin(&mut reader)?.to_string(),
            CtType::Short => i16::read_bin(&mut reader)?.to_string(),
            CtType::Word => u16::read_bin(&mut reader)?.to_string(),
            CtType::Int | CtType::Unknown(_) => i32::read_bin(&mut reader)?.to_string(),
            CtType::Dword => u32::read_bin(&mut reader)?.to_string(),
            CtType::DwordHex => format!("0x{:X}", u32::read_bin(&mut reader)?),
            CtType::Float => f32::read_bin(&mut reader)?.to_string(),
            CtType::Int64 => i64::read_bin(&mut reader)?.to_string(),
            CtType::String => str::read_utf16(&mut reader)?,
        })
    }

    /// Parse cell text and write its wire form. Empty cells count as zero
    /// (the empty string for `STRING`).
    pub(crate) fn encode<W: Write>(self, value: &str, mut writer: W) -> Result<(), CellError> {
        let value = if value.is_empty() && self != CtType::String {
            "0"
        } else {
            value
        };
        match self {
            CtType::Byte | CtType::Bool => parsed::<u8>(value)?.write_bin(writer)?,
            CtType::Short => parsed::<i16>(value)?.write_bin(writer)?,
            CtType::Word => parsed::<u16>(value)?.write_bin(writer)?,
            CtType::Int | CtType::Unknown(_) => parsed::<i32>(value)?.write_bin(writer)?,
            CtType::Dword => parsed::<u32>(value)?.write_bin(writer)?,
            CtType::DwordHex => parse_dword_hex(value).ok_or(CellError::Parse)?.write_bin(writer)?,
            CtType::Float => parsed::<f32>(value)?.write_bin(writer)?,
            CtType::Int64 => parsed::<i64>(value)?.write_bin(writer)?,
            CtType::String => str::write_utf16(value, &mut writer)?,
        }
        Ok(())
    }
}

impl fmt::Display for CtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtType::Byte => write!(f, "BYTE"),
            CtType::Short => write!(f, "SHORT"),
            CtType::Word => write!(f, "WORD"),
            CtType::Int => write!(f, "INT"),
            CtType::Dword => write!(f, "DWORD"),
            CtType::DwordHex => write!(f, "DWORD_HEX"),
            CtType::String => write!(f, "STRING"),
            CtType::Float => write!(f, "FLOAT"),
            CtType::Int64 => write!(f, "INT64"),
            CtType::Bool => write!(f, "BOOL"),
            CtType::Unknown(code) => write!(f, "UNKNOWN_{}", code),
        }
    }
}

/// Why a cell failed to encode; the table writer attaches row and column.
pub(crate) enum CellError {
    Io(io::Error),
    Parse,
}

impl From<io::Error> for CellError {
    fn from(err: io::Error) -> CellError {
        CellError::Io(err)
    }
}

fn parsed<T: std::str::FromStr>(value: &str) -> Result<T, CellError> {
    value.parse().map_err(|_| CellError::Parse)
}

/// `DWORD_HEX` cells accept `0x`-prefixed hex in either case, or plain
/// decimal.
fn parse_dword_hex(value: &str) -> Option<u32> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const NAMED: [CtType; 10] = [
        CtType::Byte,
        CtType::Short,
        CtType::Word,
        CtType::Int,
        CtType::Dword,
        CtType::DwordHex,
        CtType::String,
        CtType::Float,
        CtType::Int64,
        CtType::Bool,
    ];

    fn round_trip(ty: CtType, value: &str) -> String {
        let mut wire = Vec::new();
        ty.encode(value, &mut wire)
            .unwrap_or_else(|_| panic!("could not encode {:?} as {}", value, ty));
        ty.decode(Cursor::new(wire)).unwrap()
    }

    #[test]
    fn codes_and_names_are_bijective() {
        for ty in NAMED {
            assert_eq!(CtType::from_code(ty.code()), ty);
            assert_eq!(CtType::from_name(&ty.to_string()), Some(ty));
        }
    }

    #[test]
    fn unrecognized_codes_are_preserved() {
        let ty = CtType::from_code(13);
        assert_eq!(ty, CtType::Unknown(13));
        assert_eq!(ty.to_string(), "UNKNOWN_13");
        assert_eq!(CtType::from_name("UNKNOWN_13"), Some(ty));
        assert_eq!(CtType::from_name("MYSTERY"), None);
    }

    #[test]
    fn values_round_trip_per_type() {
        assert_eq!(round_trip(CtType::Byte, "255"), "255");
        assert_eq!(round_trip(CtType::Short, "-42"), "-42");
        assert_eq!(round_trip(CtType::Word, "65535"), "65535");
        assert_eq!(round_trip(CtType::Int, "-2147483648"), "-2147483648");
        assert_eq!(round_trip(CtType::Dword, "4294967295"), "4294967295");
        assert_eq!(round_trip(CtType::Float, "2.5"), "2.5");
        assert_eq!(round_trip(CtType::Int64, "-9007199254740993"), "-9007199254740993");
        assert_eq!(round_trip(CtType::Bool, "1"), "1");
        assert_eq!(round_trip(CtType::String, "포션"), "포션");
    }

    #[test]
    fn dword_hex_renders_uppercase_without_leading_zeros() {
        assert_eq!(round_trip(CtType::DwordHex, "0xFFFFFFFF"), "0xFFFFFFFF");
        assert_eq!(round_trip(CtType::DwordHex, "0x00ff"), "0xFF");
        assert_eq!(round_trip(CtType::DwordHex, "255"), "0xFF");
        assert_eq!(round_trip(CtType::DwordHex, "0"), "0x0");
    }

    #[test]
    fn empty_cells_count_as_zero() {
        assert_eq!(round_trip(CtType::Int, ""), "0");
        assert_eq!(round_trip(CtType::DwordHex, ""), "0x0");
        assert_eq!(round_trip(CtType::String, ""), "");
    }

    #[test]
    fn garbage_fails_to_parse() {
        assert!(matches!(
            CtType::Int.encode("soon", &mut Vec::new()),
            Err(CellError::Parse)
        ));
    }
}
