use std::fmt;

use crate::error::{Error, Result};

/// Length of the version tag that opens every archive.
pub const TAG_LEN: usize = 8;

/// Archive container version, carried by the 8-byte ASCII tag at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// `VDISK1.0`: hierarchical section only, fixed magic word.
    V10,
    /// `VDISK1.1`: adds the flat lookup table and its size validation field.
    V11,
}

impl Version {
    pub fn tag(self) -> &'static [u8; TAG_LEN] {
        match self {
            Version::V10 => b"VDISK1.0",
            Version::V11 => b"VDISK1.1",
        }
    }

    pub fn from_tag(tag: &[u8; TAG_LEN]) -> Result<Version> {
        match tag {
            b"VDISK1.0" => Ok(Version::V10),
            b"VDISK1.1" => Ok(Version::V11),
            _ => {
                let end = tag.iter().position(|&b| b == 0).unwrap_or(TAG_LEN);
                Err(Error::UnknownFormat(
                    String::from_utf8_lossy(&tag[..end]).into_owned(),
                ))
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V10 => write!(f, "VDISK1.0"),
            Version::V11 => write!(f, "VDISK1.1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for version in [Version::V10, Version::V11] {
            assert_eq!(Version::from_tag(version.tag()).unwrap(), version);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        match Version::from_tag(b"VDISK2.0") {
            Err(Error::UnknownFormat(tag)) => assert_eq!(tag, "VDISK2.0"),
            other => panic!("expected UnknownFormat, got {:?}", other),
        }
    }
}
