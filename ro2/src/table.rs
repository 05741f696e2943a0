//! Reader and writer for CT tables: a 64-byte UTF-16LE header, columnar
//! type information, typed rows and a CRC-16 trailer.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use log::warn;

use crate::bin::{Readable, Writable};
use crate::checksum;
use crate::error::{Error, Result};
use crate::str;
use crate::types::{CellError, CtType};

/// Size of the fixed file header.
pub const HEADER_LEN: usize = 64;

/// CT magic variant. `RO2SEC!` marks current files, `RO2!` older ones; the
/// body layout is identical and a table keeps whichever variant it was read
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    New,
    Old,
}

impl Magic {
    fn text(self) -> &'static str {
        match self {
            Magic::New => "RO2SEC!",
            Magic::Old => "RO2!",
        }
    }
}

/// An in-memory CT table. Row values are kept as decoded text; the column
/// types dictate their wire form.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub magic: Magic,
    pub timestamp: String,
    pub headers: Vec<String>,
    pub types: Vec<CtType>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// A fresh table with the current magic variant.
    pub fn new(
        headers: Vec<String>,
        types: Vec<CtType>,
        rows: Vec<Vec<String>>,
        timestamp: String,
    ) -> Table {
        Table {
            magic: Magic::New,
            timestamp,
            headers,
            types,
            rows,
        }
    }

    /// Read a table file. A present-but-wrong CRC trailer is logged and
    /// tolerated; use [`Table::verify`] for the strict variant.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Table> {
        Table::from_bytes(&fs::read(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Table> {
        let (table, trailer) = Table::decode(bytes)?;
        if let Some((stored, computed)) = trailer {
            if stored != computed {
                warn!(
                    "table checksum mismatch: stored {:#06x}, computed {:#06x}",
                    stored, computed
                );
            }
        }
        Ok(table)
    }

    /// Strict read: fails with [`Error::ChecksumMismatch`] when a CRC
    /// trailer is present and disagrees with the row payload.
    pub fn verify(bytes: &[u8]) -> Result<Table> {
        let (table, trailer) = Table::decode(bytes)?;
        if let Some((stored, computed)) = trailer {
            if stored != computed {
                return Err(Error::ChecksumMismatch { stored, computed });
            }
        }
        Ok(table)
    }

    fn decode(bytes: &[u8]) -> Result<(Table, Option<(u16, u16)>)> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated("table header"));
        }
        let (magic, timestamp) = decode_header(&bytes[..HEADER_LEN])?;

        let body = &bytes[HEADER_LEN..];
        let mut cursor = Cursor::new(body);
        let column_count = u32::read_bin(&mut cursor).map_err(Error::at("column count"))?;
        let mut headers = Vec::new();
        for _ in 0..column_count {
            headers.push(str::read_utf16(&mut cursor).map_err(Error::at("column name"))?);
        }
        let type_count = u32::read_bin(&mut cursor).map_err(Error::at("type count"))?;
        let mut types = Vec::new();
        for _ in 0..type_count {
            let code = u32::read_bin(&mut cursor).map_err(Error::at("type code"))?;
            types.push(CtType::from_code(code));
        }
        let row_count = u32::read_bin(&mut cursor).map_err(Error::at("row count"))?;

        let rows_start = cursor.position() as usize;
        let mut rows = Vec::new();
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(types.len());
            for ty in &types {
                row.push(ty.decode(&mut cursor).map_err(Error::at("row value"))?);
            }
            rows.push(row);
        }
        let rows_end = cursor.position() as usize;

        // the trailer is optional; tolerate files that stop after the rows
        let trailer = if body.len() - rows_end >= 2 {
            let stored = u16::read_bin(&mut cursor).map_err(Error::at("checksum trailer"))?;
            let computed = checksum::crc16(&body[rows_start..rows_end]);
            Some((stored, computed))
        } else {
            None
        };

        let table = Table {
            magic,
            timestamp,
            headers,
            types,
            rows,
        };
        Ok((table, trailer))
    }

    /// Write the table to `path`, creating or truncating it.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.encode_header());

        (self.headers.len() as u32).write_bin(&mut out)?;
        for name in &self.headers {
            str::write_utf16(name, &mut out)?;
        }
        (self.types.len() as u32).write_bin(&mut out)?;
        for ty in &self.types {
            ty.code().write_bin(&mut out)?;
        }
        (self.rows.len() as u32).write_bin(&mut out)?;

        // the CRC trailer covers the row values and nothing else
        let mut row_bytes = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, ty) in self.types.iter().enumerate() {
                let value = row.get(c).map(String::as_str).unwrap_or("");
                ty.encode(value, &mut row_bytes).map_err(|err| match err {
                    CellError::Io(err) => Error::Io(err),
                    CellError::Parse => Error::InvalidCellValue {
                        row: r,
                        column: c,
                        value: value.to_owned(),
                        type_name: ty.to_string(),
                    },
                })?;
            }
        }
        out.write_all(&row_bytes)?;
        checksum::crc16(&row_bytes).write_bin(&mut out)?;
        Ok(out)
    }

    fn encode_header(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        let magic = str::utf16_bytes(self.magic.text());
        header[..magic.len()].copy_from_slice(&magic);
        let start = magic.len() + 2;
        // truncate so at least one null unit survives after the timestamp
        let room = (HEADER_LEN - start) / 2 - 1;
        let mut units: Vec<u16> = self.timestamp.encode_utf16().collect();
        units.truncate(room);
        for (i, unit) in units.iter().enumerate() {
            let at = start + 2 * i;
            header[at..at + 2].copy_from_slice(&unit.to_le_bytes());
        }
        header
    }
}

fn decode_header(header: &[u8]) -> Result<(Magic, String)> {
    for magic in [Magic::New, Magic::Old] {
        let text = str::utf16_bytes(magic.text());
        let end = text.len() + 2;
        if header.starts_with(&text) && header[text.len()..end] == [0, 0] {
            return Ok((magic, str::decode_utf16_nul(&header[end..])));
        }
    }
    Err(Error::InvalidMagic)
}
