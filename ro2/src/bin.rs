use std::io::{Read, Result, Seek, SeekFrom, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

/// Wire scalars and records that can be read from a stream. Everything
/// multi-byte in both file formats is little-endian.
pub trait Readable: Sized {
    fn read_bin<R: Read>(reader: R) -> Result<Self>;

    fn read_bin_many<R: Read>(mut reader: R, num: usize) -> Result<Vec<Self>> {
        let mut vals = Vec::new();
        for _ in 0..num {
            vals.push(Self::read_bin(&mut reader)?);
        }
        Ok(vals)
    }
}

pub trait Writable {
    fn write_bin<W: Write>(&self, writer: W) -> Result<()>;
}

impl Readable for u8 {
    fn read_bin<R: Read>(mut reader: R) -> Result<Self> {
        reader.read_u8()
    }
}
impl Writable for u8 {
    fn write_bin<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u8(*self)
    }
}

macro_rules! derive_codec_via_byteorder {
    ( $t:ty, $read:ident, $write:ident ) => {
        impl Readable for $t {
            fn read_bin<R: Read>(mut reader: R) -> Result<Self> {
                reader.$read::<LE>()
            }
        }
        impl Writable for $t {
            fn write_bin<W: Write>(&self, mut writer: W) -> Result<()> {
                writer.$write::<LE>(*self)
            }
        }
    };
}
derive_codec_via_byteorder!(u16, read_u16, write_u16);
derive_codec_via_byteorder!(u32, read_u32, write_u32);
derive_codec_via_byteorder!(i16, read_i16, write_i16);
derive_codec_via_byteorder!(i32, read_i32, write_i32);
derive_codec_via_byteorder!(i64, read_i64, write_i64);
derive_codec_via_byteorder!(f32, read_f32, write_f32);

/// A value written at a remembered stream position so it can be filled in
/// once the surrounding data has been laid out.
pub struct Positioned<A> {
    pub position: u64,
    pub data: A,
}

impl<A: Writable> Positioned<A> {
    pub fn new<W: Write + Seek>(data: A, mut out: W) -> Result<Self> {
        let position = out.stream_position()?;
        data.write_bin(&mut out)?;
        Ok(Self { position, data })
    }

    pub fn update<W: Write + Seek>(&self, mut out: W) -> Result<()> {
        let tmp_pos = out.stream_position()?;
        out.seek(SeekFrom::Start(self.position))?;
        self.data.write_bin(&mut out)?;
        out.seek(SeekFrom::Start(tmp_pos))?;
        Ok(())
    }
}
