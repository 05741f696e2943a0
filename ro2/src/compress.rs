//! zlib framing for archive payloads and the tolerant decompression ladder
//! used when reading them back.

use std::io::{self, Read, Write};

use libflate::deflate;
use log::debug;

use crate::checksum;

/// Compress `data` into a zlib container: the `78 9C` header, a raw deflate
/// body and the big-endian Adler-32 of the input as trailer.
pub fn pack(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = vec![0x78, 0x9C];
    let mut encoder = deflate::Encoder::new(&mut out);
    encoder.write_all(data)?;
    encoder.finish().into_result()?;
    out.extend_from_slice(&checksum::adler32(data).to_be_bytes());
    Ok(out)
}

/// Inflate a raw deflate stream. Trailing bytes past the final block are
/// ignored.
pub fn inflate_raw(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = deflate::Decoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Inflate a zlib container by skipping its two header bytes. The Adler-32
/// trailer is left unverified; archives in the wild carry payloads whose
/// trailers disagree with their data.
pub fn inflate_zlib(data: &[u8]) -> io::Result<Vec<u8>> {
    if data.len() < 2 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "zlib container shorter than its header",
        ));
    }
    inflate_raw(&data[2..])
}

/// Decompression ladder for archive payloads. Producers disagree on
/// framing, so each strategy is tried in order and the raw bytes are the
/// final, absorbing step.
pub fn unpack(data: &[u8]) -> Vec<u8> {
    const LADDER: [(&str, fn(&[u8]) -> io::Result<Vec<u8>>); 2] =
        [("zlib", inflate_zlib), ("deflate", inflate_raw)];
    for (label, strategy) in LADDER {
        match strategy(data) {
            Ok(out) => return out,
            Err(err) => debug!("{} payload strategy failed: {}", label, err),
        }
    }
    data.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_frames_a_zlib_container() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let packed = pack(data).unwrap();
        assert_eq!(&packed[..2], &[0x78, 0x9C]);
        assert_eq!(
            packed[packed.len() - 4..],
            checksum::adler32(data).to_be_bytes()
        );
    }

    #[test]
    fn pack_unpack_round_trip() {
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 7) as u8).collect();
        assert_eq!(unpack(&pack(&data).unwrap()), data);
    }

    #[test]
    fn unpack_accepts_a_bare_deflate_stream() {
        let data = b"payload without a zlib wrapper, repeated, repeated";
        let packed = pack(data).unwrap();
        let bare = &packed[2..packed.len() - 4];
        assert_eq!(unpack(bare), data);
    }

    #[test]
    fn unpack_falls_back_to_raw_bytes() {
        // 0xFF opens a reserved deflate block type under either framing
        let garbage = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(unpack(&garbage), garbage);
    }
}
