//! Compression detection for reassembled payloads.
//!
//! GELF senders may gzip or zlib compress a message, or send it as is.
//! Nothing on the wire says which, so the first two bytes decide.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::Error;

pub const MAGIC_GZIP: [u8; 2] = [0x1f, 0x8b];

/// CMF byte of a zlib stream using deflate with a 32K window.
pub const MAGIC_ZLIB: u8 = 0x78;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    None,
}

impl Compression {
    /// Detect the compression of a payload from its leading bytes.
    ///
    /// Anything that is neither gzip nor zlib is treated as uncompressed,
    /// graylog-server accepts those too.
    pub fn detect(buf: &[u8]) -> Compression {
        if buf.len() < 2 {
            return Compression::None;
        }

        if buf[..2] == MAGIC_GZIP {
            return Compression::Gzip;
        }

        // zlib header: CMF * 256 + FLG is a multiple of 31
        if buf[0] == MAGIC_ZLIB && (u16::from_be_bytes([buf[0], buf[1]]) % 31) == 0 {
            return Compression::Zlib;
        }

        Compression::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Zlib => "zlib",
            Compression::None => "none",
        }
    }
}

/// Decompress a reassembled payload.
///
/// Uncompressed payloads are borrowed as is. Decompressed output longer than
/// `limit` bytes is rejected.
pub fn decompress(buf: &[u8], limit: usize) -> Result<Cow<'_, [u8]>, Error> {
    let compression = Compression::detect(buf);
    let decompressed = match compression {
        Compression::Gzip => read_limited(GzDecoder::new(buf), limit)?,
        Compression::Zlib => read_limited(ZlibDecoder::new(buf), limit)?,
        Compression::None => {
            if buf.len() > limit {
                return Err(Error::MessageTooLarge { limit });
            }

            return Ok(Cow::Borrowed(buf));
        }
    };

    tracing::debug!(
        compression = compression.as_str(),
        compressed = buf.len(),
        decompressed = decompressed.len(),
        "payload decompressed"
    );

    Ok(Cow::Owned(decompressed))
}

fn read_limited<R: Read>(reader: R, limit: usize) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(Error::Decompress)?;

    if out.len() > limit {
        return Err(Error::MessageTooLarge { limit });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::{GzEncoder, ZlibEncoder};

    use super::*;

    const PAYLOAD: &[u8] = br#"{"short_message":"compressed"}"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn detect() {
        assert_eq!(Compression::detect(&gzip(PAYLOAD)), Compression::Gzip);
        assert_eq!(Compression::detect(&zlib(PAYLOAD)), Compression::Zlib);
        assert_eq!(Compression::detect(PAYLOAD), Compression::None);
        assert_eq!(Compression::detect(b"{"), Compression::None);
        assert_eq!(Compression::detect(b""), Compression::None);
    }

    #[test]
    fn zlib_header_checksum() {
        // every compression level of zlib passes the checksum
        for flg in [0x01, 0x5e, 0x9c, 0xda] {
            assert_eq!(Compression::detect(&[0x78, flg]), Compression::Zlib);
        }

        // 0x78 followed by a byte which fails the checksum
        assert_eq!(Compression::detect(&[0x78, 0x00]), Compression::None);
    }

    #[test]
    fn decompress_all() {
        for buf in [gzip(PAYLOAD), zlib(PAYLOAD), PAYLOAD.to_vec()] {
            let got = decompress(&buf, 1024).unwrap();
            assert_eq!(got.as_ref(), PAYLOAD);
        }
    }

    #[test]
    fn uncompressed_is_borrowed() {
        assert!(matches!(decompress(PAYLOAD, 1024).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn corrupt_stream() {
        let mut buf = gzip(PAYLOAD);
        buf.truncate(12);
        assert!(matches!(decompress(&buf, 1024), Err(Error::Decompress(_))));

        // valid zlib header followed by garbage
        let buf = [0x78, 0x9c, 0xff, 0xff, 0xff, 0xff];
        assert!(matches!(decompress(&buf, 1024), Err(Error::Decompress(_))));
    }

    #[test]
    fn too_large() {
        let big = vec![b' '; 4096];
        let buf = gzip(&big);
        assert!(matches!(
            decompress(&buf, 1024),
            Err(Error::MessageTooLarge { limit: 1024 })
        ));
        assert!(matches!(
            decompress(&big, 1024),
            Err(Error::MessageTooLarge { limit: 1024 })
        ));
        assert_eq!(decompress(&buf, 4096).unwrap().len(), 4096);
    }
}
