//! Decoding of base64 encoded peak arrays.
//!
//! Both supported formats store arrays as base64 text, optionally zlib
//! compressed. mzML uses little-endian values, mzXML network (big-endian) order.

use std::io::Read;

use base64::prelude::*;
use byteorder::{
    BigEndian,
    ByteOrder,
    LittleEndian,
};
use flate2::read::ZlibDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    Float32,
    #[default]
    Float64,
}

impl Precision {
    pub fn byte_size(&self) -> usize {
        match self {
            Precision::Float32 => 4,
            Precision::Float64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decompression error: {0}")]
    Decompression(#[from] std::io::Error),

    #[error("Invalid data length: {len} bytes is not a multiple of {width}")]
    InvalidLength { len: usize, width: usize },

    #[error("Unsupported array encoding: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayEncoding {
    pub precision: Precision,
    pub compression: Compression,
    pub endianness: Endianness,
}

impl ArrayEncoding {
    /// Decodes base64 text into f64 values.
    ///
    /// ```
    /// use diaquery::readers::binary::{ArrayEncoding, Endianness, Precision, Compression};
    ///
    /// // Two big-endian f32 values: 1.0, 2.0
    /// let enc = ArrayEncoding {
    ///     precision: Precision::Float32,
    ///     compression: Compression::None,
    ///     endianness: Endianness::Big,
    /// };
    /// assert_eq!(enc.decode("P4AAAEAAAAA=").unwrap(), vec![1.0, 2.0]);
    /// ```
    pub fn decode(&self, base64_data: &str) -> Result<Vec<f64>, BinaryDecodeError> {
        let trimmed = base64_data.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let decoded = BASE64_STANDARD.decode(trimmed)?;
        let bytes = match self.compression {
            Compression::None => decoded,
            Compression::Zlib => {
                let mut decoder = ZlibDecoder::new(&decoded[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                out
            }
        };

        let width = self.precision.byte_size();
        if bytes.len() % width != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                len: bytes.len(),
                width,
            });
        }

        let values = bytes
            .chunks_exact(width)
            .map(|chunk| match (self.precision, self.endianness) {
                (Precision::Float32, Endianness::Little) => LittleEndian::read_f32(chunk) as f64,
                (Precision::Float32, Endianness::Big) => BigEndian::read_f32(chunk) as f64,
                (Precision::Float64, Endianness::Little) => LittleEndian::read_f64(chunk),
                (Precision::Float64, Endianness::Big) => BigEndian::read_f64(chunk),
            })
            .collect();
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn encode(values: &[f64], enc: ArrayEncoding) -> String {
        let mut bytes = Vec::new();
        for &v in values {
            let mut buf = [0u8; 8];
            match (enc.precision, enc.endianness) {
                (Precision::Float32, Endianness::Little) => {
                    LittleEndian::write_f32(&mut buf[..4], v as f32);
                    bytes.extend_from_slice(&buf[..4]);
                }
                (Precision::Float32, Endianness::Big) => {
                    BigEndian::write_f32(&mut buf[..4], v as f32);
                    bytes.extend_from_slice(&buf[..4]);
                }
                (Precision::Float64, Endianness::Little) => {
                    LittleEndian::write_f64(&mut buf, v);
                    bytes.extend_from_slice(&buf);
                }
                (Precision::Float64, Endianness::Big) => {
                    BigEndian::write_f64(&mut buf, v);
                    bytes.extend_from_slice(&buf);
                }
            }
        }
        if enc.compression == Compression::Zlib {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&bytes).unwrap();
            bytes = encoder.finish().unwrap();
        }
        BASE64_STANDARD.encode(bytes)
    }

    #[test]
    fn test_zlib_little_endian_f64() {
        let enc = ArrayEncoding {
            precision: Precision::Float64,
            compression: Compression::Zlib,
            endianness: Endianness::Little,
        };
        let values = vec![100.5, 200.25, 300.125];
        assert_eq!(enc.decode(&encode(&values, enc)).unwrap(), values);
    }

    #[test]
    fn test_invalid_length() {
        let enc = ArrayEncoding::default();
        // 4 bytes cannot be a f64 array
        let res = enc.decode(&BASE64_STANDARD.encode([0u8; 4]));
        assert!(matches!(res, Err(BinaryDecodeError::InvalidLength { .. })));
    }

    #[test]
    fn test_empty_payload() {
        assert!(ArrayEncoding::default().decode("  ").unwrap().is_empty());
    }
}
