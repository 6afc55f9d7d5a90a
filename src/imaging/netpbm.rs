// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Binary netpbm codec
//!
//! Reads and writes 8-bit PGM (`P5`) and PPM (`P6`) images.

use thiserror::Error;

/// Pixel layout of an [`Image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Rgb,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
        }
    }
}

impl std::fmt::Display for Channels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gray => write!(f, "gray"),
            Self::Rgb => write!(f, "rgb"),
        }
    }
}

/// Decoded 8-bit image, rows top to bottom, channels interleaved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: Channels,
    pub pixels: Vec<u8>,
}

impl Image {
    /// Create an image, checking the buffer matches the dimensions
    pub fn new(
        width: usize,
        height: usize,
        channels: Channels,
        pixels: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        let expected = raster_len(width, height, channels)?;
        if pixels.len() != expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Luma of the pixel at (x, y)
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let i = (y * self.width + x) * self.channels.count();
        match self.channels {
            Channels::Gray => self.pixels[i],
            Channels::Rgb => luma(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]),
        }
    }
}

/// Byte length of a raster, rejecting dimensions that overflow `usize`
fn raster_len(width: usize, height: usize, channels: Channels) -> Result<usize, DecodeError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels.count()))
        .ok_or_else(|| DecodeError::MalformedHeader("dimensions too large".into()))
}

/// ITU-R BT.601 luma
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported image format (expected binary PGM 'P5' or PPM 'P6')")]
    UnsupportedFormat,

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Unsupported maximum value {0} (only 8-bit images are supported)")]
    UnsupportedDepth(u32),

    #[error("Pixel data truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Decode a binary PGM or PPM image
pub fn decode(bytes: &[u8]) -> Result<Image, DecodeError> {
    let channels = match bytes.get(..2) {
        Some(b"P5") => Channels::Gray,
        Some(b"P6") => Channels::Rgb,
        _ => return Err(DecodeError::UnsupportedFormat),
    };

    let mut cursor = Header { bytes, pos: 2 };
    let width = cursor.next_number("width")?;
    let height = cursor.next_number("height")?;
    let max_value = cursor.next_number("maximum value")?;

    if width == 0 || height == 0 {
        return Err(DecodeError::MalformedHeader(format!(
            "zero dimension {}x{}",
            width, height
        )));
    }
    if max_value == 0 || max_value > 255 {
        return Err(DecodeError::UnsupportedDepth(max_value));
    }

    // Exactly one whitespace byte separates the header from the raster.
    match bytes.get(cursor.pos) {
        Some(b) if b.is_ascii_whitespace() => cursor.pos += 1,
        _ => {
            return Err(DecodeError::MalformedHeader(
                "missing whitespace before pixel data".into(),
            ))
        }
    }

    let (width, height) = (width as usize, height as usize);
    let expected = raster_len(width, height, channels)?;
    let raster = &bytes[cursor.pos..];
    if raster.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: raster.len(),
        });
    }

    Image::new(width, height, channels, raster[..expected].to_vec())
}

/// Encode an image as binary PGM or PPM
pub fn encode(image: &Image) -> Vec<u8> {
    let magic = match image.channels {
        Channels::Gray => "P5",
        Channels::Rgb => "P6",
    };
    let header = format!("{}\n{} {}\n255\n", magic, image.width, image.height);

    let mut out = Vec::with_capacity(header.len() + image.pixels.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&image.pixels);
    out
}

struct Header<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Header<'_> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next_number(&mut self, field: &str) -> Result<u32, DecodeError> {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }

        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DecodeError::MalformedHeader(format!("invalid {}", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ppm_with_comment() {
        let mut bytes = b"P6\n# made by hand\n2 1\n255\n".to_vec();
        bytes.extend_from_slice(&[255, 0, 0, 0, 0, 255]);

        let image = decode(&bytes).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.channels, Channels::Rgb);
        assert_eq!(image.pixels, vec![255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn test_decode_pgm_ignores_trailing_bytes() {
        let mut bytes = b"P5 3 1 255 ".to_vec();
        bytes.extend_from_slice(&[10, 20, 30, 99]);

        let image = decode(&bytes).unwrap();
        assert_eq!(image.channels, Channels::Gray);
        assert_eq!(image.pixels, vec![10, 20, 30]);
    }

    #[test]
    fn test_rejects_ascii_variants() {
        assert!(matches!(
            decode(b"P3\n1 1\n255\n0 0 0\n"),
            Err(DecodeError::UnsupportedFormat)
        ));
        assert!(matches!(decode(b""), Err(DecodeError::UnsupportedFormat)));
    }

    #[test]
    fn test_rejects_sixteen_bit() {
        assert!(matches!(
            decode(b"P5 1 1 65535 \x00\x00"),
            Err(DecodeError::UnsupportedDepth(65535))
        ));
    }

    #[test]
    fn test_truncated_raster() {
        match decode(b"P6 2 2 255 \x00\x00\x00") {
            Err(DecodeError::Truncated { expected, actual }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            decode(b"P6 two 2 255 "),
            Err(DecodeError::MalformedHeader(_))
        ));
        assert!(matches!(
            decode(b"P5 0 4 255 "),
            Err(DecodeError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_huge_dimensions_are_rejected() {
        match decode(b"P6 4294967295 4294967295 255 \x00") {
            Err(DecodeError::MalformedHeader(reason)) => {
                assert_eq!(reason, "dimensions too large");
            }
            other => panic!("Expected MalformedHeader, got {:?}", other),
        }

        assert!(matches!(
            Image::new(usize::MAX, 2, Channels::Gray, Vec::new()),
            Err(DecodeError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_encode_header() {
        let image = Image::new(1, 2, Channels::Gray, vec![7, 8]).unwrap();
        assert_eq!(encode(&image), b"P5\n1 2\n255\n\x07\x08".to_vec());
    }

    #[test]
    fn test_luma() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
    }
}
