// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Image stage bodies
//!
//! The CLI's pipeline: [`load`] fetches and decodes on the I/O pool,
//! [`render`] filters, encodes, and builds the preview on the compute pool.

pub mod filter;
pub mod netpbm;
pub mod preview;
pub mod source;

pub use filter::{Filter, FilterParseError};
pub use netpbm::{Channels, DecodeError, Image};
pub use source::{FetchError, Source};

use thiserror::Error;

use crate::pipeline::FetchConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Output of the transform stage, ready to display
#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: Image,
    pub filter: Filter,
    /// Encoded netpbm bytes
    pub encoded: Vec<u8>,
    /// BLAKE3 digest of `encoded`, hex
    pub digest: String,
    pub preview: String,
}

/// Fetch and decode a source (blocking)
pub fn load(source: &Source, config: &FetchConfig) -> Result<Image, LoadError> {
    let bytes = source.fetch(config)?;
    let image = netpbm::decode(&bytes)?;
    tracing::debug!(
        %source,
        width = image.width,
        height = image.height,
        channels = %image.channels,
        "decoded source"
    );
    Ok(image)
}

/// Filter an image and prepare everything the consumer needs to display it
pub fn render(image: Image, filter: Filter, preview_columns: usize) -> Rendered {
    let image = filter.apply(image);
    let encoded = netpbm::encode(&image);
    let digest = blake3::hash(&encoded).to_hex().to_string();
    let preview = preview::render(&image, preview_columns);

    Rendered {
        image,
        filter,
        encoded,
        digest,
        preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_render_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.ppm");
        let mut bytes = b"P6 2 1 255\n".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        std::fs::write(&path, &bytes).unwrap();

        let image = load(&Source::File(path), &FetchConfig::default()).unwrap();
        let rendered = render(image, Filter::Invert, 10);

        assert_eq!(rendered.image.pixels, vec![255, 255, 255, 0, 0, 0]);
        assert_eq!(rendered.preview, "@ \n");
        assert_eq!(rendered.digest, blake3::hash(&rendered.encoded).to_hex().to_string());
        assert_eq!(rendered.digest.len(), 64);
    }

    #[test]
    fn test_load_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = load(&Source::File(path), &FetchConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Decode(DecodeError::UnsupportedFormat)));
    }
}
