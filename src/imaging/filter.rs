// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Image filters
//!
//! Filters take the image by value and work in place where the channel layout
//! allows it. Pixels are processed in parallel with rayon, so when a filter
//! runs inside the compute pool it spreads across that pool's threads.

use rayon::prelude::*;
use thiserror::Error;

use super::netpbm::{luma, Channels, Image};

/// Rows handed to a rayon task at a time
const ROWS_PER_TASK: usize = 16;

/// Available filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Leave the image unchanged
    Identity,
    /// Convert to single-channel luma
    #[default]
    Grayscale,
    /// Invert every channel
    Invert,
    /// Warm brown tone
    Sepia,
    /// Black or white by luma cut-off
    Threshold(u8),
}

#[derive(Debug, Error)]
#[error("Unknown filter '{0}' (expected identity, grayscale, invert, sepia, or threshold[:N])")]
pub struct FilterParseError(String);

impl std::str::FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (name, arg) = match lower.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (lower.as_str(), None),
        };

        match (name, arg) {
            ("identity" | "none", None) => Ok(Self::Identity),
            ("grayscale" | "greyscale" | "gray", None) => Ok(Self::Grayscale),
            ("invert", None) => Ok(Self::Invert),
            ("sepia", None) => Ok(Self::Sepia),
            ("threshold", None) => Ok(Self::Threshold(128)),
            ("threshold", Some(level)) => level
                .parse()
                .map(Self::Threshold)
                .map_err(|_| FilterParseError(s.to_string())),
            _ => Err(FilterParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Grayscale => write!(f, "grayscale"),
            Self::Invert => write!(f, "invert"),
            Self::Sepia => write!(f, "sepia"),
            Self::Threshold(level) => write!(f, "threshold:{}", level),
        }
    }
}

impl Filter {
    /// Apply the filter
    pub fn apply(self, image: Image) -> Image {
        match self {
            Self::Identity => image,
            Self::Grayscale => to_gray(image, |v| v),
            Self::Threshold(level) => to_gray(image, |v| if v >= level { 255 } else { 0 }),
            Self::Invert => invert(image),
            Self::Sepia => sepia(image),
        }
    }
}

fn to_gray(image: Image, map: impl Fn(u8) -> u8 + Sync) -> Image {
    let Image {
        width,
        height,
        channels,
        pixels,
    } = image;

    let pixels: Vec<u8> = match channels {
        Channels::Gray => pixels.into_par_iter().map(&map).collect(),
        Channels::Rgb => pixels
            .par_chunks_exact(3)
            .map(|p| map(luma(p[0], p[1], p[2])))
            .collect(),
    };

    Image {
        width,
        height,
        channels: Channels::Gray,
        pixels,
    }
}

fn invert(mut image: Image) -> Image {
    let row = (image.width * image.channels.count()).max(1);
    image
        .pixels
        .par_chunks_mut(row * ROWS_PER_TASK)
        .for_each(|rows| rows.iter_mut().for_each(|v| *v = 255 - *v));
    image
}

fn sepia(image: Image) -> Image {
    let mut image = match image.channels {
        Channels::Rgb => image,
        Channels::Gray => Image {
            pixels: image.pixels.iter().flat_map(|&v| [v, v, v]).collect(),
            channels: Channels::Rgb,
            ..image
        },
    };

    image.pixels.par_chunks_exact_mut(3).for_each(|p| {
        let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
        p[0] = (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8;
        p[1] = (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8;
        p[2] = (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8;
    });
    image
}
