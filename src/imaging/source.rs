// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Image sources
//!
//! Fetching is blocking on purpose: it runs as the body of the I/O stage.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::FetchConfig;

/// Where the source bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl std::str::FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::File(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source is larger than the {limit} byte limit")]
    TooLarge { limit: u64 },
}

impl Source {
    /// Fetch the raw bytes, blocking the calling thread
    pub fn fetch(&self, config: &FetchConfig) -> Result<Vec<u8>, FetchError> {
        match self {
            Self::Url(url) => fetch_url(url, config),
            Self::File(path) => {
                let read_error = |source| FetchError::Read {
                    path: path.clone(),
                    source,
                };
                let len = std::fs::metadata(path).map_err(read_error)?.len();
                if len > config.max_bytes {
                    return Err(FetchError::TooLarge {
                        limit: config.max_bytes,
                    });
                }
                std::fs::read(path).map_err(read_error)
            }
        }
    }
}

fn fetch_url(url: &str, config: &FetchConfig) -> Result<Vec<u8>, FetchError> {
    let http_error = |source| FetchError::Http {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(http_error)?;

    let response = client.get(url).send().map_err(http_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if response.content_length().is_some_and(|len| len > config.max_bytes) {
        return Err(FetchError::TooLarge {
            limit: config.max_bytes,
        });
    }

    // Servers may omit or understate Content-Length; cap the read as well.
    let mut body = Vec::new();
    response
        .take(config.max_bytes + 1)
        .read_to_end(&mut body)
        .map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

    if body.len() as u64 > config.max_bytes {
        return Err(FetchError::TooLarge {
            limit: config.max_bytes,
        });
    }

    tracing::debug!(url, bytes = body.len(), "fetched source");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            "https://example.com/a.ppm".parse::<Source>().unwrap(),
            Source::Url("https://example.com/a.ppm".into())
        );
        assert_eq!(
            "images/a.ppm".parse::<Source>().unwrap(),
            Source::File(PathBuf::from("images/a.ppm"))
        );
    }

    #[test]
    fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgm");
        std::fs::write(&path, b"P5 1 1 255 \x80").unwrap();

        let bytes = Source::File(path).fetch(&FetchConfig::default()).unwrap();
        assert_eq!(bytes, b"P5 1 1 255 \x80".to_vec());
    }

    #[test]
    fn test_fetch_missing_file() {
        let err = Source::File(PathBuf::from("/definitely/not/here.ppm"))
            .fetch(&FetchConfig::default())
            .unwrap_err();
        assert!(matches!(err, FetchError::Read { .. }));
    }

    #[test]
    fn test_fetch_respects_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pgm");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let config = FetchConfig {
            max_bytes: 16,
            ..FetchConfig::default()
        };
        let err = Source::File(path).fetch(&config).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }
}
