//! Parser for the `Content-Range` request header sent with resumable chunks.
//!
//! Accepted forms:
//! - `bytes 0-1023/4096` (a chunk of a document of known size)
//! - `bytes 1024-2047/*` (a chunk of a streamed document)
//! - `bytes */4096`      (end of a streamed document)

use std::str::FromStr;
use thiserror::Error;

const BYTES_PREFIX: &str = "bytes ";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid Content-Range: {0}")]
pub struct ContentRangeError(pub String);

/// Inclusive byte range carried by a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// A parsed `Content-Range`. At least one of `range` / `total` is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub range: Option<ByteRange>,
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn known_range(&self) -> bool {
        self.range.is_some()
    }

    pub fn known_total(&self) -> bool {
        self.total.is_some()
    }
}

impl FromStr for ContentRange {
    type Err = ContentRangeError;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let invalid = || ContentRangeError(header.to_string());

        let rest = header.strip_prefix(BYTES_PREFIX).ok_or_else(invalid)?;
        let (range_part, total_part) = rest.split_once('/').ok_or_else(invalid)?;

        let range = match range_part {
            "*" => None,
            _ => {
                let (start, end) = range_part.split_once('-').ok_or_else(invalid)?;
                Some(ByteRange {
                    start: start.parse().map_err(|_| invalid())?,
                    end: end.parse().map_err(|_| invalid())?,
                })
            }
        };

        let total = match total_part {
            "*" => None,
            _ => Some(total_part.parse().map_err(|_| invalid())?),
        };

        if range.is_none() && total.is_none() {
            return Err(invalid());
        }

        Ok(ContentRange { range, total })
    }
}
