//! Byte-range requests.
//!
//! Only single ranges in the `bytes` unit are honoured. A header that cannot
//! be parsed is ignored and the full body is served, matching how HTTP
//! servers commonly treat malformed `Range` values.

use crate::error::AppError;

/// A single range as written by the client, before the content size is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// `bytes=a-b`
    Bounded { start: u64, end: u64 },
    /// `bytes=a-`
    From { start: u64 },
    /// `bytes=-n`
    Suffix { len: u64 },
}

/// A resolved, inclusive byte span within content of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`; a resolved range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

impl RangeRequest {
    /// Parse a `Range` header value. Returns `None` when the value is
    /// malformed, uses another unit, or asks for multiple ranges.
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.trim().strip_prefix("bytes=")?.trim();
        if spec.contains(',') {
            return None;
        }
        let (start, end) = spec.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => None,
            (true, false) => end.parse().ok().map(|len| Self::Suffix { len }),
            (false, true) => start.parse().ok().map(|start| Self::From { start }),
            (false, false) => {
                let start: u64 = start.parse().ok()?;
                let end: u64 = end.parse().ok()?;
                (start <= end).then_some(Self::Bounded { start, end })
            }
        }
    }

    /// Resolve against the content size, clamping the end to EOF.
    ///
    /// Fails with `RangeNotSatisfiable` when no byte of the request lies
    /// inside the content.
    pub fn resolve(self, size: u64) -> Result<ByteRange, AppError> {
        let unsatisfiable =
            || AppError::range_not_satisfiable(format!("Range not satisfiable for {size} bytes"));

        if size == 0 {
            return Err(unsatisfiable());
        }
        let last = size - 1;

        match self {
            Self::Bounded { start, end } if start <= last => Ok(ByteRange {
                start,
                end: end.min(last),
            }),
            Self::From { start } if start <= last => Ok(ByteRange { start, end: last }),
            Self::Suffix { len } if len > 0 => Ok(ByteRange {
                start: size.saturating_sub(len),
                end: last,
            }),
            _ => Err(unsatisfiable()),
        }
    }
}
