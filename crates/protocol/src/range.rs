//! HTTP `Range` header parsing and response planning.
//!
//! # Header Format
//!
//! ```text
//! Range: bytes=<start>-<end>[, <start>-<end>]...
//! ```
//!
//! - `bytes=500-999` → bytes 500 through 999 inclusive
//! - `bytes=500-`    → byte 500 through the end of the file
//! - `bytes=-100`    → the last 100 bytes
//!
//! Only single-range requests are honored. A header that names several
//! satisfiable ranges is answered with the full content, as is a header that
//! cannot be parsed or names no satisfiable range.

use crate::error::{ProtocolError, Result};

/// Range unit accepted in the `Range` header.
pub const RANGE_UNIT: &str = "bytes";

/// Status code for a full-content response.
pub const STATUS_OK: u16 = 200;

/// Status code for a partial-content response.
pub const STATUS_PARTIAL_CONTENT: u16 = 206;

/// An inclusive, zero-indexed byte range with `start <= end < size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by this range.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A valid range is never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Parse one `<start>-<end>` spec against a file size.
    ///
    /// Returns `None` for anything that is malformed or not satisfiable.
    fn parse_spec(spec: &str, size: u64) -> Option<Self> {
        let (start, end) = spec.trim().split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        if size == 0 {
            return None;
        }

        let range = match (start.is_empty(), end.is_empty()) {
            (true, true) => return None,
            // Suffix form: the last N bytes.
            (true, false) => {
                let suffix: u64 = end.parse().ok()?;
                let start = size.checked_sub(suffix)?;
                ByteRange {
                    start,
                    end: size - 1,
                }
            }
            (false, true) => ByteRange {
                start: start.parse().ok()?,
                end: size - 1,
            },
            (false, false) => ByteRange {
                start: start.parse().ok()?,
                end: end.parse().ok()?,
            },
        };

        (range.start <= range.end && range.end < size).then_some(range)
    }
}

/// Parse a `Range` header value against a file size.
///
/// Returns every satisfiable sub-range in header order; malformed or
/// out-of-bounds sub-ranges are dropped. Fails only when the header does not
/// use the `bytes` unit.
pub fn parse_range_header(value: &str, size: u64) -> Result<Vec<ByteRange>> {
    let (unit, specs) = value
        .trim()
        .split_once('=')
        .ok_or_else(|| ProtocolError::InvalidRange(value.to_string()))?;

    if !unit.trim().eq_ignore_ascii_case(RANGE_UNIT) {
        return Err(ProtocolError::InvalidRange(value.to_string()));
    }

    Ok(specs
        .split(',')
        .filter_map(|spec| ByteRange::parse_spec(spec, size))
        .collect())
}

/// How a file should be answered given its size and the request's `Range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePlan {
    /// Send the whole file with status 200.
    Full {
        /// File size in bytes.
        size: u64,
    },
    /// Send a single range with status 206.
    Partial {
        /// Range to send.
        range: ByteRange,
        /// File size in bytes.
        size: u64,
    },
}

impl RangePlan {
    /// Decide between a full and a partial response.
    pub fn from_header(size: u64, header: Option<&str>) -> Self {
        let Some(header) = header else {
            return RangePlan::Full { size };
        };

        match parse_range_header(header, size) {
            Ok(ranges) if ranges.len() == 1 => RangePlan::Partial {
                range: ranges[0],
                size,
            },
            _ => RangePlan::Full { size },
        }
    }

    /// HTTP status code for this plan.
    pub fn status(&self) -> u16 {
        match self {
            RangePlan::Full { .. } => STATUS_OK,
            RangePlan::Partial { .. } => STATUS_PARTIAL_CONTENT,
        }
    }

    /// Value of the `Content-Length` header.
    pub fn content_length(&self) -> u64 {
        match self {
            RangePlan::Full { size } => *size,
            RangePlan::Partial { range, .. } => range.len(),
        }
    }

    /// Value of the `Content-Range` header, for partial responses only.
    pub fn content_range(&self) -> Option<String> {
        match self {
            RangePlan::Full { .. } => None,
            RangePlan::Partial { range, size } => {
                Some(format!("bytes {}-{}/{}", range.start, range.end, size))
            }
        }
    }

    /// Byte offset the body starts at.
    pub fn offset(&self) -> u64 {
        match self {
            RangePlan::Full { .. } => 0,
            RangePlan::Partial { range, .. } => range.start,
        }
    }

    /// Whether this is a partial response.
    pub fn is_partial(&self) -> bool {
        matches!(self, RangePlan::Partial { .. })
    }
}
