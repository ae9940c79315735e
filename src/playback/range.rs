// src/playback/range.rs

/// A single `Range: bytes=...` request, before the file size is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-` or `bytes=start-end`.
    From { start: u64, end: Option<u64> },
    /// `bytes=-n`: the last `n` bytes.
    Suffix(u64),
}

/// Inclusive byte span inside a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Parses a `Range` header value.
///
/// Only a single `bytes` range is understood. Anything else (other units,
/// multiple ranges, garbage, `end < start`) yields `None` and the request is
/// handled as if no range was sent.
pub fn parse_range_header(value: &str) -> Option<RangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') {
        return None;
    }

    let (first, last) = spec.split_once('-')?;
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        return last.parse().ok().map(RangeSpec::Suffix);
    }

    let start: u64 = first.parse().ok()?;
    let end = if last.is_empty() {
        None
    } else {
        let end: u64 = last.parse().ok()?;
        if end < start {
            return None;
        }
        Some(end)
    };

    Some(RangeSpec::From { start, end })
}

impl RangeSpec {
    /// Clamps the request to a file of `size` bytes. `None` means the range
    /// cannot be satisfied (416).
    pub fn resolve(self, size: u64) -> Option<ByteRange> {
        if size == 0 {
            return None;
        }
        let last = size - 1;

        match self {
            RangeSpec::From { start, end } => {
                if start > last {
                    return None;
                }
                Some(ByteRange {
                    start,
                    end: end.map_or(last, |e| e.min(last)),
                })
            }
            RangeSpec::Suffix(0) => None,
            RangeSpec::Suffix(n) => Some(ByteRange {
                start: size.saturating_sub(n),
                end: last,
            }),
        }
    }
}

impl ByteRange {
    /// Number of bytes in the span; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}
