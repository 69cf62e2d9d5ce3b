//! HTTP `Range` header handling.

use thiserror::Error;

/// A single satisfiable byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl ByteRange {
    /// Byte count; a parsed range always covers at least one byte.
    pub(crate) fn len(&self) -> u64 {
        self.end_inclusive - self.start + 1
    }

    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end_inclusive, size)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Not a single `bytes=` range we understand; the header is ignored.
    #[error("malformed range: {0}")]
    Malformed(String),

    /// Well-formed but outside the file; answered with 416.
    #[error("range not satisfiable for size {0}")]
    Unsatisfiable(u64),
}

/// Parse a single byte range: `bytes=a-b`, `bytes=a-` or `bytes=-n`.
pub fn parse_range_header(range_str: &str, file_size: u64) -> Result<ByteRange, RangeError> {
    let range_str = range_str.trim();
    let range_set = range_str
        .strip_prefix("bytes=")
        .ok_or_else(|| RangeError::Malformed("only bytes ranges supported".into()))?;

    // Multi-range responses are not supported
    if range_set.contains(',') {
        return Err(RangeError::Malformed("multi-range not supported".into()));
    }

    let (start_s, end_s) = range_set
        .split_once('-')
        .ok_or_else(|| RangeError::Malformed(range_set.to_string()))?;
    let (start_s, end_s) = (start_s.trim(), end_s.trim());

    if start_s.is_empty() {
        // bytes=-500 means the last 500 bytes
        let suffix: u64 = end_s
            .parse()
            .map_err(|_| RangeError::Malformed("bad range suffix".into()))?;
        if suffix == 0 || file_size == 0 {
            return Err(RangeError::Unsatisfiable(file_size));
        }
        return Ok(ByteRange {
            start: file_size.saturating_sub(suffix),
            end_inclusive: file_size - 1,
        });
    }

    let start: u64 = start_s
        .parse()
        .map_err(|_| RangeError::Malformed("bad range start".into()))?;

    let end: Option<u64> = if end_s.is_empty() {
        None
    } else {
        Some(
            end_s
                .parse()
                .map_err(|_| RangeError::Malformed("bad range end".into()))?,
        )
    };

    if let Some(end) = end {
        if end < start {
            return Err(RangeError::Malformed("range start > end".into()));
        }
    }

    if start >= file_size {
        return Err(RangeError::Unsatisfiable(file_size));
    }

    let last = file_size - 1;
    Ok(ByteRange {
        start,
        end_inclusive: end.map_or(last, |e| e.min(last)),
    })
}

/// Content-type guess from file extension.
pub fn content_type_for_path(path: &str) -> &'static str {
    match path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("ts") => "video/mp2t",
        Some("mpg" | "mpeg") => "video/mpeg",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("srt") => "application/x-subrip",
        _ => "application/octet-stream",
    }
}
