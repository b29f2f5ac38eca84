//! HTTP Range header parsing.
//!
//! Only single byte ranges are honored; a multi-range list falls back to its
//! first range, and a header too malformed to interpret is treated as absent
//! so the client still gets the full file.

/// Outcome of interpreting a `Range` header against a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No header, or one that must be ignored; serve the whole file.
    Full,
    /// A satisfiable byte span, inclusive on both ends.
    Partial { start: u64, end: u64 },
    /// Syntactically valid but not satisfiable for this file.
    Unsatisfiable,
}

/// Parse a `Range` header value for a file of `size` bytes.
///
/// Supports `bytes=start-end`, `bytes=start-` (to EOF) and `bytes=-suffix`
/// (last N bytes). The end position is clamped to `size - 1`. A span whose
/// start lies at or past EOF, or behind its own end, is unsatisfiable.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeOutcome {
    let header = match header {
        Some(h) => h.trim(),
        None => return RangeOutcome::Full,
    };

    let ranges = match header.strip_prefix("bytes=") {
        Some(r) => r,
        None => return RangeOutcome::Full,
    };

    // Only the first range of a list is served.
    let spec = match ranges.split(',').next() {
        Some(s) => s.trim(),
        None => return RangeOutcome::Full,
    };

    let (start_str, end_str) = match spec.split_once('-') {
        Some(parts) => parts,
        None => return RangeOutcome::Full,
    };

    match (start_str.is_empty(), end_str.is_empty()) {
        // "-suffix": last N bytes
        (true, false) => {
            let suffix: u64 = match end_str.parse() {
                Ok(n) => n,
                Err(_) => return RangeOutcome::Full,
            };
            let start = size.saturating_sub(suffix);
            clamp_span(start, size.saturating_sub(1), size)
        }
        // "start-": to EOF
        (false, true) => {
            let start: u64 = match start_str.parse() {
                Ok(n) => n,
                Err(_) => return RangeOutcome::Full,
            };
            clamp_span(start, size.saturating_sub(1), size)
        }
        // "start-end"
        (false, false) => {
            let start: u64 = match start_str.parse() {
                Ok(n) => n,
                Err(_) => return RangeOutcome::Full,
            };
            let end: u64 = match end_str.parse() {
                Ok(n) => n,
                Err(_) => return RangeOutcome::Full,
            };
            clamp_span(start, end.min(size.saturating_sub(1)), size)
        }
        // "-" alone carries no positions
        (true, true) => RangeOutcome::Full,
    }
}

fn clamp_span(start: u64, end: u64, size: u64) -> RangeOutcome {
    if start >= size || start > end {
        return RangeOutcome::Unsatisfiable;
    }
    RangeOutcome::Partial { start, end }
}
