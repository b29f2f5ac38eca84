//! Escaping for strings interpolated into filter graphs and concat lists.
//!
//! Filter descriptions are parsed twice by FFmpeg (once as a graph, once as
//! filter options), so every user-supplied value that lands in one must have
//! its metacharacters neutralized before interpolation.

/// Escape a value for inclusion in a filter-graph description.
///
/// Backslash-prefixes the filter-language metacharacters and folds line
/// breaks into spaces. Working character by character keeps the backslash
/// case from interfering with the others.
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("\\'"),
            ',' => out.push_str("\\,"),
            '%' => out.push_str("\\%"),
            '[' => out.push_str("\\["),
            ']' => out.push_str("\\]"),
            '\n' | '\r' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Escape a path for a single-quoted concat demuxer list entry.
///
/// The demuxer reads `file '<path>'` lines; an embedded quote terminates the
/// string, so it becomes `'\''` (close, escaped quote, reopen).
pub fn escape_concat_path(path: &str) -> String {
    path.replace('\'', "'\\''")
}
