//! Trailing source-map reference handling.
//!
//! The final line is only a candidate here: the transform keeps it out of
//! the wrapper body, and reattaches it after the wrapper, once the parser
//! has confirmed it is a comment.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Module text split from its trailing source-map reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSource<'a> {
    /// Module text without the reference line.
    pub body: &'a str,
    /// The reference value (a URL or an inline `data:` URI), if present.
    pub source_map: Option<&'a str>,
    /// Byte offset of the reference line; the text length when absent.
    pub reference_line: usize,
}

fn reference_line() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^//[#@]\s*sourceMappingURL=(.+?)\s*$").ok())
        .as_ref()
}

/// Detach a source-map reference comment from the end of `code`.
///
/// Only the final non-empty line is considered, so a reference-like string
/// anywhere else in the module (for example inside a string literal) is left
/// alone. A final line that continues a multi-line literal still matches
/// here; [`SplitSource::reference_line`] lets the caller check it against
/// the lexer's comments.
#[must_use]
pub fn split_source_map(code: &str) -> SplitSource<'_> {
    let unsplit = SplitSource {
        body: code,
        source_map: None,
        reference_line: code.len(),
    };

    let trimmed = code.trim_end_matches(&['\n', '\r'][..]);
    let line_start = trimmed.rfind('\n').map_or(0, |i| i + 1);
    let last_line = &trimmed[line_start..];

    let Some(re) = reference_line() else {
        return unsplit;
    };
    let Some(reference) = re.captures(last_line).and_then(|caps| caps.get(1)) else {
        return unsplit;
    };

    let body = code[..line_start].trim_end_matches(&['\n', '\r'][..]);
    SplitSource {
        body,
        source_map: Some(&last_line[reference.start()..reference.end()]),
        reference_line: line_start,
    }
}

/// Reattach a reference detached by [`split_source_map`].
#[must_use]
pub fn attach_source_map(mut code: String, source_map: Option<&str>) -> String {
    if let Some(reference) = source_map {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("//# sourceMappingURL=");
        code.push_str(reference);
    }
    code
}
