//! Span-addressed text edits over the module source.

/// A single replacement of `start..end` with `text`. Insertions have `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Collected edits, applied in one pass.
#[derive(Debug, Default)]
pub struct Edits {
    edits: Vec<Edit>,
}

impl Edits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the byte range `start..end`.
    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    /// Insert `text` before the byte at `at`.
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(at, at, text);
    }

    /// Delete the byte range `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) {
        self.replace(start, end, "");
    }

    /// Apply every edit to `source`.
    ///
    /// Edits are ordered by position; insertions at a position land before a
    /// replacement starting there, and keep their recording order otherwise.
    /// Overlapping replacements are rejected.
    pub fn apply(mut self, source: &str) -> Result<String, String> {
        self.edits.sort_by_key(|e| (e.start, e.end));

        let mut out = String::with_capacity(source.len() + 256);
        let mut cursor = 0;
        for edit in &self.edits {
            if edit.start < cursor || edit.end > source.len() || edit.start > edit.end {
                return Err(format!(
                    "edit {}..{} overlaps a previous edit or falls outside the source",
                    edit.start, edit.end
                ));
            }
            let kept = source
                .get(cursor..edit.start)
                .ok_or_else(|| format!("edit at {} splits a character", edit.start))?;
            out.push_str(kept);
            out.push_str(&edit.text);
            cursor = edit.end;
        }
        out.push_str(source.get(cursor..).unwrap_or_default());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_position_order() {
        let mut edits = Edits::new();
        edits.replace(6, 11, "there");
        edits.insert(0, ">> ");
        assert_eq!(edits.apply("hello world").unwrap(), ">> hello there");
    }

    #[test]
    fn test_insert_before_replace_at_same_offset() {
        let mut edits = Edits::new();
        edits.replace(4, 5, "Y");
        edits.insert(4, "X = ");
        assert_eq!(edits.apply("a = b;").unwrap(), "a = X = Y;");
    }

    #[test]
    fn test_insertions_keep_recording_order() {
        let mut edits = Edits::new();
        edits.insert(3, "1");
        edits.insert(3, "2");
        assert_eq!(edits.apply("abc").unwrap(), "abc12");
    }

    #[test]
    fn test_overlap_rejected() {
        let mut edits = Edits::new();
        edits.replace(0, 4, "");
        edits.replace(2, 6, "");
        assert!(edits.apply("abcdefgh").is_err());
    }
}
