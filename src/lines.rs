//! Line classification for file summaries.

use serde::{Deserialize, Serialize};

use crate::analysis::LanguageBackend;

/// Per-file line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    pub total: usize,
    pub code: usize,
    pub comment: usize,
    pub blank: usize,
}

/// Classify the lines of a file using a backend's comment syntax.
///
/// A line carrying both code and a trailing comment counts as code. Block
/// comment interiors count as comment lines.
pub fn count_lines(source: &str, backend: &dyn LanguageBackend) -> LineCounts {
    classify(source, backend.line_comment(), backend.block_comment())
}

fn classify(
    source: &str,
    line_comment: &str,
    block_comment: Option<(&str, &str)>,
) -> LineCounts {
    let mut counts = LineCounts::default();
    let mut in_block = false;

    for line in source.lines() {
        counts.total += 1;
        let trimmed = line.trim();

        if in_block {
            counts.comment += 1;
            if let Some((_, close)) = block_comment {
                if trimmed.contains(close) {
                    in_block = false;
                }
            }
            continue;
        }

        if trimmed.is_empty() {
            counts.blank += 1;
            continue;
        }

        if trimmed.starts_with(line_comment) {
            counts.comment += 1;
            continue;
        }

        if let Some((open, close)) = block_comment {
            if trimmed.starts_with(open) {
                counts.comment += 1;
                // A block opened and closed on the same line stays closed.
                let rest = &trimmed[open.len()..];
                if !rest.contains(close) {
                    in_block = true;
                }
                continue;
            }
        }

        counts.code += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_python() {
        let source = "\
import os

# a comment
x = 1  # trailing
";
        let counts = classify(source, "#", None);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.code, 2);
        assert_eq!(counts.comment, 1);
        assert_eq!(counts.blank, 1);
    }

    #[test]
    fn test_classify_block_comments() {
        let source = "\
/* start
   middle
   end */
fn main() {}

// line
/* single line */
";
        let counts = classify(source, "//", Some(("/*", "*/")));
        assert_eq!(counts.total, 7);
        assert_eq!(counts.comment, 5);
        assert_eq!(counts.code, 1);
        assert_eq!(counts.blank, 1);
    }

    #[test]
    fn test_empty_source() {
        let counts = classify("", "//", None);
        assert_eq!(counts, LineCounts::default());
    }
}
