//! Semantic blame: per-line authorship rolled up to structural elements.
//!
//! The per-line records come from a repository-access collaborator (git
//! blame or equivalent) and are treated as already-available input; this
//! module only combines them with extracted elements.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::StructuralElement;

/// Authorship of one line at one revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAttribution {
    /// Line number (1-indexed).
    pub line: usize,
    pub commit: String,
    pub author: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

/// One author's share of an attributed range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorShare {
    pub author: String,
    pub email: String,
    pub lines: usize,
    /// Percentage of the attributed range, summing to 100 across shares
    /// (up to rounding).
    pub percentage: f64,
    pub last_commit: DateTime<Utc>,
}

/// A maximal run of contiguous lines sharing one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHunk {
    pub commit: String,
    pub author: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Blame rolled up for a (file, revision, optional element) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameAttribution {
    pub file: String,
    /// The element the range was scoped to, when one resolved.
    pub element: Option<String>,
    /// Set when a requested element was not found and attribution fell
    /// back to the whole file.
    pub fallback: bool,
    pub start_line: usize,
    pub end_line: usize,
    /// Shares sorted by line count descending.
    pub shares: Vec<AuthorShare>,
    /// Max line count; ties break toward the most recent commit.
    pub primary: Option<AuthorShare>,
    /// Contiguous same-commit runs. Whole-file summaries only; empty for
    /// element-scoped attributions.
    pub hunks: Vec<KeyHunk>,
}

/// Resolve blame for a file, optionally scoped to one element.
///
/// A dotted target ("Class.method") matches the qualified names the
/// extractor produces. A target that matches nothing is not an error: the
/// result covers the whole file with `fallback` set.
pub fn resolve(
    file: &str,
    attribution: &[LineAttribution],
    elements: &[StructuralElement],
    target: Option<&str>,
) -> BlameAttribution {
    let (element, fallback) = match target {
        Some(name) => match find_target(elements, name) {
            Some(element) => (Some(element), false),
            None => (None, true),
        },
        None => (None, false),
    };

    let (start_line, end_line) = match element {
        Some(e) => (e.start_line, e.end_line()),
        None => file_range(attribution),
    };

    let in_range: Vec<&LineAttribution> = attribution
        .iter()
        .filter(|a| a.line >= start_line && a.line <= end_line)
        .collect();

    let shares = author_shares(&in_range);
    let primary = pick_primary(&shares);
    let hunks = if element.is_none() {
        key_hunks(&in_range)
    } else {
        Vec::new()
    };

    BlameAttribution {
        file: file.to_string(),
        element: element.map(|e| e.name.clone()),
        fallback,
        start_line,
        end_line,
        shares,
        primary,
        hunks,
    }
}

/// Match an element by plain or dotted qualified name. The earliest span
/// wins when a name repeats across kinds.
fn find_target<'a>(
    elements: &'a [StructuralElement],
    name: &str,
) -> Option<&'a StructuralElement> {
    elements
        .iter()
        .filter(|e| e.name == name)
        .min_by_key(|e| e.start_line)
}

fn file_range(attribution: &[LineAttribution]) -> (usize, usize) {
    let min = attribution.iter().map(|a| a.line).min().unwrap_or(0);
    let max = attribution.iter().map(|a| a.line).max().unwrap_or(0);
    (min, max)
}

fn author_shares(lines: &[&LineAttribution]) -> Vec<AuthorShare> {
    let total = lines.len();
    if total == 0 {
        return Vec::new();
    }

    // Identities collapse on (name, email).
    let mut grouped: HashMap<(String, String), (usize, DateTime<Utc>)> = HashMap::new();
    for line in lines {
        let key = (line.author.clone(), line.email.clone());
        let entry = grouped.entry(key).or_insert((0, line.timestamp));
        entry.0 += 1;
        if line.timestamp > entry.1 {
            entry.1 = line.timestamp;
        }
    }

    let mut shares: Vec<AuthorShare> = grouped
        .into_iter()
        .map(|((author, email), (count, last_commit))| AuthorShare {
            author,
            email,
            lines: count,
            percentage: count as f64 / total as f64 * 100.0,
            last_commit,
        })
        .collect();

    shares.sort_by(|a, b| {
        b.lines
            .cmp(&a.lines)
            .then_with(|| b.last_commit.cmp(&a.last_commit))
            .then_with(|| a.author.cmp(&b.author))
    });
    shares
}

fn pick_primary(shares: &[AuthorShare]) -> Option<AuthorShare> {
    // Shares are already ordered by lines desc, then recency.
    shares.first().cloned()
}

/// Merge adjacent lines sharing a commit into maximal contiguous runs.
fn key_hunks(lines: &[&LineAttribution]) -> Vec<KeyHunk> {
    let mut sorted: Vec<&LineAttribution> = lines.to_vec();
    sorted.sort_by_key(|a| a.line);

    let mut hunks: Vec<KeyHunk> = Vec::new();
    for line in sorted {
        match hunks.last_mut() {
            Some(hunk)
                if hunk.commit == line.commit && line.line <= hunk.end_line + 1 =>
            {
                hunk.end_line = hunk.end_line.max(line.line);
            }
            _ => hunks.push(KeyHunk {
                commit: line.commit.clone(),
                author: line.author.clone(),
                start_line: line.line,
                end_line: line.line,
            }),
        }
    }
    hunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ElementKind;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn line(n: usize, commit: &str, author: &str, secs: i64) -> LineAttribution {
        LineAttribution {
            line: n,
            commit: commit.to_string(),
            author: author.to_string(),
            email: format!("{}@example.com", author),
            timestamp: ts(secs),
        }
    }

    fn element(name: &str, kind: ElementKind, start: usize, count: usize) -> StructuralElement {
        StructuralElement {
            name: name.to_string(),
            kind,
            file: "a.py".to_string(),
            start_line: start,
            line_count: count,
            complexity: 1,
            nesting_depth: 0,
            decorators: Vec::new(),
        }
    }

    #[test]
    fn test_element_scoped_attribution() {
        let attribution = vec![
            line(1, "c1", "ana", 100),
            line(2, "c1", "ana", 100),
            line(3, "c2", "bo", 200),
            line(4, "c2", "bo", 200),
            line(5, "c3", "ana", 300),
            line(6, "c3", "ana", 300),
        ];
        let elements = vec![element("handler", ElementKind::Function, 3, 4)];

        let blame = resolve("a.py", &attribution, &elements, Some("handler"));
        assert_eq!(blame.element.as_deref(), Some("handler"));
        assert!(!blame.fallback);
        assert_eq!((blame.start_line, blame.end_line), (3, 6));

        // 4 lines in range: 2 bo, 2 ana.
        let total: f64 = blame.shares.iter().map(|s| s.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(blame.shares.len(), 2);
        assert!(blame.shares.iter().all(|s| s.lines == 2));

        // Tie on lines: ana's last commit (300) is more recent than bo's.
        assert_eq!(blame.primary.as_ref().unwrap().author, "ana");

        // Element-scoped rollups carry no hunks.
        assert!(blame.hunks.is_empty());
    }

    #[test]
    fn test_dotted_method_target() {
        let attribution = vec![line(10, "c1", "ana", 100), line(11, "c1", "ana", 100)];
        let elements = vec![
            element("Widget", ElementKind::Class, 5, 20),
            element("Widget.render", ElementKind::Method, 10, 2),
        ];

        let blame = resolve("a.py", &attribution, &elements, Some("Widget.render"));
        assert_eq!(blame.element.as_deref(), Some("Widget.render"));
        assert_eq!((blame.start_line, blame.end_line), (10, 11));
    }

    #[test]
    fn test_missing_target_falls_back_to_file() {
        let attribution = vec![line(1, "c1", "ana", 100), line(2, "c2", "bo", 200)];
        let blame = resolve("a.py", &attribution, &[], Some("ghost"));

        assert!(blame.fallback);
        assert!(blame.element.is_none());
        assert_eq!((blame.start_line, blame.end_line), (1, 2));
        assert_eq!(blame.shares.len(), 2);
        // Whole-file output carries hunks.
        assert_eq!(blame.hunks.len(), 2);
    }

    #[test]
    fn test_primary_is_max_lines() {
        let attribution = vec![
            line(1, "c1", "ana", 100),
            line(2, "c1", "ana", 100),
            line(3, "c2", "bo", 999),
        ];
        let blame = resolve("a.py", &attribution, &[], None);
        assert_eq!(blame.primary.as_ref().unwrap().author, "ana");
    }

    #[test]
    fn test_identity_collapses_on_name_and_email() {
        let mut a = line(1, "c1", "ana", 100);
        a.email = "ana@one.com".to_string();
        let mut b = line(2, "c1", "ana", 100);
        b.email = "ana@two.com".to_string();

        let blame = resolve("a.py", &[a, b], &[], None);
        // Same name, different email: two identities.
        assert_eq!(blame.shares.len(), 2);
    }

    #[test]
    fn test_key_hunks_merge_contiguous_commits() {
        let attribution = vec![
            line(1, "c1", "ana", 100),
            line(2, "c1", "ana", 100),
            line(3, "c2", "bo", 200),
            line(4, "c1", "ana", 100),
        ];
        let blame = resolve("a.py", &attribution, &[], None);

        // c1 lines 1-2, c2 line 3, c1 line 4 again: three hunks.
        assert_eq!(blame.hunks.len(), 3);
        assert_eq!(blame.hunks[0].start_line, 1);
        assert_eq!(blame.hunks[0].end_line, 2);
        assert_eq!(blame.hunks[2].start_line, 4);
    }

    #[test]
    fn test_empty_attribution() {
        let blame = resolve("a.py", &[], &[], None);
        assert!(blame.shares.is_empty());
        assert!(blame.primary.is_none());
        assert!(blame.hunks.is_empty());
    }
}
