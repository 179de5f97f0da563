//! Filter terms and typed value comparison.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::value::FieldValue;
use super::QueryError;

/// Comparison operators supported by filter terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// `~=`: case-insensitive regex match.
    Regex,
    /// `..`: inclusive range, literal is "min..max".
    Range,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Ge => ">=",
            FilterOp::Le => "<=",
            FilterOp::Regex => "~=",
            FilterOp::Range => "..",
        }
    }
}

/// One filter term: (field, operator, literal). Stateless, built per query.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

lazy_static! {
    /// Term shape: field, operator, literal. Multi-char operators listed
    /// first so ">=" never parses as ">" + "=...".
    static ref TERM_RE: Regex =
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)\s*(~=|>=|<=|!=|==|=|>|<)\s*(.*)$").unwrap();
}

impl Filter {
    pub fn new(field: &str, op: FilterOp, value: &str) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.to_string(),
        }
    }

    /// Parse one term like `complexity>10` or `lines=10..50`.
    ///
    /// An equality term whose literal carries exactly one `..` becomes a
    /// range filter; more than one separator is malformed.
    pub fn parse(term: &str) -> Result<Self, QueryError> {
        let caps = TERM_RE
            .captures(term.trim())
            .ok_or_else(|| QueryError::InvalidFilter(term.to_string()))?;

        let field = caps[1].to_string();
        let op_text = &caps[2];
        let value = caps[3].trim().to_string();

        let op = match op_text {
            "=" | "==" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            ">" => FilterOp::Gt,
            "<" => FilterOp::Lt,
            ">=" => FilterOp::Ge,
            "<=" => FilterOp::Le,
            "~=" => FilterOp::Regex,
            _ => return Err(QueryError::InvalidFilter(term.to_string())),
        };

        if op == FilterOp::Eq && value.contains("..") {
            let separators = value.matches("..").count();
            if separators != 1 {
                return Err(QueryError::InvalidFilter(term.to_string()));
            }
            return Ok(Self {
                field,
                op: FilterOp::Range,
                value,
            });
        }

        Ok(Self { field, op, value })
    }

    /// Parse an `&`-joined conjunction of terms. Any malformed term rejects
    /// the whole query; filters are never partially applied.
    pub fn parse_query(query: &str) -> Result<Vec<Self>, QueryError> {
        query
            .split('&')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Per-call-site comparison options.
///
/// Consuming domains disagree on these semantics, so they stay options
/// rather than crate-wide policy: case sensitivity of string comparison,
/// whether list fields match when ANY element matches, and whether `!=`
/// against a null field is true.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOptions {
    pub case_insensitive: bool,
    pub match_list_elements: bool,
    pub null_not_equal: bool,
}

/// Cache of compiled filter regexes, keyed by pattern text.
///
/// Explicitly passed in by the call site; an invalid pattern caches as
/// "matches nothing" and is reported once.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a case-insensitive pattern, or fetch the cached result.
    pub fn compile(&mut self, pattern: &str) -> Option<&Regex> {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(pattern, error = %e, "invalid filter regex, matching nothing");
                        None
                    }
                }
            })
            .as_ref()
    }
}

/// Compare a field value against a filter literal.
///
/// Both operands attempt numeric coercion; if both succeed the comparison
/// is numeric, otherwise string comparison applies under the call site's
/// options.
pub fn compare_values(
    a: &FieldValue,
    op: FilterOp,
    b: &str,
    options: &CompareOptions,
    cache: &mut RegexCache,
) -> bool {
    // List fields: optional any-element semantics for =, !=, ~=.
    if let FieldValue::List(items) = a {
        if options.match_list_elements && matches!(op, FilterOp::Eq | FilterOp::Ne | FilterOp::Regex)
        {
            return items
                .iter()
                .any(|item| compare_values(item, op, b, options, cache));
        }
    }

    if a.is_null() {
        return match op {
            FilterOp::Ne => options.null_not_equal,
            _ => false,
        };
    }

    match op {
        FilterOp::Eq => equals(a, b, options),
        FilterOp::Ne => !equals(a, b, options),
        FilterOp::Gt | FilterOp::Lt | FilterOp::Ge | FilterOp::Le => ordered(a, op, b, options),
        FilterOp::Regex => cache
            .compile(b)
            .map(|re| re.is_match(&a.as_text()))
            .unwrap_or(false),
        FilterOp::Range => in_range(a, b, options),
    }
}

fn fold_case(s: &str, options: &CompareOptions) -> String {
    if options.case_insensitive {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

fn equals(a: &FieldValue, b: &str, options: &CompareOptions) -> bool {
    match (a.as_num(), b.trim().parse::<f64>().ok()) {
        (Some(x), Some(y)) => x == y,
        _ => fold_case(&a.as_text(), options) == fold_case(b, options),
    }
}

fn ordered(a: &FieldValue, op: FilterOp, b: &str, options: &CompareOptions) -> bool {
    let ordering = match (a.as_num(), b.trim().parse::<f64>().ok()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(fold_case(&a.as_text(), options).cmp(&fold_case(b, options))),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        FilterOp::Gt => ordering.is_gt(),
        FilterOp::Lt => ordering.is_lt(),
        FilterOp::Ge => ordering.is_ge(),
        FilterOp::Le => ordering.is_le(),
        _ => false,
    }
}

/// Inclusive `min..max`, numeric when all three operands coerce.
fn in_range(a: &FieldValue, bounds: &str, options: &CompareOptions) -> bool {
    let Some((lo, hi)) = bounds.split_once("..") else {
        return false;
    };
    match (
        a.as_num(),
        lo.trim().parse::<f64>().ok(),
        hi.trim().parse::<f64>().ok(),
    ) {
        (Some(x), Some(min), Some(max)) => x >= min && x <= max,
        _ => {
            let text = fold_case(&a.as_text(), options);
            text.as_str() >= fold_case(lo, options).as_str()
                && text.as_str() <= fold_case(hi, options).as_str()
        }
    }
}
