//! Typed field values and the record access trait.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::analysis::StructuralElement;
use crate::score::{FileSummary, HotspotRecord};

/// A field value as seen by the query engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Num(f64),
    Str(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Numeric coercion. Strings coerce when they parse as a number.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            FieldValue::Num(n) => Some(*n),
            FieldValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text rendering used when numeric comparison does not apply. Lists
    /// join their elements with commas.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Str(s) => s.clone(),
            FieldValue::List(items) => items
                .iter()
                .map(|v| v.as_text())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Num(n)
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        FieldValue::Num(n as f64)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Num(n as f64)
    }
}

/// Anything the query engine can evaluate filters against.
///
/// Unknown fields return `FieldValue::Null`; the comparison rules decide
/// what that means per operator.
pub trait Queryable {
    fn field(&self, name: &str) -> FieldValue;
}

/// A generic string-keyed record, for adapters whose rows have no dedicated
/// type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Record(pub BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

impl Queryable for Record {
    fn field(&self, name: &str) -> FieldValue {
        self.0.get(name).cloned().unwrap_or(FieldValue::Null)
    }
}

impl Queryable for StructuralElement {
    fn field(&self, name: &str) -> FieldValue {
        match name {
            "name" => FieldValue::from(self.name.as_str()),
            "kind" => FieldValue::from(self.kind.as_str()),
            "file" => FieldValue::from(self.file.as_str()),
            "start_line" => FieldValue::from(self.start_line),
            "lines" | "line_count" => FieldValue::from(self.line_count),
            "complexity" => FieldValue::from(self.complexity),
            "nesting" | "nesting_depth" => FieldValue::from(self.nesting_depth),
            "decorators" => FieldValue::List(
                self.decorators
                    .iter()
                    .map(|d| FieldValue::from(d.as_str()))
                    .collect(),
            ),
            _ => FieldValue::Null,
        }
    }
}

impl Queryable for FileSummary {
    fn field(&self, name: &str) -> FieldValue {
        match name {
            "file" => FieldValue::from(self.file.as_str()),
            "lines" | "total_lines" => FieldValue::from(self.lines.total),
            "code_lines" => FieldValue::from(self.lines.code),
            "comment_lines" => FieldValue::from(self.lines.comment),
            "blank_lines" => FieldValue::from(self.lines.blank),
            "functions" => FieldValue::from(self.counts.functions),
            "classes" => FieldValue::from(self.counts.classes),
            "imports" => FieldValue::from(self.counts.imports),
            "avg_complexity" => FieldValue::from(self.complexity.avg),
            "max_complexity" => FieldValue::from(self.complexity.max),
            "min_complexity" => FieldValue::from(self.complexity.min),
            "quality" | "score" => FieldValue::from(self.quality.score),
            "long_functions" => FieldValue::List(
                self.quality
                    .long_functions
                    .iter()
                    .map(|n| FieldValue::from(n.as_str()))
                    .collect(),
            ),
            "deep_nesting" => FieldValue::List(
                self.quality
                    .deep_nesting
                    .iter()
                    .map(|n| FieldValue::from(n.as_str()))
                    .collect(),
            ),
            _ => FieldValue::Null,
        }
    }
}

impl Queryable for HotspotRecord {
    fn field(&self, name: &str) -> FieldValue {
        match name {
            "hotspot_score" => FieldValue::from(self.hotspot_score),
            _ => self.summary.field(name),
        }
    }
}
