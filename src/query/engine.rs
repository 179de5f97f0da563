//! Filter/sort/paginate evaluation over record sequences.

use std::cmp::Ordering;

use serde::Serialize;

use super::filter::{compare_values, CompareOptions, Filter, RegexCache};
use super::value::{FieldValue, Queryable};
use super::QueryError;

/// Sort order for one field. `-field` reverses the comparison direction
/// only; ties keep their pre-sort relative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    /// Parse "field" or "-field".
    pub fn parse(spec: &str) -> Result<Self, QueryError> {
        let (descending, field) = match spec.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        if field.is_empty() {
            return Err(QueryError::InvalidSort(spec.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

/// Evaluation result plus the pagination bookkeeping adapters render.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope<T> {
    /// Post-filter, pre-limit count.
    pub total_matches: usize,
    pub displayed_results: usize,
    pub truncated: bool,
    pub items: Vec<T>,
}

/// Evaluate filters, sort, offset, and limit over a record sequence.
///
/// Filters AND-combine. Sorting is stable; offset applies before limit and
/// both apply strictly after the sort.
pub fn evaluate<T: Queryable + Clone>(
    records: &[T],
    filters: &[Filter],
    sort: Option<&SortSpec>,
    limit: Option<usize>,
    offset: usize,
    options: &CompareOptions,
    cache: &mut RegexCache,
) -> ResultEnvelope<T> {
    let mut matched: Vec<T> = records
        .iter()
        .filter(|r| {
            filters
                .iter()
                .all(|f| compare_values(&r.field(&f.field), f.op, &f.value, options, cache))
        })
        .cloned()
        .collect();

    let total_matches = matched.len();

    if let Some(sort) = sort {
        matched.sort_by(|a, b| {
            let ordering = compare_for_sort(&a.field(&sort.field), &b.field(&sort.field));
            if sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let items: Vec<T> = matched
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    let displayed_results = items.len();

    ResultEnvelope {
        total_matches,
        displayed_results,
        truncated: displayed_results < total_matches,
        items,
    }
}

/// Parse-and-evaluate convenience for `&`-joined query strings.
///
/// A malformed term rejects the whole query before anything is applied.
pub fn evaluate_query<T: Queryable + Clone>(
    records: &[T],
    query: &str,
    sort: Option<&str>,
    limit: Option<usize>,
    offset: usize,
    options: &CompareOptions,
    cache: &mut RegexCache,
) -> Result<ResultEnvelope<T>, QueryError> {
    let filters = Filter::parse_query(query)?;
    let sort = sort.map(SortSpec::parse).transpose()?;
    Ok(evaluate(
        records,
        &filters,
        sort.as_ref(),
        limit,
        offset,
        options,
        cache,
    ))
}

/// Sort comparison: numeric when both sides are numeric, text otherwise.
/// Null sorts before any value.
fn compare_for_sort(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.as_text().cmp(&b.as_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::value::Record;

    fn fixture() -> Vec<Record> {
        // lines = [20, 60, 10, 80, 55], complexity = [3, 12, 2, 9, 15]
        [(20usize, 3usize), (60, 12), (10, 2), (80, 9), (55, 15)]
            .iter()
            .enumerate()
            .map(|(i, &(lines, complexity))| {
                Record::new()
                    .set("index", i)
                    .set("lines", lines)
                    .set("complexity", complexity)
            })
            .collect()
    }

    fn eval(
        records: &[Record],
        query: &str,
        sort: Option<&str>,
        limit: Option<usize>,
        offset: usize,
    ) -> ResultEnvelope<Record> {
        evaluate_query(
            records,
            query,
            sort,
            limit,
            offset,
            &CompareOptions::default(),
            &mut RegexCache::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_and_combination_preserves_order() {
        let records = fixture();
        let result = eval(&records, "lines>50&complexity>10", None, None, 0);

        // Only indices 1 (60/12) and 4 (55/15) satisfy both terms, in
        // their original relative order.
        assert_eq!(result.total_matches, 2);
        let indices: Vec<f64> = result
            .items
            .iter()
            .map(|r| r.field("index").as_num().unwrap())
            .collect();
        assert_eq!(indices, vec![1.0, 4.0]);
    }

    #[test]
    fn test_sort_descending_is_stable() {
        // complexity = [1, 9, 9, 3, 7]; the two 9s keep original order.
        let records: Vec<Record> = [1usize, 9, 9, 3, 7]
            .iter()
            .enumerate()
            .map(|(i, &c)| Record::new().set("index", i).set("complexity", c))
            .collect();

        let result = eval(&records, "", Some("-complexity"), Some(3), 0);
        let pairs: Vec<(f64, f64)> = result
            .items
            .iter()
            .map(|r| {
                (
                    r.field("complexity").as_num().unwrap(),
                    r.field("index").as_num().unwrap(),
                )
            })
            .collect();
        assert_eq!(pairs, vec![(9.0, 1.0), (9.0, 2.0), (7.0, 4.0)]);
    }

    #[test]
    fn test_limit_offset_arithmetic() {
        let records = fixture();
        // M = 5 matches; check displayed == max(0, min(N, M - O))
        for (limit, offset, expected) in
            [(2usize, 0usize, 2usize), (10, 0, 5), (2, 4, 1), (3, 5, 0), (3, 9, 0)]
        {
            let result = eval(&records, "lines>0", None, Some(limit), offset);
            assert_eq!(result.total_matches, 5);
            assert_eq!(result.displayed_results, expected, "limit={limit} offset={offset}");
            assert_eq!(result.truncated, expected < 5);
        }
    }

    #[test]
    fn test_offset_applies_before_limit() {
        let records = fixture();
        let result = eval(&records, "lines>0", Some("lines"), Some(2), 1);
        // Sorted lines: 10, 20, 55, 60, 80; skip 1, take 2.
        let lines: Vec<f64> = result
            .items
            .iter()
            .map(|r| r.field("lines").as_num().unwrap())
            .collect();
        assert_eq!(lines, vec![20.0, 55.0]);
    }

    #[test]
    fn test_malformed_query_rejected_whole() {
        let records = fixture();
        let err = evaluate_query(
            &records,
            "lines>50&&&bogus~",
            None,
            None,
            0,
            &CompareOptions::default(),
            &mut RegexCache::new(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let records = fixture();
        let result = eval(&records, "", None, None, 0);
        assert_eq!(result.total_matches, 5);
        assert!(!result.truncated);
    }

    #[test]
    fn test_sort_spec_parse() {
        let spec = SortSpec::parse("-complexity").unwrap();
        assert!(spec.descending);
        assert_eq!(spec.field, "complexity");
        assert!(SortSpec::parse("-").is_err());
    }
}
