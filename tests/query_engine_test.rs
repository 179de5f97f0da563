//! Integration tests for the unified query engine.

use repolens::query::{
    evaluate_query, CompareOptions, FieldValue, Queryable, Record, RegexCache,
};

fn records() -> Vec<Record> {
    // lines = [20, 60, 10, 80, 55], complexity = [3, 12, 2, 9, 15]
    let rows = [
        ("walk", 20usize, 3usize),
        ("resolve", 60, 12),
        ("tag", 10, 2),
        ("merge", 80, 9),
        ("index", 55, 15),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, &(name, lines, complexity))| {
            Record::new()
                .set("index", i)
                .set("name", name)
                .set("lines", lines)
                .set("complexity", complexity)
        })
        .collect()
}

fn names(result: &[Record]) -> Vec<String> {
    result.iter().map(|r| r.field("name").as_text()).collect()
}

#[test]
fn test_and_query_narrows_and_preserves_order() {
    let mut cache = RegexCache::new();
    let result = evaluate_query(
        &records(),
        "lines>50&complexity>10",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();

    assert_eq!(result.total_matches, 2);
    assert_eq!(names(&result.items), vec!["resolve", "index"]);
}

#[test]
fn test_sort_desc_limit_over_tied_values() {
    // complexity = [1, 9, 9, 3, 7]
    let rows: Vec<Record> = [1usize, 9, 9, 3, 7]
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Record::new()
                .set("name", format!("r{}", i))
                .set("complexity", c)
        })
        .collect();

    let mut cache = RegexCache::new();
    let result = evaluate_query(
        &rows,
        "",
        Some("-complexity"),
        Some(3),
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();

    // The two complexity-9 records in original relative order, then the 7.
    assert_eq!(names(&result.items), vec!["r1", "r2", "r4"]);
    assert_eq!(result.total_matches, 5);
    assert!(result.truncated);
}

#[test]
fn test_pagination_bookkeeping() {
    let mut cache = RegexCache::new();
    let result = evaluate_query(
        &records(),
        "lines>=10",
        Some("lines"),
        Some(2),
        3,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();

    // M=5, O=3, N=2 -> displayed = min(2, 5-3) = 2
    assert_eq!(result.total_matches, 5);
    assert_eq!(result.displayed_results, 2);
    // Sorted lines: 10,20,55,60,80; offset 3 -> 60,80
    let lines: Vec<f64> = result
        .items
        .iter()
        .map(|r| r.field("lines").as_num().unwrap())
        .collect();
    assert_eq!(lines, vec![60.0, 80.0]);
}

#[test]
fn test_regex_and_range_filters() {
    let mut cache = RegexCache::new();

    let regex = evaluate_query(
        &records(),
        "name~=^re",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();
    assert_eq!(names(&regex.items), vec!["resolve"]);

    let range = evaluate_query(
        &records(),
        "lines=20..60",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();
    assert_eq!(names(&range.items), vec!["walk", "resolve", "index"]);
}

#[test]
fn test_invalid_regex_matches_nothing_but_query_survives() {
    let mut cache = RegexCache::new();
    let result = evaluate_query(
        &records(),
        "name~=(unclosed",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();
    assert_eq!(result.total_matches, 0);
}

#[test]
fn test_malformed_term_rejects_whole_query() {
    let mut cache = RegexCache::new();
    let err = evaluate_query(
        &records(),
        "lines>50&complexity",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    );
    assert!(err.is_err());
}

#[test]
fn test_structural_elements_are_queryable() {
    repolens::init();

    let source = r#"
def tiny():
    pass

def busy(xs):
    out = []
    for x in xs:
        if x:
            if x > 10:
                out.append(x)
    return out
"#;
    let extraction = repolens::extract("mod.py", source.as_bytes(), "python");
    let mut cache = RegexCache::new();
    let result = evaluate_query(
        &extraction.elements,
        "complexity>2&kind=function",
        Some("-complexity"),
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();

    assert_eq!(result.total_matches, 1);
    assert_eq!(result.items[0].name, "busy");
}

#[test]
fn test_null_field_per_call_site_divergence() {
    let rows = vec![Record::new().set("name", "only-name")];
    let mut cache = RegexCache::new();

    // Domain A: != against null is false.
    let strict = evaluate_query(
        &rows,
        "owner!=bob",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();
    assert_eq!(strict.total_matches, 0);

    // Domain B: != against null is true.
    let lenient_options = CompareOptions {
        null_not_equal: true,
        ..Default::default()
    };
    let lenient = evaluate_query(
        &rows,
        "owner!=bob",
        None,
        None,
        0,
        &lenient_options,
        &mut cache,
    )
    .unwrap();
    assert_eq!(lenient.total_matches, 1);
}

#[test]
fn test_list_matching_on_decorators() {
    repolens::init();

    let source = r#"
@cached
@retry(3)
def fetch():
    pass

def plain():
    pass
"#;
    let extraction = repolens::extract("mod.py", source.as_bytes(), "python");
    let mut cache = RegexCache::new();

    let any_element = CompareOptions {
        match_list_elements: true,
        ..Default::default()
    };
    let result = evaluate_query(
        &extraction.elements,
        "decorators=cached",
        None,
        None,
        0,
        &any_element,
        &mut cache,
    )
    .unwrap();
    assert_eq!(result.total_matches, 1);
    assert_eq!(result.items[0].name, "fetch");

    // Off by default: the same query matches nothing.
    let off = evaluate_query(
        &extraction.elements,
        "decorators=cached",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();
    assert_eq!(off.total_matches, 0);
}

#[test]
fn test_numeric_strings_compare_numerically() {
    let rows = vec![
        Record::new().set("version", "9"),
        Record::new().set("version", "10"),
    ];
    let mut cache = RegexCache::new();
    let result = evaluate_query(
        &rows,
        "version>9",
        None,
        None,
        0,
        &CompareOptions::default(),
        &mut cache,
    )
    .unwrap();
    // Lexicographic comparison would also admit "9" > "9" = false but
    // reject "10" > "9"; numeric coercion admits only "10".
    assert_eq!(result.total_matches, 1);
    assert_eq!(result.items[0].field("version"), FieldValue::Str("10".into()));
}
