//! Schema inference tests

use super::*;
use crate::error::{Error, Result};
use crate::storage::ObjectSource;
use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use test_case::test_case;

fn values(items: &[&str]) -> Vec<Option<String>> {
    items.iter().map(|s| Some((*s).to_string())).collect()
}

fn repeat(items: &[&str], times: usize) -> Vec<Option<String>> {
    let mut out = Vec::new();
    for _ in 0..times {
        out.extend(values(items));
    }
    out
}

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// In-memory object source keyed by location
#[derive(Default)]
struct MemorySource {
    objects: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    fn with(mut self, location: &str, data: Vec<u8>) -> Self {
        self.objects.insert(location.to_string(), data);
        self
    }
}

impl ObjectSource for MemorySource {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        let data = self
            .objects
            .get(location)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound {
                path: location.to_string(),
            })?;
        Ok(Box::new(Cursor::new(data)))
    }
}

// ============================================================================
// Column Normalizer
// ============================================================================

#[test]
fn test_normalize_basic_names() {
    let names = normalize_column_names(&["Asset ID", "Views", "Is Partner", "Report Date"]);
    assert_eq!(names, vec!["asset_id", "views", "is_partner", "report_date"]);
}

#[test]
fn test_normalize_duplicates_are_suffixed_in_order() {
    let names = normalize_column_names(&["Asset ID", "id", "ID"]);
    assert_eq!(names, vec!["asset_id", "id", "id_1"]);

    let names = normalize_column_names(&["id", "id", "id", "id"]);
    assert_eq!(names, vec!["id", "id_1", "id_2", "id_3"]);
}

#[test]
fn test_normalize_suffix_collision_stays_unique() {
    let names = normalize_column_names(&["id", "id_1", "id"]);
    assert_eq!(names, vec!["id", "id_1", "id_2"]);

    let names = normalize_column_names(&["id", "id", "id_1"]);
    assert_eq!(names, vec!["id", "id_1", "id_1_1"]);
}

#[test]
fn test_normalize_replaces_invalid_chars_one_for_one() {
    assert_eq!(normalize_column_name("Revenue ($)"), "revenue____");
    assert_eq!(normalize_column_name("a-b.c"), "a_b_c");
    assert_eq!(normalize_column_name("Café"), "caf_");
}

#[test]
fn test_normalize_empty_names_get_placeholder() {
    let names = normalize_column_names(&["", "   ", "\u{feff}"]);
    assert_eq!(names, vec!["column", "column_1", "column_2"]);
}

#[test]
fn test_normalize_strips_bom_and_whitespace() {
    assert_eq!(normalize_column_name("\u{feff}Asset ID "), "asset_id");
}

#[test]
fn test_normalize_output_is_safe_and_distinct() {
    let raw = ["A", "a", "A ", "!", "?", "a_1", "", "Ünïcode", "a"];
    let names = normalize_column_names(&raw);

    assert_eq!(names.len(), raw.len());
    let unique: std::collections::HashSet<_> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
    for name in &names {
        assert!(!name.is_empty());
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }
}

// ============================================================================
// Type Classifier
// ============================================================================

#[test_case("0", true ; "zero")]
#[test_case("123", true ; "plain")]
#[test_case("-42", true ; "negative")]
#[test_case("9223372036854775807", true ; "i64 max")]
#[test_case("-9223372036854775808", true ; "i64 min")]
#[test_case("9223372036854775808", false ; "overflow")]
#[test_case("00123", false ; "leading zero")]
#[test_case("-0", false ; "negative zero")]
#[test_case("+5", false ; "explicit plus")]
#[test_case("1.0", false ; "decimal")]
#[test_case("", false ; "empty")]
#[test_case("-", false ; "sign only")]
fn test_is_int64(value: &str, expected: bool) {
    assert_eq!(is_int64(value), expected);
}

#[test_case("19.99", true ; "decimal")]
#[test_case(".5", true ; "leading dot")]
#[test_case("5.", true ; "trailing dot")]
#[test_case("-1.5e10", true ; "scientific")]
#[test_case("1E-3", true ; "upper exponent")]
#[test_case("00123", true ; "leading zero numeral")]
#[test_case("123", false ; "integer excluded")]
#[test_case("1.2.3", false ; "two dots")]
#[test_case(".", false ; "dot only")]
#[test_case("e5", false ; "exponent only")]
#[test_case("1,000", false ; "thousands separator")]
fn test_is_decimal(value: &str, expected: bool) {
    assert_eq!(is_decimal(value), expected);
}

#[test]
fn test_date_and_timestamp_grammars() {
    assert!(is_date("2023-06-30"));
    assert!(is_date("2023/07/01"));
    assert!(!is_date("2023-02-30"));
    assert!(!is_date("2023-6-30"));
    assert!(!is_date("2023-06-30 12:00:00"));

    assert!(is_timestamp("2023-06-30 12:00:00"));
    assert!(is_timestamp("2023/06/30 23:59:59.123456"));
    assert!(!is_timestamp("2023-06-30T12:00:00"));
    assert!(!is_timestamp("2023-06-30 25:00:00"));
    assert!(!is_timestamp("2023-06-30"));
}

#[test_case("2023-06/30" ; "dash then slash")]
#[test_case("2023/06-30" ; "slash then dash")]
#[test_case("2023/06-30 12:00:00" ; "mixed timestamp")]
#[test_case("2023-06/30 12:00:00" ; "mixed timestamp reversed")]
fn test_mixed_date_separators_rejected(value: &str) {
    assert!(!is_date(value));
    assert!(!is_timestamp(value));
}

#[test]
fn test_mixed_separator_column_is_string() {
    let column = repeat(&["2023-06/30", "2023/07-01"], 6);
    assert_eq!(classify(&column), PrimitiveType::String);
}

#[test]
fn test_null_markers() {
    assert!(is_null_marker(""));
    assert!(is_null_marker("  "));
    assert!(is_null_marker("NULL"));
    assert!(is_null_marker("None"));
    assert!(!is_null_marker("nil"));
    assert!(!is_null_marker("0"));
}

#[test]
fn test_classify_int64() {
    let column = repeat(&["100", "200", "300"], 4);
    assert_eq!(classify(&column), PrimitiveType::Int64);
}

#[test]
fn test_classify_leading_zeros_not_int64() {
    let column = repeat(&["00123", "00456"], 6);
    let ty = classify(&column);
    assert_ne!(ty, PrimitiveType::Int64);
    assert_eq!(ty, PrimitiveType::BigNumeric);
}

#[test]
fn test_classify_mixed_integer_and_decimal() {
    let column = repeat(&["100", "200.50", "300"], 4);
    assert_eq!(classify(&column), PrimitiveType::BigNumeric);
}

#[test]
fn test_classify_pure_decimal() {
    let column = repeat(&["1.5", "2.25", "1e3"], 4);
    assert_eq!(classify(&column), PrimitiveType::BigNumeric);
}

#[test]
fn test_classify_bool() {
    let column = repeat(&["true", "FALSE", "Yes", "no"], 3);
    assert_eq!(classify(&column), PrimitiveType::Bool);
}

#[test]
fn test_classify_zero_one_is_int64_not_bool() {
    let column = repeat(&["0", "1"], 6);
    assert_eq!(classify(&column), PrimitiveType::Int64);
}

#[test]
fn test_classify_dates_and_timestamps() {
    let dates = repeat(&["2023-06-30", "2023/07/01"], 6);
    assert_eq!(classify(&dates), PrimitiveType::Date);

    let timestamps = repeat(&["2023-06-30 12:00:00", "2023/07/01 12:00:00"], 6);
    assert_eq!(classify(&timestamps), PrimitiveType::Timestamp);
}

#[test]
fn test_classify_insufficient_values_is_string() {
    let column = repeat(&["1", "2", "3"], 3);
    assert_eq!(column.len(), 9);
    assert_eq!(classify(&column), PrimitiveType::String);
}

#[test]
fn test_classify_nulls_do_not_count_toward_minimum() {
    let mut column = repeat(&["1", "2", "3"], 3);
    column.extend(values(&["", "null", "NONE"]));
    column.push(None);
    assert_eq!(classify(&column), PrimitiveType::String);

    column.push(Some("4".to_string()));
    assert_eq!(classify(&column), PrimitiveType::Int64);
}

#[test]
fn test_classify_below_threshold_is_string() {
    // 18 of 20 integers = 90%
    let mut column = repeat(&["1", "2"], 9);
    column.extend(values(&["abc", "def"]));
    assert_eq!(classify(&column), PrimitiveType::String);
}

#[test]
fn test_classify_at_threshold_is_accepted() {
    // 19 of 20 integers = 95%
    let mut column = repeat(&["7"], 19);
    column.extend(values(&["n/a"]));
    assert_eq!(classify(&column), PrimitiveType::Int64);
}

#[test]
fn test_classify_trims_values() {
    let column = repeat(&[" 10 ", "20\t"], 5);
    assert_eq!(classify(&column), PrimitiveType::Int64);
}

#[test]
fn test_classify_overflow_falls_to_bignumeric() {
    let column = repeat(&["99999999999999999999", "123"], 5);
    assert_eq!(classify(&column), PrimitiveType::BigNumeric);
}

#[test]
fn test_classifier_custom_thresholds() {
    let classifier = TypeClassifier::new()
        .with_min_non_null(2)
        .with_confidence(0.5);
    let column = values(&["1", "2", "x"]);
    assert_eq!(classifier.classify(&column), PrimitiveType::Int64);
}

#[test]
fn test_classify_mixed_text_is_string() {
    let column = repeat(&["alpha", "12", "2023-01-01", "true"], 3);
    assert_eq!(classify(&column), PrimitiveType::String);
}

// ============================================================================
// Row Sampler
// ============================================================================

#[test]
fn test_sample_reads_header_and_rows() {
    let data = "a,b\n1,2\n3,4\n";
    let sampled = sample_rows(data.as_bytes(), false, 100).unwrap();
    assert_eq!(sampled.header, vec!["a", "b"]);
    assert_eq!(sampled.rows.len(), 2);
    assert_eq!(sampled.rows[1], vec![Some("3".to_string()), Some("4".to_string())]);
    assert!(!sampled.has_title_row);
}

#[test]
fn test_sample_stops_at_max_rows() {
    let mut data = String::from("n\n");
    for i in 0..500 {
        data.push_str(&format!("{i}\n"));
    }
    let sampled = sample_rows(data.as_bytes(), false, 25).unwrap();
    assert_eq!(sampled.rows.len(), 25);
    assert_eq!(sampled.rows[24], vec![Some("24".to_string())]);
}

#[test]
fn test_sample_pads_and_truncates_ragged_rows() {
    let data = "a,b,c\n1\n1,2,3,4,5\n";
    let sampled = sample_rows(data.as_bytes(), false, 100).unwrap();
    assert_eq!(sampled.rows[0], vec![Some("1".to_string()), None, None]);
    assert_eq!(
        sampled.rows[1],
        vec![
            Some("1".to_string()),
            Some("2".to_string()),
            Some("3".to_string())
        ]
    );
}

#[test]
fn test_sample_empty_input() {
    let sampled = sample_rows(&b""[..], false, 100).unwrap();
    assert!(sampled.header.is_empty());
    assert!(sampled.rows.is_empty());
}

#[test]
fn test_sample_header_only() {
    let sampled = sample_rows(&b"a,b,c\n"[..], false, 100).unwrap();
    assert_eq!(sampled.header.len(), 3);
    assert!(sampled.rows.is_empty());
}

#[test]
fn test_sample_gzip() {
    let compressed = gzip("a,b\n1,x\n2,y\n");
    let sampled = sample_rows(Cursor::new(compressed), true, 100).unwrap();
    assert_eq!(sampled.header, vec!["a", "b"]);
    assert_eq!(sampled.rows.len(), 2);
}

#[test]
fn test_sample_corrupt_gzip_is_decompression_error() {
    let garbage = b"this is definitely not a gzip stream".to_vec();
    let err = sample_rows(Cursor::new(garbage), true, 100).unwrap_err();
    assert!(matches!(err, SampleError::Decompression(_)));
}

#[test]
fn test_sample_detects_title_row() {
    let data = "Monthly Asset Report\nasset_id,views\n1,2\n";
    let sampled = sample_rows(data.as_bytes(), false, 100).unwrap();
    assert!(sampled.has_title_row);
    assert_eq!(sampled.header, vec!["asset_id", "views"]);
    assert_eq!(sampled.rows.len(), 1);
}

#[test]
fn test_sample_single_column_file_is_not_title() {
    let data = "id\n1\n2\n";
    let sampled = sample_rows(data.as_bytes(), false, 100).unwrap();
    assert!(!sampled.has_title_row);
    assert_eq!(sampled.header, vec!["id"]);
    assert_eq!(sampled.rows.len(), 2);
}

#[test]
fn test_sample_title_detection_disabled() {
    let data = "Title\na,b\n1,2\n";
    let sampled = RowSampler::new()
        .with_title_row_detection(false)
        .sample(data.as_bytes(), false)
        .unwrap();
    assert!(!sampled.has_title_row);
    assert_eq!(sampled.header, vec!["Title"]);
    assert_eq!(sampled.rows.len(), 2);
}

#[test]
fn test_sample_quoted_fields() {
    let data = "name,amount\n\"Smith, John\",\"1,000\"\n";
    let sampled = sample_rows(data.as_bytes(), false, 100).unwrap();
    assert_eq!(sampled.rows[0][0].as_deref(), Some("Smith, John"));
    assert_eq!(sampled.rows[0][1].as_deref(), Some("1,000"));
}

// ============================================================================
// Schema Inference Engine
// ============================================================================

fn report_csv(rows: usize) -> String {
    let mut data = String::from("asset_id, Views, Revenue, Is Partner, Report Date\n");
    for _ in 0..rows {
        data.push_str("123,1500,19.99,true,2023-06-30\n");
    }
    data
}

#[test]
fn test_infer_end_to_end() {
    let source = MemorySource::default().with("reports/a.csv.gz", gzip(&report_csv(12)));
    let schema = infer_schema(&source, "reports/a.csv.gz").unwrap();

    assert_eq!(
        schema.fields,
        vec![
            InferredField::new("asset_id", PrimitiveType::Int64),
            InferredField::new("views", PrimitiveType::Int64),
            InferredField::new("revenue", PrimitiveType::BigNumeric),
            InferredField::new("is_partner", PrimitiveType::Bool),
            InferredField::new("report_date", PrimitiveType::Date),
        ]
    );
    assert!(schema.fields.iter().all(|f| f.nullable));
    assert_eq!(schema.sampled_rows, 12);
    assert_eq!(schema.skip_leading_rows(), 1);
}

#[test]
fn test_infer_uncompressed_location() {
    let source = MemorySource::default().with("a.csv", report_csv(10).into_bytes());
    let schema = infer_schema(&source, "a.csv").unwrap();
    assert_eq!(schema.fields[0].field_type, PrimitiveType::Int64);
}

#[test]
fn test_infer_header_only_is_all_string() {
    let source = MemorySource::default().with("a.csv", b"A,B,b\n".to_vec());
    let schema = infer_schema(&source, "a.csv").unwrap();
    assert_eq!(
        schema.fields,
        vec![
            InferredField::new("a", PrimitiveType::String),
            InferredField::new("b", PrimitiveType::String),
            InferredField::new("b_1", PrimitiveType::String),
        ]
    );
    assert_eq!(schema.sampled_rows, 0);
}

#[test]
fn test_infer_missing_object_returns_none() {
    let source = MemorySource::default();
    assert!(infer_schema(&source, "missing.csv.gz").is_none());
}

#[test]
fn test_infer_corrupt_gzip_returns_none() {
    let source = MemorySource::default().with("bad.csv.gz", b"not gzip".to_vec());
    assert!(infer_schema(&source, "bad.csv.gz").is_none());
}

#[test]
fn test_infer_empty_file_returns_none() {
    let source = MemorySource::default().with("empty.csv", Vec::new());
    assert!(infer_schema(&source, "empty.csv").is_none());
}

#[test]
fn test_infer_small_sample_is_string() {
    let source = MemorySource::default().with("a.csv", report_csv(5).into_bytes());
    let schema = infer_schema(&source, "a.csv").unwrap();
    assert!(schema
        .fields
        .iter()
        .all(|f| f.field_type == PrimitiveType::String));
}

#[test]
fn test_infer_ragged_rows_keep_field_count() {
    let mut data = String::from("a,b,c\n");
    for i in 0..12 {
        data.push_str(&format!("{i},{i}\n"));
    }
    let source = MemorySource::default().with("a.csv", data.into_bytes());
    let schema = infer_schema(&source, "a.csv").unwrap();
    assert_eq!(schema.fields.len(), 3);
    assert_eq!(schema.fields[0].field_type, PrimitiveType::Int64);
    assert_eq!(schema.fields[2].field_type, PrimitiveType::String);
}

#[test]
fn test_infer_with_title_row() {
    let mut data = String::from("Asset Report June 2023\n");
    data.push_str(&report_csv(10));
    let source = MemorySource::default().with("a.csv", data.into_bytes());
    let schema = infer_schema(&source, "a.csv").unwrap();
    assert!(schema.has_title_row);
    assert_eq!(schema.skip_leading_rows(), 2);
    assert_eq!(schema.fields.len(), 5);
    assert_eq!(schema.fields[0].name, "asset_id");
}

#[test]
fn test_infer_sample_size_limits_rows() {
    let source = MemorySource::default().with("a.csv", report_csv(300).into_bytes());
    let schema = SchemaInferrer::new()
        .with_sample_size(50)
        .infer_schema(&source, "a.csv")
        .unwrap();
    assert_eq!(schema.sampled_rows, 50);
}

#[test]
fn test_type_distribution() {
    let source = MemorySource::default().with("a.csv", report_csv(10).into_bytes());
    let schema = infer_schema(&source, "a.csv").unwrap();
    let dist = schema.type_distribution();
    assert_eq!(dist.get(&PrimitiveType::Int64), Some(&2));
    assert_eq!(dist.get(&PrimitiveType::Date), Some(&1));
    assert_eq!(dist.get(&PrimitiveType::String), None);
}

#[test]
fn test_primitive_type_names_are_verbatim() {
    let names: Vec<String> = [
        PrimitiveType::Int64,
        PrimitiveType::Bool,
        PrimitiveType::BigNumeric,
        PrimitiveType::Timestamp,
        PrimitiveType::Date,
        PrimitiveType::String,
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    assert_eq!(
        names,
        vec!["INT64", "BOOL", "BIGNUMERIC", "TIMESTAMP", "DATE", "STRING"]
    );

    let json = serde_json::to_string(&InferredField::new("x", PrimitiveType::BigNumeric)).unwrap();
    assert_eq!(json, r#"{"name":"x","type":"BIGNUMERIC","nullable":true}"#);
}
