//! Scanner tests

use super::*;
use crate::config::load_source_config_from_str;
use crate::error::Error;
use crate::types::{FileKind, TableMode};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use test_case::test_case;

const CONFIG: &str = r#"
[file.assets]
select_file_name_base = "YouTube_*_M_"
exclude_file_name_base = "summary"
regex_pattern = 'YouTube_(.+)_M_(\d{8})'
regex_group_names = ["content_owner", "file_date_key"]
storage_folder_name = "youtube_assets"

[file.claims]
select_file_name_base = "claim_raw"
regex_pattern = 'claim_raw_(\d{6})_(\w+)'
regex_group_names = ["file_date_key", "region"]
table_append_or_replace = "replace"

[file.disabled]
is_enabled = false
select_file_name_base = "YouTube"
"#;

fn touch(dir: &Path, name: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "a,b\n1,2\n").unwrap();
}

// ============================================================================
// Metadata
// ============================================================================

#[test_case("data_v1-1.csv", Some("v1-1") ; "major minor")]
#[test_case("data_v2.csv.gz", Some("v2") ; "major only")]
#[test_case("data.csv", None ; "no version")]
#[test_case("datav1.csv", None ; "no underscore")]
fn test_file_version(name: &str, expected: Option<&str>) {
    assert_eq!(file_version(name).as_deref(), expected);
}

#[test]
fn test_date_key_to_date() {
    assert_eq!(
        date_key_to_date("20230615").unwrap(),
        NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()
    );
    assert_eq!(
        date_key_to_date("202306").unwrap(),
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
    );
    assert!(date_key_to_date("2023061").is_err());
    assert!(date_key_to_date("20230230").is_err());
    assert!(date_key_to_date("18990101").is_err());
    assert!(date_key_to_date("2023ab").is_err());
}

#[test]
fn test_month_end() {
    let end = |y, m, d| month_end(NaiveDate::from_ymd_opt(y, m, d).unwrap());
    assert_eq!(end(2023, 6, 1), NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
    assert_eq!(end(2024, 2, 10), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert_eq!(end(2023, 12, 5), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
}

#[test]
fn test_versioned_folder_and_size() {
    assert_eq!(versioned_folder("caravan/claim_raw", Some("v1-1")), "caravan/claim_raw_v1-1");
    assert_eq!(versioned_folder("caravan/claim_raw", None), "caravan/claim_raw");
    assert_eq!(human_readable_size(512), "512.00 B");
    assert_eq!(human_readable_size(2_621_440), "2.50 MB");
}

// ============================================================================
// Scanning
// ============================================================================

#[test]
fn test_scan_matches_and_builds_metadata() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "YouTube_Brand_M_20230601_v1-1.csv.gz");
    touch(dir.path(), "nested/youtube_brand_m_20230701.csv");
    touch(dir.path(), "YouTube_Brand_M_summary.csv");
    touch(dir.path(), ".~lock.YouTube_Brand_M_20230601.csv#");
    touch(dir.path(), "notes.txt");

    let config = load_source_config_from_str(CONFIG).unwrap();
    let scanner = FileScanner::new(dir.path(), config);

    let groups = scanner.scan(Some(FileKind::CsvGz)).unwrap();
    let assets = groups.iter().find(|g| g.source_id == "assets").unwrap();
    assert_eq!(assets.files.len(), 1);

    let file = &assets.files[0];
    assert_eq!(file.file_name, "YouTube_Brand_M_20230601_v1-1.csv.gz");
    assert_eq!(file.kind, FileKind::CsvGz);
    assert_eq!(file.file_version.as_deref(), Some("v1-1"));
    assert_eq!(file.content_owner.as_deref(), Some("Brand"));
    assert_eq!(file.report_date_str().as_deref(), Some("2023-06-30"));
    assert_eq!(file.report_date_key(), Some(20_230_630));
    assert_eq!(file.storage_folder_name, "youtube_assets_v1-1");
    assert_eq!(file.table_name, "YouTube_*_M_");
    assert_eq!(
        file.destination_path("caravan-versioned"),
        "caravan-versioned/youtube_assets_v1-1/report_date=2023-06-30/YouTube_Brand_M_20230601_v1-1.csv.gz"
    );
}

#[test]
fn test_scan_is_case_insensitive_and_recursive() {
    let config = load_source_config_from_str(
        r#"
[file.brand]
select_file_name_base = "Brand_Report"
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "nested/deeper/BRAND_REPORT_2023.CSV");
    touch(dir.path(), "brand_report_2024.csv");

    let groups = FileScanner::new(dir.path(), config)
        .scan(Some(FileKind::Csv))
        .unwrap();
    let names: Vec<&str> = groups[0].files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["brand_report_2024.csv", "BRAND_REPORT_2023.CSV"]);
}

#[test]
fn test_scan_extra_groups_kept() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "claim_raw_202306_emea.csv");

    let config = load_source_config_from_str(CONFIG).unwrap();
    let scanner = FileScanner::new(dir.path(), config);
    let groups = scanner.scan(None).unwrap();
    let claims = groups.iter().find(|g| g.source_id == "claims").unwrap();

    assert_eq!(claims.table_mode, TableMode::Replace);
    let file = &claims.files[0];
    assert_eq!(file.extra.get("region").map(String::as_str), Some("emea"));
    assert_eq!(file.report_date_str().as_deref(), Some("2023-06-30"));
    assert_eq!(file.content_owner, None);
    assert_eq!(
        file.destination_path(""),
        "claim_raw/report_date=2023-06-30/claim_raw_202306_emea.csv"
    );
}

#[test]
fn test_scan_skips_disabled_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_source_config_from_str(CONFIG).unwrap();
    let groups = FileScanner::new(dir.path(), config).scan(None).unwrap();
    let ids: Vec<&str> = groups.iter().map(|g| g.source_id.as_str()).collect();
    assert_eq!(ids, vec!["assets", "claims"]);
}

#[test]
fn test_scan_name_not_matching_regex_is_error() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "claim_raw_latest.csv");

    let config = load_source_config_from_str(CONFIG).unwrap();
    let err = FileScanner::new(dir.path(), config).scan(None).unwrap_err();
    assert!(err.to_string().contains("does not match pattern"));
}

#[test]
fn test_scan_duplicate_match_is_error() {
    let config = load_source_config_from_str(
        r#"
[file.a]
select_file_name_base = "report"

[file.b]
select_file_name_base = "monthly"
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "monthly_report.csv");

    let err = FileScanner::new(dir.path(), config).scan(None).unwrap_err();
    assert!(matches!(err, Error::DuplicateFile { .. }));
}

#[test]
fn test_scan_missing_directory() {
    let config = load_source_config_from_str(CONFIG).unwrap();
    let err = FileScanner::new("/no/such/dir", config).scan(None).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[test]
fn test_find_files_kind_filter() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "report.csv");
    touch(dir.path(), "report.csv.gz");
    touch(dir.path(), "report.zip");

    let zips = find_files(dir.path(), "report", None, Some(FileKind::Zip)).unwrap();
    assert_eq!(zips.len(), 1);
    let all = find_files(dir.path(), "REPORT", None, None).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_find_files_skips_matching_directories() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "report.csv/inner.txt");
    touch(dir.path(), "exports/report_2023.csv");

    let found = find_files(dir.path(), "report", None, Some(FileKind::Csv)).unwrap();
    assert_eq!(found, vec![dir.path().join("exports/report_2023.csv")]);
}

#[test]
fn test_find_files_base_with_pattern_characters() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("drop[1]");
    touch(&base, "report_2023.csv");
    touch(&base, "nested/report_2024.csv");

    let found = find_files(&base, "report", None, Some(FileKind::Csv)).unwrap();
    assert_eq!(
        found,
        vec![base.join("nested/report_2024.csv"), base.join("report_2023.csv")]
    );
}
