//! Column name normalization
//!
//! Invalid characters are replaced one-for-one (runs are not collapsed), so
//! `"Revenue ($)"` becomes `revenue____`.

use std::collections::{HashMap, HashSet};

/// Placeholder for names that normalize to nothing
pub const EMPTY_COLUMN_NAME: &str = "column";

/// Normalize a single header name without any collision handling
pub fn normalize_column_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();

    let name: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        EMPTY_COLUMN_NAME.to_string()
    } else {
        name
    }
}

/// Normalize a header row into unique warehouse-safe names
///
/// The first occurrence of a name is kept as is; later occurrences get
/// `_1`, `_2`, ... in column order. If a suffixed candidate is already taken
/// by another column the suffix keeps counting up.
pub fn normalize_column_names<S: AsRef<str>>(raw_names: &[S]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::with_capacity(raw_names.len());
    let mut result = Vec::with_capacity(raw_names.len());

    for raw in raw_names {
        let base = normalize_column_name(raw.as_ref());
        let count = seen.entry(base.clone()).or_insert(0);

        let mut candidate = if *count == 0 {
            base.clone()
        } else {
            format!("{base}_{count}")
        };
        while used.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}_{count}");
        }
        *count += 1;

        used.insert(candidate.clone());
        result.push(candidate);
    }

    result
}
