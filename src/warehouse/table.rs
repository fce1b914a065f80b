//! External table definitions

use super::folders::{StorageFolder, PARTITION_SEGMENT};
use crate::schema::{InferredField, InferredSchema};
use crate::storage::StorageBucket;
use serde::Serialize;
use std::fmt::Write;

/// External table over CSV objects in the bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalTableSpec {
    /// Table name within the dataset
    pub table_name: String,
    /// Source URIs, a single trailing wildcard each
    pub source_uris: Vec<String>,
    /// Hive partition prefix for partitioned folders
    pub hive_prefix: Option<String>,
    /// Leading rows to skip (header plus optional title row)
    pub skip_rows: u32,
    /// Explicit columns; `None` means autodetect
    pub fields: Option<Vec<InferredField>>,
}

impl ExternalTableSpec {
    /// Build the table for a storage folder, using the inferred schema when present
    pub fn for_folder(
        bucket: &StorageBucket,
        folder: &StorageFolder,
        schema: Option<&InferredSchema>,
    ) -> Self {
        let folder_uri = bucket.uri(&folder.storage_folder_name);
        let (source_uris, hive_prefix) = if folder.has_partitioning {
            (vec![format!("{folder_uri}/*")], Some(folder_uri))
        } else {
            (vec![format!("{folder_uri}/*.csv.gz")], None)
        };

        Self {
            table_name: folder.proposed_table_name.clone(),
            source_uris,
            hive_prefix,
            skip_rows: schema.map_or(1, InferredSchema::skip_leading_rows),
            fields: schema.map(|s| s.fields.clone()),
        }
    }

    /// Whether the warehouse detects columns itself
    pub fn is_autodetect(&self) -> bool {
        self.fields.is_none()
    }

    /// Glob matching every object of this table, with partition folders spelled out
    pub fn object_glob(&self) -> Vec<String> {
        match &self.hive_prefix {
            Some(prefix) => vec![format!("{prefix}/{PARTITION_SEGMENT}*/*.csv.gz")],
            None => self.source_uris.clone(),
        }
    }

    /// Render `CREATE OR REPLACE EXTERNAL TABLE` DDL
    pub fn to_bigquery_ddl(&self, project: &str, dataset: &str) -> String {
        let mut ddl = format!(
            "CREATE OR REPLACE EXTERNAL TABLE `{project}.{dataset}.{}`",
            self.table_name
        );

        if let Some(fields) = &self.fields {
            ddl.push_str(" (\n");
            let columns: Vec<String> = fields
                .iter()
                .map(|f| format!("  `{}` {}", f.name, f.field_type))
                .collect();
            ddl.push_str(&columns.join(",\n"));
            ddl.push_str("\n)");
        }

        if self.hive_prefix.is_some() {
            ddl.push_str("\nWITH PARTITION COLUMNS");
        }

        let uris: Vec<String> = self.source_uris.iter().map(|u| quote(u)).collect();
        ddl.push_str("\nOPTIONS (\n  format = 'CSV',\n  compression = 'GZIP',\n");
        let _ = writeln!(ddl, "  skip_leading_rows = {},", self.skip_rows);
        let _ = write!(ddl, "  uris = [{}]", uris.join(", "));
        if let Some(prefix) = &self.hive_prefix {
            let _ = write!(
                ddl,
                ",\n  hive_partition_uri_prefix = {},\n  require_hive_partition_filter = false",
                quote(prefix)
            );
        }
        ddl.push_str("\n);");
        ddl
    }
}

/// Single-quoted SQL string literal
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
