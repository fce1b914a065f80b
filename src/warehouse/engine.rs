//! DuckDB-backed warehouse
//!
//! External tables become views over `read_csv(...)`. A registry table in
//! the dataset schema remembers how each view was defined.

use super::folders::partition_columns;
use super::table::{quote, ExternalTableSpec};
use super::{TableInfo, Warehouse};
use crate::error::{Error, Result};
use crate::schema::PrimitiveType;
use duckdb::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

/// Registry of created external tables
const REGISTRY_TABLE: &str = "_datawagon_tables";

/// Values read as NULL, matching the inference null markers
const NULL_STRINGS: &[&str] = &["", "null", "NULL", "Null", "none", "None", "NONE"];

/// DuckDB column type for a warehouse type
///
/// DuckDB decimals top out at 38 digits, so BIGNUMERIC becomes
/// `DECIMAL(38, 9)`: 29 integer digits and 9 fractional digits. Longer
/// fractions are rounded on read and larger magnitudes (`1e40`) fail the
/// query. BigQuery DDL keeps the full `BIGNUMERIC` range.
pub fn duckdb_type(field_type: PrimitiveType) -> &'static str {
    match field_type {
        PrimitiveType::Int64 => "BIGINT",
        PrimitiveType::Bool => "BOOLEAN",
        PrimitiveType::BigNumeric => "DECIMAL(38, 9)",
        PrimitiveType::Timestamp => "TIMESTAMP",
        PrimitiveType::Date => "DATE",
        PrimitiveType::String => "VARCHAR",
    }
}

/// Double-quoted SQL identifier
fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Warehouse using a DuckDB database file or in-memory database
pub struct DuckDbWarehouse {
    conn: Connection,
    dataset: String,
}

impl DuckDbWarehouse {
    /// Open an in-memory warehouse
    pub fn open_in_memory(dataset: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::warehouse(format!("Failed to create DuckDB connection: {e}")))?;
        Self::init(conn, dataset)
    }

    /// Open or create a warehouse database file
    pub fn open(path: impl AsRef<Path>, dataset: &str) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::warehouse(format!("Failed to open DuckDB at {}: {e}", path.display()))
        })?;
        Self::init(conn, dataset)
    }

    fn init(conn: Connection, dataset: &str) -> Result<Self> {
        if dataset.trim().is_empty() {
            return Err(Error::missing_field("bq_dataset"));
        }
        let warehouse = Self {
            conn,
            dataset: dataset.to_string(),
        };

        warehouse
            .conn
            .execute_batch(&format!(
                "CREATE SCHEMA IF NOT EXISTS {schema};
                 CREATE TABLE IF NOT EXISTS {registry} (
                     table_name VARCHAR PRIMARY KEY,
                     source_uris VARCHAR NOT NULL,
                     skip_rows BIGINT NOT NULL,
                     autodetect BOOLEAN NOT NULL
                 );",
                schema = ident(&warehouse.dataset),
                registry = warehouse.registry(),
            ))
            .map_err(|e| Error::warehouse(format!("Failed to initialize warehouse: {e}")))?;

        Ok(warehouse)
    }

    /// Configure cloud storage credentials (S3, R2, GCS)
    pub fn configure_cloud_storage(&self) -> Result<()> {
        self.conn
            .execute_batch("INSTALL httpfs; LOAD httpfs;")
            .map_err(|e| Error::warehouse(format!("Failed to load httpfs extension: {e}")))?;

        if let (Ok(key_id), Ok(secret)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            let region =
                std::env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| "us-east-1".to_string());
            self.conn
                .execute_batch(&format!(
                    "SET s3_access_key_id = {}; SET s3_secret_access_key = {}; SET s3_region = {};",
                    quote(&key_id),
                    quote(&secret),
                    quote(&region)
                ))
                .map_err(|e| Error::warehouse(format!("Failed to configure S3: {e}")))?;

            if let Ok(endpoint) = std::env::var("AWS_ENDPOINT") {
                let endpoint = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://");
                self.conn
                    .execute_batch(&format!(
                        "SET s3_endpoint = {}; SET s3_url_style = 'path';",
                        quote(endpoint)
                    ))
                    .map_err(|e| {
                        Error::warehouse(format!("Failed to configure S3 endpoint: {e}"))
                    })?;
            }
        }

        if let (Ok(key_id), Ok(secret)) = (
            std::env::var("GCS_HMAC_KEY_ID"),
            std::env::var("GCS_HMAC_SECRET"),
        ) {
            self.conn
                .execute_batch(&format!(
                    "CREATE OR REPLACE SECRET datawagon_gcs (TYPE GCS, KEY_ID {}, SECRET {});",
                    quote(&key_id),
                    quote(&secret)
                ))
                .map_err(|e| Error::warehouse(format!("Failed to configure GCS: {e}")))?;
        }

        Ok(())
    }

    /// Dataset (DuckDB schema) holding the views
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    fn registry(&self) -> String {
        format!("{}.{}", ident(&self.dataset), ident(REGISTRY_TABLE))
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", ident(&self.dataset), ident(table))
    }

    /// `SELECT` statement reading the table's objects
    pub fn read_csv_sql(spec: &ExternalTableSpec) -> String {
        let files: Vec<String> = spec.object_glob().iter().map(|u| quote(u)).collect();
        let nulls: Vec<String> = NULL_STRINGS.iter().map(|n| quote(n)).collect();

        let mut options = vec![
            "header = true".to_string(),
            format!("skip = {}", spec.skip_rows.saturating_sub(1)),
            "compression = 'gzip'".to_string(),
            format!("hive_partitioning = {}", spec.hive_prefix.is_some()),
            format!("nullstr = [{}]", nulls.join(", ")),
        ];
        match &spec.fields {
            Some(fields) => {
                let columns: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", quote(&f.name), quote(duckdb_type(f.field_type))))
                    .collect();
                options.push(format!("columns = {{{}}}", columns.join(", ")));
            }
            None => options.push("auto_detect = true".to_string()),
        }

        format!(
            "SELECT * FROM read_csv([{}], {})",
            files.join(", "),
            options.join(", ")
        )
    }

    /// Run a scalar count query, used by tests and the CLI preview
    pub fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualified(table));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| Error::warehouse(format!("Failed to count rows in {table}: {e}")))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Column names and DuckDB types of a table, in order
    pub fn describe(&self, table: &str) -> Result<Vec<(String, String)>> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }
        let sql = format!("DESCRIBE {}", self.qualified(table));
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::warehouse(format!("Failed to prepare query: {e}")))?;
        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| Error::warehouse(format!("Failed to describe {table}: {e}")))?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(columns)
    }
}

impl Warehouse for DuckDbWarehouse {
    fn create_external_table(&self, spec: &ExternalTableSpec) -> Result<()> {
        let select = Self::read_csv_sql(spec);
        debug!("Creating view {} as {}", spec.table_name, select);

        self.conn
            .execute_batch(&format!(
                "CREATE OR REPLACE VIEW {} AS {select};",
                self.qualified(&spec.table_name)
            ))
            .map_err(|e| {
                Error::warehouse(format!(
                    "Failed to create table {}: {e}",
                    spec.table_name
                ))
            })?;

        let uris = serde_json::to_string(&spec.object_glob())?;
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO {} VALUES (?, ?, ?, ?)", self.registry()),
                params![
                    spec.table_name,
                    uris,
                    i64::from(spec.skip_rows),
                    spec.is_autodetect()
                ],
            )
            .map_err(|e| Error::warehouse(format!("Failed to register table: {e}")))?;

        info!(
            "Created external table {}.{} (skip_leading_rows={}, autodetect={})",
            self.dataset,
            spec.table_name,
            spec.skip_rows,
            spec.is_autodetect()
        );
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let sql = format!(
            "SELECT table_name, source_uris, skip_rows, autodetect FROM {} ORDER BY table_name",
            self.registry()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::warehouse(format!("Failed to prepare query: {e}")))?;

        let rows: Vec<(String, String, i64, bool)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(|e| Error::warehouse(format!("Failed to query tables: {e}")))?
            .filter_map(std::result::Result::ok)
            .collect();

        rows.into_iter()
            .map(|(table_name, uris, skip_rows, autodetect)| {
                let source_uris: Vec<String> = serde_json::from_str(&uris)?;
                let mut columns: Vec<String> =
                    source_uris.iter().flat_map(|u| partition_columns(u)).collect();
                columns.dedup();
                Ok(TableInfo {
                    table_name,
                    source_uris,
                    partition_columns: columns,
                    skip_rows: u32::try_from(skip_rows).unwrap_or(1),
                    autodetect,
                })
            })
            .collect()
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE table_name = ?", self.registry()),
                params![table],
                |row| row.get(0),
            )
            .map_err(|e| Error::warehouse(format!("Failed to check table {table}: {e}")))?;
        Ok(count > 0)
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }

        self.conn
            .execute_batch(&format!("DROP VIEW IF EXISTS {};", self.qualified(table)))
            .map_err(|e| Error::warehouse(format!("Failed to drop table {table}: {e}")))?;
        self.conn
            .execute(
                &format!("DELETE FROM {} WHERE table_name = ?", self.registry()),
                params![table],
            )
            .map_err(|e| Error::warehouse(format!("Failed to unregister table: {e}")))?;

        info!("Dropped external table {}.{}", self.dataset, table);
        Ok(())
    }
}
