//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, FileKindArg, OutputFormat};
use crate::compare::{compare_counts, find_new_files, group_remote_files};
use crate::config::{load_source_config, AppConfig};
use crate::convert::{zip_to_gzip, ZipLimits};
use crate::error::{Error, Result};
use crate::scanner::{FileScanner, ManagedFileGroup};
use crate::schema::{InferredSchema, SchemaInferrer};
use crate::storage::StorageBucket;
use crate::types::FileKind;
use crate::warehouse::{
    scan_storage_folders, DuckDbWarehouse, ExternalTableSpec, StorageFolder, Warehouse,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{error, info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    config: AppConfig,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        let config = cli.app_config();
        Self { cli, config }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Scan { kind } => self.scan(*kind),
            Commands::Storage => self.storage().await,
            Commands::Compare => self.compare().await,
            Commands::Upload { dry_run } => self.upload(*dry_run).await,
            Commands::ZipToGzip { remove_zip } => self.zip_to_gzip(*remove_zip).await,
            Commands::InferSchema {
                location,
                sample_size,
            } => self.infer_schema(location, *sample_size).await,
            Commands::CreateTables { ddl, no_autodetect } => {
                self.create_tables(*ddl, *no_autodetect).await
            }
            Commands::ListTables => self.list_tables(),
            Commands::DropTables { names } => self.drop_tables(names),
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    fn scanner(&self) -> Result<FileScanner> {
        let source_config = load_source_config(&self.config.csv_source_config)?;
        Ok(FileScanner::new(&self.config.csv_source_dir, source_config))
    }

    fn bucket(&self) -> Result<StorageBucket> {
        StorageBucket::for_bucket(self.config.bucket()?)
    }

    /// Open the warehouse, with cloud credentials when views read a cloud bucket
    fn warehouse(&self, bucket: Option<&StorageBucket>) -> Result<DuckDbWarehouse> {
        let warehouse = DuckDbWarehouse::open(&self.cli.warehouse_db, self.config.dataset()?)?;
        if bucket.is_some_and(StorageBucket::is_cloud) {
            warehouse.configure_cloud_storage()?;
        }
        Ok(warehouse)
    }

    /// Local groups and bucket file names per base name
    async fn local_and_remote(
        &self,
        bucket: &StorageBucket,
    ) -> Result<(Vec<ManagedFileGroup>, BTreeMap<String, Vec<String>>)> {
        let scanner = self.scanner()?;
        let local = scanner.scan(Some(FileKind::CsvGz))?;
        let entries = bucket.list(Some(self.config.storage_prefix())).await?;
        let remote = group_remote_files(scanner.config(), &entries, self.config.storage_prefix())?;
        Ok((local, remote))
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// List matched local files
    fn scan(&self, kind: Option<FileKindArg>) -> Result<()> {
        let groups = self.scanner()?.scan(kind.map(FileKind::from))?;
        let prefix = self.config.storage_prefix();

        let sources: Vec<Value> = groups
            .iter()
            .map(|group| {
                let files: Vec<Value> = group
                    .files
                    .iter()
                    .map(|f| {
                        json!({
                            "file_name": f.file_name,
                            "size": f.human_size(),
                            "file_version": f.file_version,
                            "report_date": f.report_date_str(),
                            "content_owner": f.content_owner,
                            "destination": f.destination_path(prefix),
                        })
                    })
                    .collect();
                json!({
                    "source": group.source_id,
                    "base_name": group.base_name,
                    "table_name": group.table_name,
                    "table_mode": group.table_mode,
                    "files": files,
                })
            })
            .collect();

        let total: usize = groups.iter().map(|g| g.files.len()).sum();
        info!("{} files in local source directory", total);

        self.output_message(&json!({
            "type": "FILES",
            "file_count": total,
            "sources": sources,
        }));
        Ok(())
    }

    /// List files already uploaded, per source
    async fn storage(&self) -> Result<()> {
        let bucket = self.bucket()?;
        let scanner = self.scanner()?;
        let entries = bucket.list(Some(self.config.storage_prefix())).await?;
        let remote = group_remote_files(scanner.config(), &entries, self.config.storage_prefix())?;

        let total: usize = remote.values().map(Vec::len).sum();
        info!("{} files in bucket storage", total);

        self.output_message(&json!({
            "type": "STORAGE",
            "bucket": bucket.uri(""),
            "file_count": total,
            "sources": remote,
        }));
        Ok(())
    }

    /// Compare local and bucket file counts
    async fn compare(&self) -> Result<()> {
        let bucket = self.bucket()?;
        let (local, remote) = self.local_and_remote(&bucket).await?;

        let rows = compare_counts(&local, &remote);
        if rows.is_empty() {
            return Err(Error::config("No sources found to compare"));
        }

        let remote_names: HashSet<String> = remote.into_values().flatten().collect();
        let new_files: Vec<&str> = find_new_files(&local, &remote_names)
            .into_iter()
            .map(|f| f.file_name.as_str())
            .collect();

        if new_files.is_empty() {
            warn!("No new files found");
        } else {
            info!("Found {} new files", new_files.len());
        }

        self.output_message(&json!({
            "type": "COMPARE",
            "rows": rows,
            "new_files": new_files,
        }));
        Ok(())
    }

    /// Upload new files
    async fn upload(&self, dry_run: bool) -> Result<()> {
        let bucket = self.bucket()?;
        let (local, remote) = self.local_and_remote(&bucket).await?;
        let remote_names: HashSet<String> = remote.into_values().flatten().collect();
        let new_files = find_new_files(&local, &remote_names);
        let prefix = self.config.storage_prefix();

        if new_files.is_empty() {
            warn!("No new files found");
        }

        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        let start = Instant::now();

        for file in &new_files {
            let destination = file.destination_path(prefix);
            if dry_run {
                uploaded.push(json!({ "file_name": file.file_name, "destination": destination }));
                continue;
            }

            info!("Uploading {} into {}", file.file_name, file.storage_folder_name);
            match bucket.upload_file(&file.path, &destination).await {
                Ok(outcome) => uploaded.push(json!({
                    "file_name": file.file_name,
                    "uri": outcome.uri,
                    "bytes": outcome.bytes,
                    "mb_per_sec": outcome.mb_per_sec,
                })),
                Err(Error::AlreadyExists { path }) => {
                    warn!("Skipping {}: already exists at {}", file.file_name, path);
                }
                Err(e) => {
                    error!("Failed to upload {}: {}", file.file_name, e);
                    failed.push(json!({ "file_name": file.file_name, "error": e.to_string() }));
                }
            }
        }

        self.output_message(&json!({
            "type": "UPLOAD",
            "dry_run": dry_run,
            "uploaded": uploaded,
            "failed": failed,
            "duration_secs": start.elapsed().as_secs_f64(),
        }));

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Other(format!("{} uploads failed", failed.len())))
        }
    }

    /// Convert matched zip archives
    async fn zip_to_gzip(&self, remove_zip: bool) -> Result<()> {
        let groups = self.scanner()?.scan(Some(FileKind::Zip))?;
        let zips: Vec<_> = groups
            .iter()
            .flat_map(|g| g.files.iter().map(|f| f.path.clone()))
            .collect();

        if zips.is_empty() {
            warn!("No zip files found");
        }

        let mut converted = Vec::new();
        for zip_path in zips {
            let path = zip_path.clone();
            let written = tokio::task::spawn_blocking(move || {
                zip_to_gzip(&path, remove_zip, &ZipLimits::default())
            })
            .await??;
            converted.push(json!({
                "zip": zip_path.display().to_string(),
                "written": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            }));
        }

        self.output_message(&json!({
            "type": "ZIP_TO_GZIP",
            "converted": converted,
        }));
        Ok(())
    }

    // ========================================================================
    // Schema and tables
    // ========================================================================

    /// Infer a schema off the async runtime
    async fn infer(
        bucket: &StorageBucket,
        location: &str,
        inferrer: SchemaInferrer,
    ) -> Result<Option<InferredSchema>> {
        let bucket = bucket.clone();
        let location = location.to_string();
        let schema =
            tokio::task::spawn_blocking(move || inferrer.infer_schema(&bucket, &location)).await?;
        Ok(schema)
    }

    /// Infer and print the schema of one object
    async fn infer_schema(&self, location: &str, sample_size: usize) -> Result<()> {
        let bucket = self.bucket()?;
        let inferrer = SchemaInferrer::new().with_sample_size(sample_size);
        let schema = Self::infer(&bucket, location, inferrer).await?;

        if schema.is_none() {
            warn!("Could not infer a schema for {}", location);
        }

        self.output_message(&json!({
            "type": "SCHEMA",
            "location": bucket.uri(location),
            "schema": schema,
        }));
        Ok(())
    }

    /// Build the table definition for a folder, inferring from its first file
    async fn table_spec(
        &self,
        bucket: &StorageBucket,
        folder: &StorageFolder,
        no_autodetect: bool,
    ) -> Result<ExternalTableSpec> {
        let schema = match folder.sample_files.first() {
            Some(sample) => Self::infer(bucket, sample, SchemaInferrer::new()).await?,
            None => None,
        };

        if schema.is_none() {
            if no_autodetect {
                return Err(Error::SchemaUnavailable {
                    location: folder.storage_folder_name.clone(),
                });
            }
            warn!(
                "Schema inference failed for {}, falling back to autodetect",
                folder.storage_folder_name
            );
        }

        Ok(ExternalTableSpec::for_folder(bucket, folder, schema.as_ref()))
    }

    /// Create external tables for folders without one
    async fn create_tables(&self, ddl: bool, no_autodetect: bool) -> Result<()> {
        let bucket = self.bucket()?;
        let prefix = self.config.storage_prefix();
        info!("Scanning bucket for folders under '{}/'", prefix);

        let entries = bucket.list(Some(prefix)).await?;
        let folders = scan_storage_folders(&entries, prefix);
        if folders.is_empty() {
            warn!("No storage folders found in bucket");
        }

        let ddl_target = if ddl {
            Some((self.config.project()?, self.config.dataset()?))
        } else {
            None
        };
        let warehouse = if ddl {
            None
        } else {
            Some(self.warehouse(Some(&bucket))?)
        };
        let existing: HashSet<String> = match &warehouse {
            Some(w) => w.list_tables()?.into_iter().map(|t| t.table_name).collect(),
            None => HashSet::new(),
        };

        let mut created = Vec::new();
        let mut failed = Vec::new();

        for folder in folders
            .iter()
            .filter(|f| !existing.contains(&f.proposed_table_name))
        {
            let result = match self.table_spec(&bucket, folder, no_autodetect).await {
                Ok(spec) => match (&warehouse, ddl_target) {
                    (Some(w), _) => w.create_external_table(&spec).map(|()| {
                        json!({
                            "table_name": spec.table_name,
                            "storage_folder": folder.storage_folder_name,
                            "file_count": folder.file_count,
                            "partitioned": folder.has_partitioning,
                            "autodetect": spec.is_autodetect(),
                        })
                    }),
                    (None, Some((project, dataset))) => Ok(json!({
                        "table_name": spec.table_name,
                        "ddl": spec.to_bigquery_ddl(project, dataset),
                    })),
                    (None, None) => Err(Error::warehouse("No warehouse or DDL target")),
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => created.push(value),
                Err(e) => {
                    error!("Error creating table {}: {}", folder.proposed_table_name, e);
                    failed.push(json!({
                        "table_name": folder.proposed_table_name,
                        "error": e.to_string(),
                    }));
                }
            }
        }

        if created.is_empty() && failed.is_empty() && !folders.is_empty() {
            info!("All storage folders already have corresponding tables");
        }

        self.output_message(&json!({
            "type": "CREATE_TABLES",
            "tables": created,
            "failed": failed,
        }));

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::warehouse(format!("{} tables failed", failed.len())))
        }
    }

    /// List external tables
    fn list_tables(&self) -> Result<()> {
        let tables = self.warehouse(None)?.list_tables()?;
        info!("Found {} external tables", tables.len());

        self.output_message(&json!({
            "type": "TABLES",
            "tables": tables,
        }));
        Ok(())
    }

    /// Drop the named tables
    fn drop_tables(&self, names: &[String]) -> Result<()> {
        let warehouse = self.warehouse(None)?;

        let mut dropped = Vec::new();
        let mut failed = Vec::new();
        for name in names {
            match warehouse.drop_table(name) {
                Ok(()) => dropped.push(name.clone()),
                Err(e) => {
                    error!("Failed to drop {}: {}", name, e);
                    failed.push(json!({ "table_name": name, "error": e.to_string() }));
                }
            }
        }

        self.output_message(&json!({
            "type": "DROP_TABLES",
            "dropped": dropped,
            "failed": failed,
        }));

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::warehouse(format!("{} tables failed to drop", failed.len())))
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Output a message in the selected format
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
