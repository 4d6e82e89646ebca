//! # Catalog Interface
//!
//! The catalog gives the optimizer the two pieces of metadata it needs per base table:
//!
//! - `table_schema`: the ordered attribute list and tuple size, used by the plan builder
//!   when it creates a Scan.
//! - `table_statistics`: the tuple count and per-column distinct-value counts, used by the
//!   cost estimator when it prices a Scan.
//!
//! ## Trait Design
//!
//! `Catalog` is used behind `Arc<dyn Catalog>` so that the builder and the estimator can
//! share one instance. Two implementations are provided:
//!
//! - `FileCatalog` reads `<table>.md` (a JSON-encoded `Schema`) and `<table>.stat` (see
//!   `stats`) from a directory. This is the on-disk layout the surrounding system writes.
//! - `InMemoryCatalog` is populated programmatically and used in tests.
//!
//! Every lookup failure is a `CatalogError`. A missing table is never answered with
//! default statistics.

use crate::error::CatalogError;
use crate::schema::Schema;
use crate::stats::TableStatistics;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Catalog provides schema and statistics information.
pub trait Catalog: Send + Sync {
    fn table_schema(&self, table: &str) -> Result<Schema, CatalogError>;

    /// Statistics of `table`, validated against `schema` (one distinct count per column).
    fn table_statistics(&self, table: &str, schema: &Schema)
        -> Result<TableStatistics, CatalogError>;
}

/// In-memory catalog for testing and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    pub schemas: HashMap<String, Schema>,
    pub statistics: HashMap<String, TableStatistics>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &str, schema: Schema, stats: TableStatistics) {
        self.schemas.insert(table.to_string(), schema);
        self.statistics.insert(table.to_string(), stats);
    }
}

impl Catalog for InMemoryCatalog {
    fn table_schema(&self, table: &str) -> Result<Schema, CatalogError> {
        self.schemas
            .get(table)
            .cloned()
            .ok_or_else(|| CatalogError::SchemaUnavailable {
                table: table.to_string(),
                reason: "unknown table".into(),
            })
    }

    fn table_statistics(
        &self,
        table: &str,
        schema: &Schema,
    ) -> Result<TableStatistics, CatalogError> {
        let stats = self
            .statistics
            .get(table)
            .ok_or_else(|| CatalogError::StatisticsUnavailable {
                table: table.to_string(),
                reason: "unknown table".into(),
            })?;
        if stats.distinct_counts.len() != schema.num_cols() {
            return Err(CatalogError::MalformedStatistics {
                table: table.to_string(),
                reason: format!(
                    "expected {} distinct-value counts, found {}",
                    schema.num_cols(),
                    stats.distinct_counts.len()
                ),
            });
        }
        Ok(stats.clone())
    }
}

/// Catalog backed by `<table>.md` and `<table>.stat` files in one directory.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn schema_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.md"))
    }

    pub fn statistics_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.stat"))
    }

    /// Write a schema descriptor, as the table loader would.
    pub fn write_schema(&self, table: &str, schema: &Schema) -> Result<(), CatalogError> {
        let path = self.schema_path(table);
        let json = serde_json::to_string_pretty(schema).map_err(|e| {
            CatalogError::SchemaUnavailable {
                table: table.to_string(),
                reason: e.to_string(),
            }
        })?;
        fs::write(&path, json).map_err(|source| CatalogError::Io { path, source })
    }
}

impl Catalog for FileCatalog {
    fn table_schema(&self, table: &str) -> Result<Schema, CatalogError> {
        let path = self.schema_path(table);
        let text = fs::read_to_string(&path).map_err(|e| CatalogError::SchemaUnavailable {
            table: table.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        serde_json::from_str(&text).map_err(|e| CatalogError::SchemaUnavailable {
            table: table.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn table_statistics(
        &self,
        table: &str,
        schema: &Schema,
    ) -> Result<TableStatistics, CatalogError> {
        let path = self.statistics_path(table);
        let text = fs::read_to_string(&path).map_err(|source| CatalogError::Io { path, source })?;
        TableStatistics::parse(table, &text, schema.num_cols())
    }
}
