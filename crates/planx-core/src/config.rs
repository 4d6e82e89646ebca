//! # Optimizer Configuration
//!
//! The storage layer and buffer manager are outside this crate; their limits reach the
//! optimizer as plain read-only numbers:
//!
//! - `page_size`: bytes per page. Together with a schema's tuple size this gives the
//!   number of tuples per page and therefore the number of page I/Os of an operator.
//! - `num_buffers`: pages in the whole buffer pool. External sorts (GROUP BY, ORDER BY,
//!   DISTINCT) are costed against the full pool.
//! - `buffers_per_join`: pages reserved for each join. Block-nested-loop joins need at
//!   least three.
//!
//! `OptimizerConfig` bundles these with the location of the catalog files and can be
//! loaded from JSON.

use crate::catalog::FileCatalog;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Total buffer-pool pages.
    pub num_buffers: u64,
    /// Pages available to each join operator.
    pub buffers_per_join: u64,
    /// Page size in bytes.
    pub page_size: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            num_buffers: 50,
            buffers_per_join: 50,
            page_size: 4096,
        }
    }
}

impl BufferConfig {
    /// Split a pool of `num_buffers` pages evenly across `num_joins` joins.
    ///
    /// With no joins every operator may use the whole pool.
    pub fn for_joins(num_buffers: u64, num_joins: usize, page_size: u64) -> Self {
        let buffers_per_join = if num_joins == 0 {
            num_buffers
        } else {
            num_buffers / num_joins as u64
        };
        Self {
            num_buffers,
            buffers_per_join,
            page_size,
        }
    }
}

/// Top-level configuration for building and costing plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub buffers: BufferConfig,
    /// Directory holding `<table>.md` schema descriptors and `<table>.stat` records.
    pub catalog_dir: PathBuf,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            buffers: BufferConfig::default(),
            catalog_dir: PathBuf::from("."),
        }
    }
}

impl OptimizerConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Catalog backed by the files in `catalog_dir`.
    pub fn file_catalog(&self) -> FileCatalog {
        FileCatalog::new(&self.catalog_dir)
    }
}
