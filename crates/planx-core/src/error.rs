//! # Error Types
//!
//! Two kinds of failure leave this crate as errors:
//!
//! - **Catalog errors** (`CatalogError`): a schema descriptor or statistics record is
//!   missing, unreadable, or malformed. These are fatal for the plan being built or
//!   costed. The optimizer never substitutes default statistics for a table it cannot read.
//! - **Plan errors** (`PlanError`): the plan or query refers to something that does not
//!   exist (an unknown table or attribute), or a catalog error surfaced while planning.
//!
//! Running out of buffers or meeting an operator the cost model does not know is *not* an
//! error. Those plans are merely infeasible and are reported through the estimator's
//! sentinel cost (see `cost::INFEASIBLE_COST`).

use crate::expr::Attribute;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("schema of table '{table}' is unavailable: {reason}")]
    SchemaUnavailable { table: String, reason: String },

    #[error("statistics of table '{table}' are unavailable: {reason}")]
    StatisticsUnavailable { table: String, reason: String },

    #[error("incorrect format of statistics file for table '{table}': {reason}")]
    MalformedStatistics { table: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("attribute {0} is not part of the operator schema")]
    UnknownAttribute(Attribute),

    #[error("join condition '{0}' does not compare two attributes")]
    InvalidJoinCondition(String),

    #[error("table '{0}' is not in the from-list")]
    UnknownTable(String),

    #[error("query has no tables to scan")]
    NoTables,
}

pub type Result<T> = std::result::Result<T, PlanError>;
