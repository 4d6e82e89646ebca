//! # Statistics for Cost Estimation
//!
//! This module defines the per-table statistics record and the distinct-value map that
//! the estimator threads through a costing pass.
//!
//! ## Statistics Record
//!
//! Each base table has a plain-text `<table>.stat` record:
//!
//! ```text
//! 100          <- line 1: number of tuples
//! 50 20 7      <- line 2: distinct values per column, in schema order
//! ```
//!
//! Anything else (extra tokens, missing tokens, non-integers, a missing line) is rejected.
//! The optimizer would rather fail than cost a plan with invented statistics.
//!
//! ## Derivation Under Uniformity
//!
//! Intermediate results have no statistics of their own. The estimator derives them
//! bottom-up under the classic assumptions: values are uniformly distributed and columns
//! are independent.
//!
//! - **Equality selection**: `ceil(n / NDV)`.
//! - **Inequality selection**: `ceil(n - n / NDV)`.
//! - **Range selection**: fixed one-half heuristic.
//! - **Equi-join**: `|L| * |R| / max(NDV(L.key), NDV(R.key))` per condition. Afterwards
//!   both key columns hold `min` of the two NDVs (the containment assumption).

use crate::error::CatalogError;
use crate::expr::{Attribute, Comparator};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Contents of one `<table>.stat` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatistics {
    pub num_tuples: u64,
    /// Distinct-value count per column, in schema order.
    pub distinct_counts: Vec<u64>,
}

impl TableStatistics {
    pub fn new(num_tuples: u64, distinct_counts: Vec<u64>) -> Self {
        Self {
            num_tuples,
            distinct_counts,
        }
    }

    /// Parse a statistics record for a table with `num_columns` columns.
    pub fn parse(table: &str, text: &str, num_columns: usize) -> Result<Self, CatalogError> {
        let malformed = |reason: String| CatalogError::MalformedStatistics {
            table: table.to_string(),
            reason,
        };

        let mut lines = text.lines();
        let first = lines
            .next()
            .ok_or_else(|| malformed("missing tuple count line".into()))?;
        let tuple_tokens: Vec<&str> = first.split_whitespace().collect();
        if tuple_tokens.len() != 1 {
            return Err(malformed(format!(
                "expected 1 token on line 1, found {}",
                tuple_tokens.len()
            )));
        }
        let num_tuples = parse_count(tuple_tokens[0]).map_err(&malformed)?;

        let second = lines
            .next()
            .ok_or_else(|| malformed("missing distinct-value line".into()))?;
        let distinct_tokens: Vec<&str> = second.split_whitespace().collect();
        if distinct_tokens.len() != num_columns {
            return Err(malformed(format!(
                "expected {} distinct-value counts on line 2, found {}",
                num_columns,
                distinct_tokens.len()
            )));
        }
        let distinct_counts = distinct_tokens
            .into_iter()
            .map(parse_count)
            .collect::<Result<Vec<_>, _>>()
            .map_err(&malformed)?;

        Ok(Self {
            num_tuples,
            distinct_counts,
        })
    }

    /// Render back into the on-disk record format.
    pub fn to_record(&self) -> String {
        let distinct: Vec<String> = self.distinct_counts.iter().map(|d| d.to_string()).collect();
        format!("{}\n{}\n", self.num_tuples, distinct.join(" "))
    }
}

fn parse_count(token: &str) -> Result<u64, String> {
    token
        .parse::<u64>()
        .map_err(|e| format!("'{token}' is not a count: {e}"))
}

/// Attribute → number of distinct values, for the duration of one costing pass.
///
/// Entries are seeded by scans and lowered by selections and joins. An update made while
/// costing a subtree is visible to every ancestor costed afterwards.
#[derive(Debug, Clone, Default)]
pub struct DistinctValues {
    counts: HashMap<Attribute, u64>,
}

impl DistinctValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, attr: &Attribute) -> Option<u64> {
        self.counts.get(attr).copied()
    }

    pub fn set(&mut self, attr: Attribute, count: u64) {
        self.counts.insert(attr, count);
    }

    /// (Re)initialise every column of a freshly scanned table.
    pub fn seed(&mut self, schema: &Schema, stats: &TableStatistics) {
        for (attr, count) in schema.attributes().iter().zip(&stats.distinct_counts) {
            self.counts.insert(attr.clone(), *count);
        }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Output cardinality of a single-attribute selection over `input` tuples.
///
/// A distinct count of zero is treated as one.
pub fn selection_cardinality(comparator: Comparator, input: u64, distinct: u64) -> u64 {
    let n = input as f64;
    let d = distinct.max(1) as f64;
    let out = match comparator {
        Comparator::Eq => n / d,
        Comparator::NotEq => n - n / d,
        _ => 0.5 * n,
    };
    out.ceil() as u64
}

/// Number of tuples of `tuple_size` bytes that fit on a page, at least one.
pub fn tuples_per_page(page_size: u64, tuple_size: u64) -> u64 {
    if tuple_size == 0 {
        return page_size.max(1);
    }
    (page_size / tuple_size).max(1)
}

/// Pages needed to hold `tuples` tuples at `capacity` tuples per page.
pub fn num_pages(tuples: u64, capacity: u64) -> u64 {
    tuples.div_ceil(capacity.max(1))
}
