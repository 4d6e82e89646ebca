//! # Cost Model
//!
//! This module estimates the I/O cost and output cardinality of a complete plan tree.
//!
//! ## I/O Cost Model
//!
//! Cost is measured in page I/Os. CPU is ignored. The plan is walked bottom-up and every
//! operator that touches disk adds its page count to a single accumulator:
//!
//! ```text
//! Scan                 pages(table)
//! Select, Project      0                      (pipelined)
//! NestedLoop join      pages(L) * pages(R)
//! BlockNested join     pages(L) + ceil(pages(L) / (B - 2)) * pages(R)
//! SortMerge join       0                      (sort and merge costs are computed, not charged)
//! GroupBy, OrderBy,
//! Distinct, Sort       2 * pages * (1 + ceil(log_(B-1)(ceil(pages / B))))
//! ```
//!
//! Joins use the per-join buffer allotment; sorts use the whole buffer pool.
//!
//! ## Cardinality and Distinct Values
//!
//! Alongside the cost, each operator returns its estimated output cardinality. The
//! estimator keeps one `DistinctValues` map per pass. Scans seed it from the catalog,
//! selections and joins lower it, and ancestors costed later read the lowered values.
//! This is why the map is owned by `PlanCost` and threaded through the walk by `&mut self`
//! rather than copied per subtree.
//!
//! ## Feasibility
//!
//! A plan is infeasible when a block-nested join or a sort needs more buffers than
//! configured, or when it contains an operator or join algorithm this model cannot price.
//! Infeasibility is sticky for the rest of the pass and is reported as [`INFEASIBLE_COST`],
//! so a search loop can simply discard the plan. A selection above an infeasible subtree
//! reports `u64::MAX` tuples as well. Catalog failures are different: they abort the pass
//! with a `PlanError`.

use crate::catalog::Catalog;
use crate::config::BufferConfig;
use crate::error::{PlanError, Result};
use crate::expr::{Attribute, JoinAlgorithm};
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::stats::{self, DistinctValues};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Cost reported for a plan that cannot be executed with the configured resources.
pub const INFEASIBLE_COST: u64 = u64::MAX;

/// Minimum buffer pages for block-nested-loop joins, sort-merge joins and external sorts.
pub const MIN_BUFFERS: u64 = 3;

/// Result of costing one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    /// Total page I/Os, or [`INFEASIBLE_COST`].
    pub cost: u64,
    /// Estimated number of tuples produced by the root.
    pub cardinality: u64,
}

impl Estimate {
    pub fn is_feasible(&self) -> bool {
        self.cost != INFEASIBLE_COST
    }
}

/// Why a pass was declared infeasible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Infeasibility {
    InsufficientBuffers { required: u64, available: u64 },
    UnsupportedJoinAlgorithm(JoinAlgorithm),
    UnsupportedOperator(String),
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infeasibility::InsufficientBuffers {
                required,
                available,
            } => write!(f, "needs {required} buffers, only {available} available"),
            Infeasibility::UnsupportedJoinAlgorithm(algo) => {
                write!(f, "join algorithm {algo} is not supported")
            }
            Infeasibility::UnsupportedOperator(op) => write!(f, "operator {op} is not supported"),
        }
    }
}

/// Page I/O cost of joining inputs of `left_pages` and `right_pages` with `buffers` pages.
pub fn join_cost(
    algorithm: JoinAlgorithm,
    left_pages: u64,
    right_pages: u64,
    buffers: u64,
) -> std::result::Result<u64, Infeasibility> {
    match algorithm {
        JoinAlgorithm::NestedLoop => Ok(left_pages.saturating_mul(right_pages)),
        JoinAlgorithm::BlockNested => {
            require_buffers(buffers)?;
            let blocks = left_pages.div_ceil(buffers - 2);
            Ok(left_pages.saturating_add(blocks.saturating_mul(right_pages)))
        }
        JoinAlgorithm::SortMerge => {
            let sort_left = sort_merge_side_cost(left_pages, buffers);
            let sort_right = sort_merge_side_cost(right_pages, buffers);
            let merge = left_pages.saturating_add(right_pages);
            // Sort and merge are not charged to the plan.
            trace!(sort_left, sort_right, merge, "sort-merge join cost not charged");
            Ok(0)
        }
        JoinAlgorithm::Hash => Err(Infeasibility::UnsupportedJoinAlgorithm(algorithm)),
    }
}

/// `2 * pages * (1 + ceil(ln(ceil(pages / buffers))))`, the per-input sort estimate of a
/// sort-merge join.
fn sort_merge_side_cost(pages: u64, buffers: u64) -> u64 {
    if pages == 0 {
        return 0;
    }
    let runs = (pages as f64 / buffers.max(1) as f64).ceil();
    let passes = 1.0 + runs.ln().ceil();
    (2.0 * pages as f64 * passes) as u64
}

/// Page I/O cost of an external merge sort of `pages` pages with `buffers` buffer pages.
///
/// One pass builds `ceil(pages / buffers)` sorted runs, then `(buffers - 1)`-way merge
/// passes combine them. Each pass reads and writes every page.
pub fn external_sort_cost(buffers: u64, pages: u64) -> std::result::Result<u64, Infeasibility> {
    require_buffers(buffers)?;
    if pages == 0 {
        return Ok(0);
    }
    let runs = pages.div_ceil(buffers);
    let merge_passes = ((runs as f64).ln() / ((buffers - 1) as f64).ln()).ceil() as u64;
    let passes = 1 + merge_passes;
    Ok(2u64.saturating_mul(pages).saturating_mul(passes))
}

fn require_buffers(available: u64) -> std::result::Result<(), Infeasibility> {
    if available < MIN_BUFFERS {
        return Err(Infeasibility::InsufficientBuffers {
            required: MIN_BUFFERS,
            available,
        });
    }
    Ok(())
}

/// Plan cost estimator.
///
/// One instance runs one pass at a time: `estimate` takes `&mut self` because the cost
/// accumulator, the feasibility flag and the distinct-value map are per-pass state.
pub struct PlanCost {
    catalog: Arc<dyn Catalog>,
    buffers: BufferConfig,
    cost: u64,
    feasible: bool,
    infeasibility: Option<Infeasibility>,
    distinct: DistinctValues,
    cardinality: u64,
}

impl PlanCost {
    pub fn new(catalog: Arc<dyn Catalog>, buffers: BufferConfig) -> Self {
        Self {
            catalog,
            buffers,
            cost: 0,
            feasible: true,
            infeasibility: None,
            distinct: DistinctValues::new(),
            cardinality: 0,
        }
    }

    /// Cost `root` and estimate its output cardinality.
    ///
    /// Infeasible plans come back with `cost == INFEASIBLE_COST`. Catalog failures are
    /// returned as errors.
    pub fn estimate(&mut self, root: &PlanNode) -> Result<Estimate> {
        self.cost = 0;
        self.feasible = true;
        self.infeasibility = None;
        self.distinct.clear();
        debug!(root = ?root.kind(), "Starting cost estimation");

        self.cardinality = self.calculate_cost(root)?;

        let cost = if self.feasible {
            self.cost
        } else {
            warn!(
                reason = %self.infeasibility.as_ref().map(|r| r.to_string()).unwrap_or_default(),
                "plan is not feasible"
            );
            INFEASIBLE_COST
        };
        debug!(cost, cardinality = self.cardinality, "Cost estimation complete");
        Ok(Estimate {
            cost,
            cardinality: self.cardinality,
        })
    }

    /// Cardinality of the root from the most recent `estimate` call.
    pub fn last_cardinality(&self) -> u64 {
        self.cardinality
    }

    /// First reason the most recent pass became infeasible, if it did.
    pub fn last_infeasibility(&self) -> Option<&Infeasibility> {
        self.infeasibility.as_ref()
    }

    /// Distinct-value counts as left by the most recent pass.
    pub fn distinct_values(&self) -> &DistinctValues {
        &self.distinct
    }

    fn add_cost(&mut self, pages: u64) {
        self.cost = self.cost.saturating_add(pages);
    }

    fn mark_infeasible(&mut self, reason: Infeasibility) {
        match &reason {
            Infeasibility::UnsupportedJoinAlgorithm(algo) => {
                warn!(algorithm = %algo, "join algorithm is not supported");
            }
            Infeasibility::UnsupportedOperator(op) => {
                warn!(operator = %op, "operator is not supported");
            }
            Infeasibility::InsufficientBuffers {
                required,
                available,
            } => {
                warn!(required, available, "not enough buffers");
            }
        }
        self.feasible = false;
        if self.infeasibility.is_none() {
            self.infeasibility = Some(reason);
        }
    }

    /// Returns the number of tuples produced by `node`.
    fn calculate_cost(&mut self, node: &PlanNode) -> Result<u64> {
        match node {
            PlanNode::Scan { table, schema } => self.scan_statistics(table, schema),
            PlanNode::Select {
                base,
                condition,
                schema,
            } => {
                let input = self.calculate_cost(base)?;
                if !self.feasible {
                    return Ok(INFEASIBLE_COST);
                }
                let attr = schema.resolve(&condition.lhs)?;
                let distinct = self.distinct_of(attr)?;
                let output = stats::selection_cardinality(condition.comparator, input, distinct);
                trace!(%condition, input, distinct, output, "select");

                // Every column's distinct count becomes the output cardinality. The
                // proportional estimate is computed but not stored.
                for attr in schema.attributes() {
                    let old = self.distinct.get(attr).unwrap_or(output);
                    let scaled = if input == 0 {
                        0
                    } else {
                        ((output as f64 / input as f64) * old as f64).ceil() as u64
                    };
                    trace!(%attr, old, scaled, stored = output, "select distinct update");
                    self.distinct.set(attr.clone(), output);
                }
                Ok(output)
            }
            PlanNode::Project { base, .. } => self.calculate_cost(base),
            PlanNode::Join {
                left,
                right,
                conditions,
                algorithm,
                node_index,
                ..
            } => {
                let left_tuples = self.calculate_cost(left)?;
                let right_tuples = self.calculate_cost(right)?;
                if !self.feasible {
                    return Ok(0);
                }

                let left_schema = left.schema();
                let right_schema = right.schema();
                let page_size = self.buffers.page_size;
                let left_pages = stats::num_pages(
                    left_tuples,
                    stats::tuples_per_page(page_size, left_schema.tuple_size()),
                );
                let right_pages = stats::num_pages(
                    right_tuples,
                    stats::tuples_per_page(page_size, right_schema.tuple_size()),
                );

                let mut tuples = left_tuples as f64 * right_tuples as f64;
                for condition in conditions {
                    let left_attr = left_schema.resolve(&condition.lhs)?.clone();
                    let rhs = condition.rhs_attribute().ok_or_else(|| {
                        PlanError::InvalidJoinCondition(condition.to_string())
                    })?;
                    let right_attr = right_schema.resolve(rhs)?.clone();

                    let left_distinct = self.distinct_of(&left_attr)?;
                    let right_distinct = self.distinct_of(&right_attr)?;
                    tuples /= left_distinct.max(right_distinct).max(1) as f64;
                    let min_distinct = left_distinct.min(right_distinct);
                    self.distinct.set(left_attr, min_distinct);
                    self.distinct.set(right_attr, min_distinct);
                }
                let output = tuples.ceil() as u64;

                let buffers = self.buffers.buffers_per_join;
                match join_cost(*algorithm, left_pages, right_pages, buffers) {
                    Ok(cost) => {
                        trace!(
                            node_index,
                            %algorithm,
                            left_pages,
                            right_pages,
                            cost,
                            output,
                            "join"
                        );
                        self.add_cost(cost);
                        Ok(output)
                    }
                    Err(reason @ Infeasibility::UnsupportedJoinAlgorithm(_)) => {
                        self.mark_infeasible(reason);
                        Ok(0)
                    }
                    Err(reason) => {
                        self.mark_infeasible(reason);
                        Ok(output)
                    }
                }
            }
            PlanNode::GroupBy { base, schema, .. }
            | PlanNode::OrderBy { base, schema, .. }
            | PlanNode::Distinct { base, schema, .. }
            | PlanNode::Sort { base, schema, .. } => self.sort_statistics(base, schema),
            PlanNode::Other { operator, .. } => {
                self.mark_infeasible(Infeasibility::UnsupportedOperator(operator.clone()));
                Ok(0)
            }
        }
    }

    /// Read `<table>.stat`, seed the distinct-value map and charge one read per page.
    fn scan_statistics(&mut self, table: &str, schema: &Schema) -> Result<u64> {
        let table_stats = self.catalog.table_statistics(table, schema)?;
        self.distinct.seed(schema, &table_stats);

        let capacity = stats::tuples_per_page(self.buffers.page_size, schema.tuple_size());
        let pages = stats::num_pages(table_stats.num_tuples, capacity);
        trace!(table, tuples = table_stats.num_tuples, pages, "scan");
        self.add_cost(pages);
        Ok(table_stats.num_tuples)
    }

    /// Sort-based operators keep their input cardinality and pay for an external sort.
    fn sort_statistics(&mut self, base: &PlanNode, schema: &Schema) -> Result<u64> {
        let tuples = self.calculate_cost(base)?;
        let capacity = stats::tuples_per_page(self.buffers.page_size, schema.tuple_size());
        let pages = stats::num_pages(tuples, capacity);
        match external_sort_cost(self.buffers.num_buffers, pages) {
            Ok(cost) => {
                trace!(pages, cost, "external sort");
                self.add_cost(cost);
            }
            Err(reason) => self.mark_infeasible(reason),
        }
        Ok(tuples)
    }

    fn distinct_of(&self, attr: &Attribute) -> Result<u64> {
        self.distinct
            .get(attr)
            .ok_or_else(|| PlanError::UnknownAttribute(attr.clone()))
    }
}
