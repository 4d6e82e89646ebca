//! # planx-core: Random Plans and I/O Cost Estimation
//!
//! This crate is the costing core of a randomized query optimizer. A search loop (outside
//! this crate) repeatedly asks for a random initial plan, costs it, perturbs it, and keeps
//! the cheapest. This crate provides the two pieces that loop is built on.
//!
//! ## Module Overview
//!
//! - **`expr`**: Attributes, conditions, comparators and join algorithms.
//! - **`schema`**: Output schemas (ordered attributes plus tuple size).
//! - **`plan`**: The plan tree (`PlanNode`) and helpers to inspect and mutate it.
//! - **`query`**: The parsed query clauses a plan is built from.
//! - **`builder`**: `RandomInitialPlan`, which assembles one plan with random join algorithms.
//! - **`cost`**: `PlanCost`, which walks a plan and estimates page I/Os and cardinality.
//! - **`stats`**: The `.stat` record format and the per-pass distinct-value map.
//! - **`catalog`**: Catalog trait for schemas and statistics, with file and in-memory backends.
//! - **`config`**: Buffer-pool and page-size configuration.
//! - **`error`**: Catalog and plan error types.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod expr;
pub mod plan;
pub mod query;
pub mod schema;
pub mod stats;
