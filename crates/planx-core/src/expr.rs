//! # Attributes, Conditions and Join Algorithms
//!
//! This module defines the small vocabulary shared by the plan builder and the cost
//! estimator:
//!
//! ## Attributes (`Attribute`)
//! A column of a base table. An attribute's *identity* is the pair (table, column); the
//! data type and byte width ride along but never take part in equality or hashing. This
//! lets a condition written against a bare `T1.a` find the fully described attribute in
//! an operator's schema, and lets the distinct-value map be keyed by attributes.
//!
//! ## Conditions (`Condition`)
//! A single comparison from the WHERE clause. Selection conditions compare an attribute
//! with a literal (`T1.a = 5`); join conditions compare two attributes from different
//! tables (`T1.a = T2.b`).
//!
//! ## Join Algorithms (`JoinAlgorithm`)
//! The physical join methods an executor may run. Only the first
//! [`JoinAlgorithm::num_supported`] of them are costed by the estimator and offered to
//! the random plan builder.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Column data types known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Real,
    String,
    Time,
}

/// A column of a base table.
///
/// Equality and hashing only look at `table` and `column`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub table: String,
    pub column: String,
    pub data_type: DataType,
    /// Width of one value in bytes.
    pub size: u32,
}

impl Attribute {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        data_type: DataType,
        size: u32,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            data_type,
            size,
        }
    }

    /// An attribute reference as it comes out of the parser: no type information yet.
    pub fn named(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(table, column, DataType::Int, 0)
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.column == other.column
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Constant values that appear on the right of a selection condition.
///
/// Uses `OrderedFloat` for `f64` so that conditions (and therefore plan nodes) can
/// derive `Eq` and `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    Int(i64),
    Real(OrderedFloat<f64>),
    Utf8(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Real(v) => write!(f, "{}", v.0),
            ScalarValue::Utf8(v) => write!(f, "'{v}'"),
        }
    }
}

/// Comparison operators allowed in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Comparator {
    /// The comparator that keeps the condition true once both sides are swapped.
    pub fn mirrored(self) -> Self {
        match self {
            Comparator::Lt => Comparator::Gt,
            Comparator::LtEq => Comparator::GtEq,
            Comparator::Gt => Comparator::Lt,
            Comparator::GtEq => Comparator::LtEq,
            other => other,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Eq => "=",
            Comparator::NotEq => "!=",
            Comparator::Lt => "<",
            Comparator::LtEq => "<=",
            Comparator::Gt => ">",
            Comparator::GtEq => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Attribute compared with a literal.
    Select,
    /// Attribute compared with an attribute of another table.
    Join,
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Attribute(Attribute),
    Literal(ScalarValue),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Attribute(a) => write!(f, "{a}"),
            Operand::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// One comparison from the WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub comparator: Comparator,
    pub lhs: Attribute,
    pub rhs: Operand,
}

impl Condition {
    /// Selection condition `lhs <comparator> value`.
    pub fn select(lhs: Attribute, comparator: Comparator, value: ScalarValue) -> Self {
        Self {
            kind: ConditionKind::Select,
            comparator,
            lhs,
            rhs: Operand::Literal(value),
        }
    }

    /// Join condition `lhs <comparator> rhs` between two tables.
    pub fn join(lhs: Attribute, comparator: Comparator, rhs: Attribute) -> Self {
        Self {
            kind: ConditionKind::Join,
            comparator,
            lhs,
            rhs: Operand::Attribute(rhs),
        }
    }

    /// Right-hand attribute, if the condition compares two columns.
    pub fn rhs_attribute(&self) -> Option<&Attribute> {
        match &self.rhs {
            Operand::Attribute(a) => Some(a),
            Operand::Literal(_) => None,
        }
    }

    /// Swap the sides of a join condition, mirroring the comparator.
    ///
    /// Selection conditions are returned unchanged since a literal cannot move to the left.
    pub fn flipped(&self) -> Self {
        match &self.rhs {
            Operand::Attribute(rhs) => Self {
                kind: self.kind,
                comparator: self.comparator.mirrored(),
                lhs: rhs.clone(),
                rhs: Operand::Attribute(self.lhs.clone()),
            },
            Operand::Literal(_) => self.clone(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.comparator, self.rhs)
    }
}

/// Physical join methods.
///
/// The declaration order matters: the first `num_supported()` variants are the ones the
/// cost model can price and the random plan builder may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinAlgorithm {
    /// Page-oriented nested loop: every left page is joined against every right page.
    NestedLoop,
    /// Nested loop that reads the left input in blocks of `buffers - 2` pages.
    BlockNested,
    /// Sorts both inputs on the join key, then merges them.
    SortMerge,
    /// Known to executors, not priced by the cost model.
    Hash,
}

impl JoinAlgorithm {
    const SUPPORTED: [JoinAlgorithm; 3] = [
        JoinAlgorithm::NestedLoop,
        JoinAlgorithm::BlockNested,
        JoinAlgorithm::SortMerge,
    ];

    pub fn num_supported() -> usize {
        Self::SUPPORTED.len()
    }

    /// The supported algorithms, in declaration order.
    pub(crate) fn supported() -> &'static [JoinAlgorithm] {
        &Self::SUPPORTED
    }

    pub fn is_supported(self) -> bool {
        Self::SUPPORTED.contains(&self)
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinAlgorithm::NestedLoop => "NestedLoopJoin",
            JoinAlgorithm::BlockNested => "BlockNestedJoin",
            JoinAlgorithm::SortMerge => "SortMergeJoin",
            JoinAlgorithm::Hash => "HashJoin",
        };
        f.write_str(s)
    }
}
