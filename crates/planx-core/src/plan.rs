//! # Plan Trees
//!
//! A plan is a tree of `PlanNode`s. Each node owns its children (`Box<PlanNode>`) and
//! its resolved output `Schema`, so the cost estimator never has to recompute schemas
//! and no two parents can share a subtree.
//!
//! ## Operators
//!
//! | node       | children | cost model                               |
//! |------------|----------|------------------------------------------|
//! | `Scan`     | 0        | read every page of the table             |
//! | `Select`   | 1        | pipelined, free                          |
//! | `Project`  | 1        | on the fly, free                         |
//! | `Join`     | 2        | depends on `JoinAlgorithm`               |
//! | `GroupBy`  | 1        | external merge sort                      |
//! | `OrderBy`  | 1        | external merge sort                      |
//! | `Distinct` | 1        | external merge sort                      |
//! | `Sort`     | 1        | external merge sort                      |
//! | `Other`    | 0 or 1   | unknown to the cost model: infeasible    |
//!
//! `Other` stands for operator kinds an executor may add that this cost model cannot
//! price. It lets such plans flow through the optimizer and be rejected at costing time.

use crate::expr::{Attribute, Condition, JoinAlgorithm};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanNode {
    Scan {
        table: String,
        schema: Schema,
    },
    Select {
        base: Box<PlanNode>,
        condition: Condition,
        schema: Schema,
    },
    Project {
        base: Box<PlanNode>,
        columns: Vec<Attribute>,
        schema: Schema,
    },
    Join {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        conditions: Vec<Condition>,
        algorithm: JoinAlgorithm,
        /// Position of this join in build order; lets a search loop address it.
        node_index: usize,
        schema: Schema,
    },
    GroupBy {
        base: Box<PlanNode>,
        columns: Vec<Attribute>,
        buffer_count: u64,
        schema: Schema,
    },
    OrderBy {
        base: Box<PlanNode>,
        columns: Vec<Attribute>,
        ascending: bool,
        buffer_count: u64,
        schema: Schema,
    },
    Distinct {
        base: Box<PlanNode>,
        /// `None` deduplicates on the whole tuple.
        columns: Option<Vec<Attribute>>,
        buffer_count: u64,
        schema: Schema,
    },
    Sort {
        base: Box<PlanNode>,
        columns: Vec<Attribute>,
        buffer_count: u64,
        schema: Schema,
    },
    Other {
        operator: String,
        base: Option<Box<PlanNode>>,
        schema: Schema,
    },
}

/// Kind discriminant, without the node's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanNodeKind {
    Scan,
    Select,
    Project,
    Join,
    GroupBy,
    OrderBy,
    Distinct,
    Sort,
    Other,
}

impl PlanNode {
    pub fn kind(&self) -> PlanNodeKind {
        match self {
            PlanNode::Scan { .. } => PlanNodeKind::Scan,
            PlanNode::Select { .. } => PlanNodeKind::Select,
            PlanNode::Project { .. } => PlanNodeKind::Project,
            PlanNode::Join { .. } => PlanNodeKind::Join,
            PlanNode::GroupBy { .. } => PlanNodeKind::GroupBy,
            PlanNode::OrderBy { .. } => PlanNodeKind::OrderBy,
            PlanNode::Distinct { .. } => PlanNodeKind::Distinct,
            PlanNode::Sort { .. } => PlanNodeKind::Sort,
            PlanNode::Other { .. } => PlanNodeKind::Other,
        }
    }

    pub fn schema(&self) -> &Schema {
        match self {
            PlanNode::Scan { schema, .. }
            | PlanNode::Select { schema, .. }
            | PlanNode::Project { schema, .. }
            | PlanNode::Join { schema, .. }
            | PlanNode::GroupBy { schema, .. }
            | PlanNode::OrderBy { schema, .. }
            | PlanNode::Distinct { schema, .. }
            | PlanNode::Sort { schema, .. }
            | PlanNode::Other { schema, .. } => schema,
        }
    }

    /// Child nodes, left before right.
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::Scan { .. } => vec![],
            PlanNode::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            PlanNode::Select { base, .. }
            | PlanNode::Project { base, .. }
            | PlanNode::GroupBy { base, .. }
            | PlanNode::OrderBy { base, .. }
            | PlanNode::Distinct { base, .. }
            | PlanNode::Sort { base, .. } => vec![base.as_ref()],
            PlanNode::Other { base, .. } => base.iter().map(|b| b.as_ref()).collect(),
        }
    }

    /// Number of nodes of `kind` in this tree.
    pub fn count(&self, kind: PlanNodeKind) -> usize {
        let own = usize::from(self.kind() == kind);
        own + self.children().into_iter().map(|c| c.count(kind)).sum::<usize>()
    }

    /// The join with the given `node_index`, for mutation by a search loop.
    pub fn join_mut(&mut self, index: usize) -> Option<&mut PlanNode> {
        if matches!(self, PlanNode::Join { node_index, .. } if *node_index == index) {
            return Some(self);
        }
        match self {
            PlanNode::Scan { .. } => None,
            PlanNode::Join { left, right, .. } => match left.join_mut(index) {
                Some(found) => Some(found),
                None => right.join_mut(index),
            },
            PlanNode::Select { base, .. }
            | PlanNode::Project { base, .. }
            | PlanNode::GroupBy { base, .. }
            | PlanNode::OrderBy { base, .. }
            | PlanNode::Distinct { base, .. }
            | PlanNode::Sort { base, .. } => base.join_mut(index),
            PlanNode::Other { base, .. } => base.as_mut().and_then(|b| b.join_mut(index)),
        }
    }

    /// Change the algorithm of the join with `node_index`. Returns the previous algorithm.
    pub fn set_join_algorithm(
        &mut self,
        index: usize,
        new_algorithm: JoinAlgorithm,
    ) -> Option<JoinAlgorithm> {
        match self.join_mut(index)? {
            PlanNode::Join { algorithm, .. } => Some(std::mem::replace(algorithm, new_algorithm)),
            _ => None,
        }
    }

    /// Indented, one-line-per-node rendering of the tree.
    pub fn display(&self, indent: usize) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, indent);
        out
    }

    fn write_tree(&self, out: &mut String, indent: usize) {
        out.push_str(&"  ".repeat(indent));
        out.push_str(&self.label());
        out.push('\n');
        for child in self.children() {
            child.write_tree(out, indent + 1);
        }
    }

    fn label(&self) -> String {
        match self {
            PlanNode::Scan { table, .. } => format!("Scan({table})"),
            PlanNode::Select { condition, .. } => format!("Select({condition})"),
            PlanNode::Project { columns, .. } => format!("Project({})", join_names(columns)),
            PlanNode::Join {
                conditions,
                algorithm,
                node_index,
                ..
            } => {
                let conds: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                format!("{algorithm}#{node_index}({})", conds.join(" AND "))
            }
            PlanNode::GroupBy { columns, .. } => format!("GroupBy({})", join_names(columns)),
            PlanNode::OrderBy {
                columns, ascending, ..
            } => format!(
                "OrderBy({} {})",
                join_names(columns),
                if *ascending { "ASC" } else { "DESC" }
            ),
            PlanNode::Distinct { columns, .. } => match columns {
                Some(cols) => format!("Distinct({})", join_names(cols)),
                None => "Distinct(*)".to_string(),
            },
            PlanNode::Sort { columns, .. } => format!("Sort({})", join_names(columns)),
            PlanNode::Other { operator, .. } => format!("{operator}(?)"),
        }
    }
}

fn join_names(columns: &[Attribute]) -> String {
    columns
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(0))
    }
}
