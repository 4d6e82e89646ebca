//! The clauses of a parsed query, as handed to the plan builder by the SQL front end.

use crate::expr::{Attribute, Condition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub from: Vec<String>,
    pub selections: Vec<Condition>,
    pub joins: Vec<Condition>,
    pub group_by: Vec<Attribute>,
    pub order_by: Vec<Attribute>,
    pub projection: Vec<Attribute>,
    pub distinct: bool,
    pub ascending: bool,
}

impl Query {
    /// `SELECT * FROM <tables>` with no further clauses.
    pub fn new<S: Into<String>>(tables: impl IntoIterator<Item = S>) -> Self {
        Self {
            from: tables.into_iter().map(Into::into).collect(),
            selections: Vec::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            projection: Vec::new(),
            distinct: false,
            ascending: true,
        }
    }

    pub fn with_selection(mut self, condition: Condition) -> Self {
        self.selections.push(condition);
        self
    }

    pub fn with_join(mut self, condition: Condition) -> Self {
        self.joins.push(condition);
        self
    }

    pub fn with_group_by(mut self, columns: Vec<Attribute>) -> Self {
        self.group_by = columns;
        self
    }

    pub fn with_order_by(mut self, columns: Vec<Attribute>, ascending: bool) -> Self {
        self.order_by = columns;
        self.ascending = ascending;
        self
    }

    pub fn with_projection(mut self, columns: Vec<Attribute>) -> Self {
        self.projection = columns;
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}
