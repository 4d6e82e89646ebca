//! Output schema of a plan node: ordered attributes plus the byte size of one tuple.

use crate::error::{PlanError, Result};
use crate::expr::Attribute;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
    tuple_size: u64,
}

impl Schema {
    /// Schema whose tuple size is the sum of its attribute widths.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let tuple_size = attributes.iter().map(|a| u64::from(a.size)).sum();
        Self {
            attributes,
            tuple_size,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn num_cols(&self) -> usize {
        self.attributes.len()
    }

    pub fn tuple_size(&self) -> u64 {
        self.tuple_size
    }

    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn index_of(&self, attr: &Attribute) -> Option<usize> {
        self.attributes.iter().position(|a| a == attr)
    }

    /// The schema's own copy of `attr`, carrying type and width.
    pub fn resolve(&self, attr: &Attribute) -> Result<&Attribute> {
        self.attributes
            .iter()
            .find(|a| *a == attr)
            .ok_or_else(|| PlanError::UnknownAttribute(attr.clone()))
    }

    /// Output schema of a join: left attributes followed by right attributes.
    pub fn join_with(&self, right: &Schema) -> Schema {
        let mut attributes = Vec::with_capacity(self.num_cols() + right.num_cols());
        attributes.extend(self.attributes.iter().cloned());
        attributes.extend(right.attributes.iter().cloned());
        Schema {
            attributes,
            tuple_size: self.tuple_size + right.tuple_size,
        }
    }

    /// Restrict to `columns`, in the order given.
    pub fn sub_schema(&self, columns: &[Attribute]) -> Result<Schema> {
        let attributes = columns
            .iter()
            .map(|c| self.resolve(c).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::DataType;

    fn schema(table: &str, cols: &[(&str, u32)]) -> Schema {
        Schema::new(
            cols.iter()
                .map(|(c, size)| Attribute::new(table, *c, DataType::Int, *size))
                .collect(),
        )
    }

    #[test]
    fn test_join_with_concatenates() {
        let left = schema("T1", &[("a", 4), ("b", 8)]);
        let right = schema("T2", &[("c", 16)]);
        let joined = left.join_with(&right);
        assert_eq!(joined.num_cols(), 3);
        assert_eq!(joined.tuple_size(), 28);
        assert_eq!(joined.index_of(&Attribute::named("T2", "c")), Some(2));
    }

    #[test]
    fn test_sub_schema_keeps_projection_order() {
        let s = schema("T1", &[("a", 4), ("b", 8), ("c", 2)]);
        let projected = s
            .sub_schema(&[Attribute::named("T1", "c"), Attribute::named("T1", "a")])
            .unwrap();
        let names: Vec<_> = projected.attributes().iter().map(|a| a.column.as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);
        assert_eq!(projected.tuple_size(), 6);
    }

    #[test]
    fn test_sub_schema_unknown_column() {
        let s = schema("T1", &[("a", 4)]);
        let err = s.sub_schema(&[Attribute::named("T1", "zz")]).unwrap_err();
        assert!(matches!(err, PlanError::UnknownAttribute(a) if a.column == "zz"));
    }
}
