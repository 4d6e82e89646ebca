//! # Random Initial Plan
//!
//! Builds one executable plan for a query, choosing each join's physical algorithm at
//! random. A search loop starts from such plans and improves them by costing variations.
//!
//! ## Construction Pipeline
//!
//! Stages run in a fixed order. A stage is skipped when its clause is empty:
//!
//! 1. **Scan**: one `Scan` per table in the from-list, with the schema read from the catalog.
//! 2. **Select**: each selection wraps its table's current subtree, so conditions on the
//!    same table chain in list order.
//! 3. **Join**: join conditions are grouped by the (unordered) pair of tables they relate.
//!    Each pair becomes one `Join` holding all of that pair's conditions, with the
//!    lexicographically smaller table on the left.
//! 4. **GroupBy**, 5. **OrderBy**, 6. **Project**, 7. **Distinct**: each wraps the root.
//!
//! ## Frontier
//!
//! While building, every table maps to the subtree that currently represents it (its
//! *frontier*). Subtrees live in a slot map keyed by a stable id; tables map to ids. Wrapping
//! a subtree replaces the node in its slot, so every table that shared the slot sees the
//! new node without any reference comparison. A join stores its result in the left slot
//! and repoints the right operand's tables to it.
//!
//! ## Multi-way Joins
//!
//! Pairs are processed in ascending (left, right) order and the last join built becomes
//! the root. Chains and stars that are connected in that order produce one connected tree.
//! Join graphs with disconnected pairs (`A-B`, `C-D`) leave the earlier joins outside the
//! root; this builder does not search for a join order.

use crate::catalog::Catalog;
use crate::config::BufferConfig;
use crate::error::{PlanError, Result};
use crate::expr::{Condition, ConditionKind, JoinAlgorithm};
use crate::plan::PlanNode;
use crate::query::Query;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

type SubtreeId = usize;

/// Subtrees under construction, addressed by table name.
#[derive(Default)]
struct Frontier {
    subtrees: HashMap<SubtreeId, PlanNode>,
    by_table: HashMap<String, SubtreeId>,
    next_id: SubtreeId,
}

impl Frontier {
    fn insert(&mut self, table: &str, node: PlanNode) -> SubtreeId {
        let id = self.next_id;
        self.next_id += 1;
        self.subtrees.insert(id, node);
        self.by_table.insert(table.to_string(), id);
        id
    }

    fn id_of(&self, table: &str) -> Result<SubtreeId> {
        self.by_table
            .get(table)
            .copied()
            .ok_or_else(|| PlanError::UnknownTable(table.to_string()))
    }

    fn take(&mut self, id: SubtreeId) -> Result<PlanNode> {
        self.subtrees
            .remove(&id)
            .ok_or_else(|| PlanError::UnknownTable(format!("<subtree {id}>")))
    }

    fn put(&mut self, id: SubtreeId, node: PlanNode) {
        self.subtrees.insert(id, node);
    }

    /// Point every table currently represented by `from` at `to`.
    fn redirect(&mut self, from: SubtreeId, to: SubtreeId) {
        for id in self.by_table.values_mut() {
            if *id == from {
                *id = to;
            }
        }
    }
}

/// Builds random initial plans for one query.
pub struct RandomInitialPlan {
    query: Query,
    catalog: Arc<dyn Catalog>,
    buffers: BufferConfig,
    num_joins: usize,
}

impl RandomInitialPlan {
    pub fn new(query: Query, catalog: Arc<dyn Catalog>, buffers: BufferConfig) -> Self {
        Self {
            query,
            catalog,
            buffers,
            num_joins: 0,
        }
    }

    /// Number of joins (distinct table pairs) in the last prepared plan.
    pub fn num_joins(&self) -> usize {
        self.num_joins
    }

    /// Build one plan, drawing join algorithms from `rng`.
    pub fn prepare<R: Rng>(&mut self, rng: &mut R) -> Result<PlanNode> {
        if self.query.from.is_empty() {
            return Err(PlanError::NoTables);
        }
        self.num_joins = 0;

        let mut frontier = Frontier::default();
        let mut root = self.create_scans(&mut frontier)?;
        if let Some(id) = self.create_selects(&mut frontier)? {
            root = id;
        }
        if !self.query.joins.is_empty() {
            if let Some(id) = self.create_joins(&mut frontier, rng)? {
                root = id;
            }
        }

        let mut plan = frontier.take(root)?;
        if !self.query.group_by.is_empty() {
            plan = self.create_group_by(plan);
        }
        if !self.query.order_by.is_empty() {
            plan = self.create_order_by(plan);
        }
        if !self.query.projection.is_empty() {
            plan = self.create_project(plan)?;
        }
        if self.query.distinct {
            plan = self.create_distinct(plan);
        }

        debug!(
            tables = self.query.from.len(),
            joins = self.num_joins,
            root = ?plan.kind(),
            "Prepared initial plan"
        );
        Ok(plan)
    }

    /// Returns the subtree of the last table, the root when nothing else applies.
    fn create_scans(&self, frontier: &mut Frontier) -> Result<SubtreeId> {
        let mut last = 0;
        for table in &self.query.from {
            let schema = self.catalog.table_schema(table)?;
            let scan = PlanNode::Scan {
                table: table.clone(),
                schema,
            };
            last = frontier.insert(table, scan);
        }
        Ok(last)
    }

    fn create_selects(&self, frontier: &mut Frontier) -> Result<Option<SubtreeId>> {
        let mut last = None;
        for condition in &self.query.selections {
            if condition.kind != ConditionKind::Select {
                trace!(%condition, "skipping non-selection condition");
                continue;
            }
            let id = frontier.id_of(&condition.lhs.table)?;
            let base = frontier.take(id)?;
            let schema = base.schema().clone();
            frontier.put(
                id,
                PlanNode::Select {
                    base: Box::new(base),
                    condition: condition.clone(),
                    schema,
                },
            );
            last = Some(id);
        }
        Ok(last)
    }

    /// Join conditions keyed by (left table, right table), left < right.
    fn group_join_conditions(&self) -> Result<BTreeMap<(String, String), Vec<Condition>>> {
        let mut groups: BTreeMap<(String, String), Vec<Condition>> = BTreeMap::new();
        for condition in &self.query.joins {
            let rhs = condition
                .rhs_attribute()
                .ok_or_else(|| PlanError::InvalidJoinCondition(condition.to_string()))?;
            let (key, stored) = if condition.lhs.table > rhs.table {
                ((rhs.table.clone(), condition.lhs.table.clone()), condition.flipped())
            } else {
                ((condition.lhs.table.clone(), rhs.table.clone()), condition.clone())
            };
            groups.entry(key).or_default().push(stored);
        }
        Ok(groups)
    }

    fn create_joins<R: Rng>(
        &mut self,
        frontier: &mut Frontier,
        rng: &mut R,
    ) -> Result<Option<SubtreeId>> {
        let mut last = None;
        for ((left_table, right_table), conditions) in self.group_join_conditions()? {
            let left_id = frontier.id_of(&left_table)?;
            let right_id = frontier.id_of(&right_table)?;
            let left = frontier.take(left_id)?;
            // Both tables already sit in one subtree: join it with a copy of itself.
            let right = if right_id == left_id {
                left.clone()
            } else {
                frontier.take(right_id)?
            };

            let supported = JoinAlgorithm::supported();
            let algorithm = supported[rng.gen_range(0..supported.len())];
            let node_index = self.num_joins;
            self.num_joins += 1;
            trace!(
                node_index,
                left = %left_table,
                right = %right_table,
                conditions = conditions.len(),
                %algorithm,
                "join"
            );

            let schema = left.schema().join_with(right.schema());
            frontier.put(
                left_id,
                PlanNode::Join {
                    left: Box::new(left),
                    right: Box::new(right),
                    conditions,
                    algorithm,
                    node_index,
                    schema,
                },
            );
            frontier.redirect(right_id, left_id);
            last = Some(left_id);
        }
        Ok(last)
    }

    fn create_group_by(&self, base: PlanNode) -> PlanNode {
        let schema = base.schema().clone();
        PlanNode::GroupBy {
            base: Box::new(base),
            columns: self.query.group_by.clone(),
            buffer_count: self.buffers.num_buffers,
            schema,
        }
    }

    fn create_order_by(&self, base: PlanNode) -> PlanNode {
        let schema = base.schema().clone();
        PlanNode::OrderBy {
            base: Box::new(base),
            columns: self.query.order_by.clone(),
            ascending: self.query.ascending,
            buffer_count: self.buffers.num_buffers,
            schema,
        }
    }

    fn create_project(&self, base: PlanNode) -> Result<PlanNode> {
        let schema = base.schema().sub_schema(&self.query.projection)?;
        Ok(PlanNode::Project {
            base: Box::new(base),
            columns: self.query.projection.clone(),
            schema,
        })
    }

    fn create_distinct(&self, base: PlanNode) -> PlanNode {
        let columns = if self.query.projection.is_empty() {
            None
        } else {
            Some(self.query.projection.clone())
        };
        let schema = base.schema().clone();
        PlanNode::Distinct {
            base: Box::new(base),
            columns,
            buffer_count: self.buffers.num_buffers,
            schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::expr::{Attribute, Comparator, DataType, ScalarValue};
    use crate::plan::PlanNodeKind;
    use crate::schema::Schema;
    use crate::stats::TableStatistics;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn catalog(tables: &[&str]) -> Arc<InMemoryCatalog> {
        let mut c = InMemoryCatalog::new();
        for t in tables {
            let schema = Schema::new(vec![
                Attribute::new(*t, "id", DataType::Int, 4),
                Attribute::new(*t, "val", DataType::String, 20),
            ]);
            c.add_table(t, schema, TableStatistics::new(100, vec![100, 10]));
        }
        Arc::new(c)
    }

    fn eq_join(l: &str, r: &str) -> Condition {
        Condition::join(Attribute::named(l, "id"), Comparator::Eq, Attribute::named(r, "id"))
    }

    fn eq_select(t: &str, v: i64) -> Condition {
        Condition::select(Attribute::named(t, "val"), Comparator::Eq, ScalarValue::Int(v))
    }

    fn build(query: Query, tables: &[&str], seed: u64) -> (PlanNode, usize) {
        let mut builder = RandomInitialPlan::new(query, catalog(tables), BufferConfig::default());
        let mut rng = StdRng::seed_from_u64(seed);
        let plan = builder.prepare(&mut rng).unwrap();
        (plan, builder.num_joins())
    }

    #[test]
    fn test_no_join_conditions_means_no_join() {
        let query = Query::new(["T1"]).with_selection(eq_select("T1", 3));
        let (plan, joins) = build(query, &["T1"], 1);
        assert_eq!(joins, 0);
        assert_eq!(plan.count(PlanNodeKind::Join), 0);
        assert!(matches!(&plan, PlanNode::Select { base, .. } if base.kind() == PlanNodeKind::Scan));
    }

    #[test]
    fn test_single_table_root_is_scan() {
        let (plan, _) = build(Query::new(["T1"]), &["T1"], 1);
        assert!(matches!(plan, PlanNode::Scan { ref table, .. } if table == "T1"));
    }

    #[test]
    fn test_single_join_is_canonicalized() {
        let query = Query::new(["T2", "T1"])
            .with_selection(eq_select("T1", 5))
            .with_join(Condition::join(
                Attribute::named("T2", "id"),
                Comparator::Lt,
                Attribute::named("T1", "id"),
            ));
        let (plan, joins) = build(query, &["T1", "T2"], 3);
        assert_eq!(joins, 1);
        assert_eq!(plan.count(PlanNodeKind::Join), 1);

        let PlanNode::Join { left, right, conditions, algorithm, schema, .. } = &plan else {
            panic!("expected a join at the root, got {plan}");
        };
        assert!(algorithm.is_supported());
        // Filtered T1 on the left, raw T2 on the right.
        assert!(matches!(left.as_ref(), PlanNode::Select { .. }));
        assert!(matches!(right.as_ref(), PlanNode::Scan { table, .. } if table == "T2"));
        assert_eq!(conditions[0].lhs, Attribute::named("T1", "id"));
        assert_eq!(conditions[0].comparator, Comparator::Gt);
        assert_eq!(schema.attributes()[0], Attribute::named("T1", "id"));
        assert_eq!(schema.num_cols(), 4);
    }

    #[test]
    fn test_conditions_on_same_pair_share_one_join() {
        let query = Query::new(["A", "B"])
            .with_join(eq_join("A", "B"))
            .with_join(Condition::join(
                Attribute::named("B", "val"),
                Comparator::Eq,
                Attribute::named("A", "val"),
            ));
        let (plan, joins) = build(query, &["A", "B"], 9);
        assert_eq!(joins, 1);
        let PlanNode::Join { conditions, .. } = &plan else {
            panic!("expected a join");
        };
        assert_eq!(conditions.len(), 2);
        assert!(conditions.iter().all(|c| c.lhs.table == "A"));
    }

    #[test]
    fn test_chain_builds_connected_tree() {
        let query = Query::new(["A", "B", "C"])
            .with_join(eq_join("B", "C"))
            .with_join(eq_join("A", "B"));
        let (plan, joins) = build(query, &["A", "B", "C"], 5);
        assert_eq!(joins, 2);
        assert_eq!(plan.count(PlanNodeKind::Scan), 3);
        let PlanNode::Join { left, node_index, .. } = &plan else {
            panic!("expected a join");
        };
        assert_eq!(*node_index, 1);
        assert!(matches!(left.as_ref(), PlanNode::Join { node_index: 0, .. }));
    }

    #[test]
    fn test_disconnected_pairs_keep_last_join_as_root() {
        let query = Query::new(["A", "B", "C", "D"])
            .with_join(eq_join("C", "D"))
            .with_join(eq_join("A", "B"));
        let (plan, joins) = build(query, &["A", "B", "C", "D"], 5);
        assert_eq!(joins, 2);
        assert_eq!(plan.count(PlanNodeKind::Join), 1);
        let tables: HashSet<_> = plan.schema().attributes().iter().map(|a| a.table.clone()).collect();
        assert_eq!(tables, HashSet::from(["C".to_string(), "D".to_string()]));
    }

    #[test]
    fn test_cycle_copies_shared_subtree() {
        let query = Query::new(["A", "B", "C"])
            .with_join(eq_join("A", "B"))
            .with_join(eq_join("A", "C"))
            .with_join(eq_join("B", "C"));
        let (plan, joins) = build(query, &["A", "B", "C"], 11);
        assert_eq!(joins, 3);
        // (A,B) -> j0; (A,C) -> j1(j0, C); (B,C) -> j2(j1, copy of j1).
        assert_eq!(plan.count(PlanNodeKind::Join), 5);
        assert_eq!(plan.count(PlanNodeKind::Scan), 6);
    }

    #[test]
    fn test_clause_wrapping_order() {
        let id = Attribute::named("T1", "id");
        let val = Attribute::named("T1", "val");
        let query = Query::new(["T1"])
            .with_group_by(vec![val.clone()])
            .with_order_by(vec![id.clone()], false)
            .with_projection(vec![val.clone(), id.clone()])
            .with_distinct(true);
        let (plan, _) = build(query, &["T1"], 1);

        let PlanNode::Distinct { base, columns, .. } = &plan else {
            panic!("expected distinct at the root");
        };
        assert_eq!(columns.as_deref(), Some(&[val.clone(), id.clone()][..]));
        let PlanNode::Project { base, schema, .. } = base.as_ref() else {
            panic!("expected project under distinct");
        };
        assert_eq!(schema.attributes(), &[val.clone(), id.clone()]);
        let PlanNode::OrderBy { base, ascending, buffer_count, .. } = base.as_ref() else {
            panic!("expected order by under project");
        };
        assert!(!ascending);
        assert_eq!(*buffer_count, BufferConfig::default().num_buffers);
        assert!(matches!(base.as_ref(), PlanNode::GroupBy { .. }));
    }

    #[test]
    fn test_distinct_without_projection_uses_full_tuple() {
        let (plan, _) = build(Query::new(["T1"]).with_distinct(true), &["T1"], 1);
        assert!(matches!(plan, PlanNode::Distinct { columns: None, .. }));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let query = Query::new(["A", "B", "C", "D"])
            .with_join(eq_join("A", "B"))
            .with_join(eq_join("B", "C"))
            .with_join(eq_join("C", "D"));
        let (first, _) = build(query.clone(), &["A", "B", "C", "D"], 42);
        let (second, _) = build(query, &["A", "B", "C", "D"], 42);
        assert_eq!(first, second);
    }

    #[test]
    fn test_algorithms_drawn_from_supported_set() {
        let query = Query::new(["A", "B"]).with_join(eq_join("A", "B"));
        let mut seen = HashSet::new();
        for seed in 0..64 {
            let (plan, _) = build(query.clone(), &["A", "B"], seed);
            if let PlanNode::Join { algorithm, .. } = plan {
                assert!(algorithm.is_supported());
                seen.insert(algorithm);
            }
        }
        assert_eq!(seen.len(), JoinAlgorithm::num_supported());
    }

    #[test]
    fn test_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut empty = RandomInitialPlan::new(Query::new(Vec::<String>::new()), catalog(&[]), BufferConfig::default());
        assert!(matches!(empty.prepare(&mut rng), Err(PlanError::NoTables)));

        let mut unknown_schema = RandomInitialPlan::new(Query::new(["T9"]), catalog(&[]), BufferConfig::default());
        assert!(matches!(unknown_schema.prepare(&mut rng), Err(PlanError::Catalog(_))));

        let query = Query::new(["T1"]).with_selection(eq_select("T2", 1));
        let mut unknown_table = RandomInitialPlan::new(query, catalog(&["T1"]), BufferConfig::default());
        assert!(matches!(unknown_table.prepare(&mut rng), Err(PlanError::UnknownTable(t)) if t == "T2"));

        let query = Query::new(["T1"]).with_projection(vec![Attribute::named("T1", "nope")]);
        let mut bad_projection = RandomInitialPlan::new(query, catalog(&["T1"]), BufferConfig::default());
        assert!(matches!(bad_projection.prepare(&mut rng), Err(PlanError::UnknownAttribute(_))));
    }
}
