//! In-memory lineage graph with the same merge semantics as the Neo4j writer.
//!
//! Used to exercise the hook, the sweeper, and the end-to-end properties
//! without a running server.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

use lineage_core::types::local_now;
use lineage_core::{Relation, RelationKind};

use crate::client::GraphError;
use crate::sink::{EdgeReaper, LineageSink};

/// A `Table` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTable {
    pub database: Option<String>,
}

/// Provenance attributes of a lineage edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEdge {
    pub query_id: String,
    pub timestamp: NaiveDateTime,
}

type EdgeKey = (String, String, RelationKind);

#[derive(Default)]
struct State {
    tables: BTreeMap<String, MemoryTable>,
    edges: BTreeMap<EdgeKey, MemoryEdge>,
    write_failures: VecDeque<GraphError>,
    sweep_failures: VecDeque<GraphError>,
    write_calls: usize,
    sweep_calls: usize,
}

#[derive(Default)]
pub struct MemoryGraph {
    state: Mutex<State>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch as if written at `at`. All-or-nothing.
    pub fn write_batch_at(
        &self,
        relations: &[Relation],
        at: NaiveDateTime,
    ) -> Result<(), GraphError> {
        if relations.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock();
        state.write_calls += 1;
        if let Some(e) = state.write_failures.pop_front() {
            return Err(e);
        }

        for relation in relations {
            state
                .tables
                .entry(relation.source_table.clone())
                .or_insert_with(|| MemoryTable {
                    database: Some(relation.database_name.clone()),
                });
            state
                .tables
                .entry(relation.target_table.clone())
                .or_insert(MemoryTable { database: None });

            let key = (
                relation.source_table.clone(),
                relation.target_table.clone(),
                relation.kind,
            );
            state.edges.insert(
                key,
                MemoryEdge {
                    query_id: relation.correlation_id.clone(),
                    timestamp: at,
                },
            );
        }

        Ok(())
    }

    /// Make the next write batches fail with the given errors, in order.
    pub fn fail_next_writes(&self, errors: impl IntoIterator<Item = GraphError>) {
        self.state.lock().write_failures.extend(errors);
    }

    pub fn fail_next_sweep(&self, error: GraphError) {
        self.state.lock().sweep_failures.push_back(error);
    }

    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.state.lock().tables.get(name).cloned()
    }

    pub fn edge(&self, source: &str, target: &str, kind: RelationKind) -> Option<MemoryEdge> {
        let key = (source.to_string(), target.to_string(), kind);
        self.state.lock().edges.get(&key).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().tables.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().edges.len()
    }

    /// Store round trips attempted by `write_batch`, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    pub fn sweep_calls(&self) -> usize {
        self.state.lock().sweep_calls
    }
}

#[async_trait]
impl LineageSink for MemoryGraph {
    async fn write_batch(&self, relations: &[Relation]) -> Result<(), GraphError> {
        self.write_batch_at(relations, local_now())
    }
}

#[async_trait]
impl EdgeReaper for MemoryGraph {
    async fn delete_edges_before(&self, cutoff: NaiveDateTime) -> Result<u64, GraphError> {
        let mut state = self.state.lock();
        state.sweep_calls += 1;
        if let Some(e) = state.sweep_failures.pop_front() {
            return Err(e);
        }

        let before = state.edges.len();
        state.edges.retain(|_, edge| edge.timestamp >= cutoff);
        Ok((before - state.edges.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn test_same_relation_twice_is_one_edge() {
        let graph = MemoryGraph::new();
        let t0 = local_now() - TimeDelta::minutes(5);
        let t1 = local_now();

        graph
            .write_batch_at(&[Relation::flows_to("a", "b", "q1", "db")], t0)
            .unwrap();
        graph
            .write_batch_at(&[Relation::flows_to("a", "b", "q2", "db")], t1)
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("a", "b", RelationKind::FlowsTo).unwrap();
        assert_eq!(edge.query_id, "q2");
        assert_eq!(edge.timestamp, t1);
    }

    #[test]
    fn test_database_kept_from_creation() {
        let graph = MemoryGraph::new();
        let now = local_now();

        graph
            .write_batch_at(&[Relation::flows_to("a", "b", "q1", "db1")], now)
            .unwrap();
        graph
            .write_batch_at(&[Relation::flows_to("a", "c", "q2", "db9")], now)
            .unwrap();

        assert_eq!(graph.table("a").unwrap().database.as_deref(), Some("db1"));
        assert_eq!(graph.table("b").unwrap().database, None);
    }

    #[test]
    fn test_failed_batch_applies_nothing() {
        let graph = MemoryGraph::new();
        graph.fail_next_writes([GraphError::Connection("refused".into())]);

        let batch = [
            Relation::flows_to("a", "c", "q1", "db"),
            Relation::flows_to("b", "c", "q1", "db"),
        ];
        assert!(graph.write_batch_at(&batch, local_now()).is_err());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);

        graph.write_batch_at(&batch, local_now()).unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.write_calls(), 2);
    }

    #[test]
    fn test_empty_batch_not_counted() {
        let graph = MemoryGraph::new();
        graph.write_batch_at(&[], local_now()).unwrap();
        assert_eq!(graph.write_calls(), 0);
    }
}
