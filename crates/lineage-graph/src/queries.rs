//! Read operations for verifying what the writer stored.
//!
//! Single-record lookups and counts only; lineage traversal is left to
//! downstream tooling.

use lineage_core::RelationKind;

use crate::client::{GraphClient, GraphError};

/// A `Table` node as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub name: String,
    pub database: Option<String>,
}

/// Provenance of a stored lineage edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
    pub query_id: Option<String>,
    pub timestamp: Option<String>,
}

impl GraphClient {
    /// Get a table node by name.
    pub async fn get_table(&self, name: &str) -> Result<Option<TableRecord>, GraphError> {
        let q = self
            .statement(
                "MATCH (t:Table {name: $name})
                 RETURN t.name AS name, t.database AS database",
            )
            .param("name", name.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(TableRecord {
                name: row.get::<String>("name").map_err(|e| {
                    GraphError::Serialization(format!("Failed to read table name: {e}"))
                })?,
                database: row.get::<String>("database").ok(),
            })),
            None => Ok(None),
        }
    }

    /// Get the edge of `kind` from `source` to `target`, if any.
    pub async fn get_edge(
        &self,
        source: &str,
        target: &str,
        kind: RelationKind,
    ) -> Result<Option<EdgeRecord>, GraphError> {
        let rel_type = kind.label();
        let cypher = format!(
            "MATCH (:Table {{name: $source}})-[r:{rel_type}]->(:Table {{name: $target}})
             RETURN r.queryId AS query_id, r.timestamp AS timestamp"
        );

        let q = self
            .statement(&cypher)
            .param("source", source.to_string())
            .param("target", target.to_string());

        Ok(self.query_one(q).await?.map(|row| EdgeRecord {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            query_id: row.get::<String>("query_id").ok(),
            timestamp: row.get::<String>("timestamp").ok(),
        }))
    }

    /// Count table nodes whose name starts with `prefix`.
    pub async fn count_tables_with_prefix(&self, prefix: &str) -> Result<i64, GraphError> {
        let q = self
            .statement(
                "MATCH (t:Table) WHERE t.name STARTS WITH $prefix
                 RETURN count(t) AS cnt",
            )
            .param("prefix", prefix.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Count edges between table nodes whose source name starts with `prefix`.
    pub async fn count_edges_with_prefix(&self, prefix: &str) -> Result<i64, GraphError> {
        let q = self
            .statement(
                "MATCH (s:Table)-[r]->(:Table) WHERE s.name STARTS WITH $prefix
                 RETURN count(r) AS cnt",
            )
            .param("prefix", prefix.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}
