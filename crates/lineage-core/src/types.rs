//! Core domain types for table lineage.
//!
//! A statement execution reads some tables and writes others; every
//! (read, write) pair becomes a [`Relation`] that is later merged into the
//! graph as two `Table` nodes joined by a typed edge.

use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Table References ──────────────────────────────────────────────

/// Kind of entity the host engine reports in a read or write set.
///
/// Only [`EntityKind::Table`] takes part in lineage; everything else is
/// dropped during extraction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Database,
    #[default]
    Table,
    Partition,
    DummyPartition,
    DfsDir,
    LocalDir,
    Function,
}

/// A table-like entity read or written by a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Qualified table name, kept verbatim (`db.table` or bare `table`).
    pub name: String,
    /// Logical database the table belongs to.
    pub database: String,
    pub kind: EntityKind,
}

impl TableRef {
    /// A plain table entity.
    pub fn table(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self::of_kind(EntityKind::Table, database, name)
    }

    pub fn of_kind(kind: EntityKind, database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            kind,
        }
    }

    pub fn is_table(&self) -> bool {
        self.kind == EntityKind::Table
    }

    /// The table name without any database qualifier.
    pub fn unqualified_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

// ── Relations ─────────────────────────────────────────────────────

/// Type of lineage edge between two tables.
///
/// New kinds only need a label; the writer's merge contract does not change.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    /// Data read from the source table is written into the target table.
    FlowsTo,
}

impl RelationKind {
    /// Relationship type used in Cypher.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FlowsTo => "FLOWS_TO",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A directed lineage record produced by one statement execution.
///
/// Identity is `(source_table, target_table, kind)`. The correlation id
/// is provenance only and does not participate in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub source_table: String,
    pub target_table: String,
    pub kind: RelationKind,
    /// Groups every relation of one statement execution.
    pub correlation_id: String,
    /// Database of the source table; recorded on the source node at creation.
    pub database_name: String,
}

impl Relation {
    pub fn new(
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        kind: RelationKind,
        correlation_id: impl Into<String>,
        database_name: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
            kind,
            correlation_id: correlation_id.into(),
            database_name: database_name.into(),
        }
    }

    /// Shorthand for a `FLOWS_TO` relation.
    pub fn flows_to(
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        correlation_id: impl Into<String>,
        database_name: impl Into<String>,
    ) -> Self {
        Self::new(
            source_table,
            target_table,
            RelationKind::FlowsTo,
            correlation_id,
            database_name,
        )
    }

    pub fn identity(&self) -> (&str, &str, RelationKind) {
        (&self.source_table, &self.target_table, self.kind)
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Relation {}

impl Hash for Relation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.source_table, self.kind, self.target_table
        )
    }
}

// ── Provenance Timestamps ─────────────────────────────────────────

/// Format used for the `timestamp` edge attribute: ISO-8601 local
/// date-time without offset, millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Render a local date-time as an edge `timestamp` value.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current wall-clock time in the local zone, as stored on edges.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn relation_identity_ignores_provenance() {
        let a = Relation::flows_to("db1.a", "db2.b", "q1", "db1");
        let b = Relation::flows_to("db1.a", "db2.b", "q2", "other");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn relation_direction_is_part_of_identity() {
        let forward = Relation::flows_to("a", "b", "q1", "db");
        let backward = Relation::flows_to("b", "a", "q1", "db");
        assert_ne!(forward, backward);
    }

    #[test]
    fn relation_kind_serializes_as_label() {
        let json = serde_json::to_string(&RelationKind::FlowsTo).unwrap();
        assert_eq!(json, "\"FLOWS_TO\"");
        assert_eq!(RelationKind::FlowsTo.label(), "FLOWS_TO");
    }

    #[test]
    fn unqualified_name_strips_database() {
        assert_eq!(TableRef::table("db1", "db1.tmp_x").unqualified_name(), "tmp_x");
        assert_eq!(TableRef::table("db1", "orders").unqualified_name(), "orders");
    }

    #[test]
    fn timestamp_has_no_offset() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_milli_opt(7, 8, 9, 42)
            .unwrap();
        assert_eq!(format_timestamp(at), "2024-03-05T07:08:09.042");
    }
}
