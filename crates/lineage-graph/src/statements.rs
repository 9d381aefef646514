//! Cypher statements for the lineage graph.
//!
//! Relationship types cannot be parameterized in Cypher, so the merge
//! statement is rendered per relation kind from its static label.

use lineage_core::RelationKind;

/// Keeps `Table` lookups by name close to constant time.
pub const CREATE_TABLE_NAME_INDEX: &str =
    "CREATE INDEX table_name_index IF NOT EXISTS FOR (t:Table) ON (t.name)";

/// Deletes lineage edges whose `timestamp` is older than `$cutoff`.
///
/// Any relationship type, but only between `Table` nodes.
pub const DELETE_EXPIRED_EDGES: &str = "MATCH (:Table)-[r]->(:Table)
     WHERE r.timestamp IS NOT NULL
       AND localdatetime(r.timestamp) < localdatetime($cutoff)
     DELETE r
     RETURN count(r) AS deleted";

/// Upsert both table nodes and the edge between them.
///
/// Parameters: `$source_table`, `$target_table`, `$database_name`,
/// `$query_id`, `$timestamp`. `database` is only set when the source node is
/// created; edge provenance is overwritten on every write.
pub fn merge_relation(kind: RelationKind) -> String {
    let rel_type = kind.label();
    format!(
        "MERGE (source:Table {{name: $source_table}})
         ON CREATE SET source.database = $database_name
         MERGE (target:Table {{name: $target_table}})
         MERGE (source)-[r:{rel_type}]->(target)
         ON CREATE SET r.queryId = $query_id, r.timestamp = $timestamp
         ON MATCH SET r.queryId = $query_id, r.timestamp = $timestamp"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_uses_relation_label() {
        let cypher = merge_relation(RelationKind::FlowsTo);
        assert!(cypher.contains("MERGE (source)-[r:FLOWS_TO]->(target)"));
    }

    #[test]
    fn test_database_set_only_on_create() {
        let cypher = merge_relation(RelationKind::FlowsTo);
        assert!(cypher.contains("ON CREATE SET source.database = $database_name"));
        assert!(!cypher.contains("ON MATCH SET source.database"));
        assert!(!cypher.contains("target.database"));
    }

    #[test]
    fn test_provenance_set_on_create_and_match() {
        let cypher = merge_relation(RelationKind::FlowsTo);
        assert!(cypher.contains("ON CREATE SET r.queryId = $query_id, r.timestamp = $timestamp"));
        assert!(cypher.contains("ON MATCH SET r.queryId = $query_id, r.timestamp = $timestamp"));
    }

    #[test]
    fn test_sweep_is_scoped_to_table_edges() {
        assert!(DELETE_EXPIRED_EDGES.starts_with("MATCH (:Table)-[r]->(:Table)"));
        assert!(DELETE_EXPIRED_EDGES.contains("$cutoff"));
        assert!(DELETE_EXPIRED_EDGES.contains("count(r) AS deleted"));
    }

    #[test]
    fn test_index_is_conditional() {
        assert!(CREATE_TABLE_NAME_INDEX.contains("IF NOT EXISTS"));
        assert!(CREATE_TABLE_NAME_INDEX.contains("(t:Table) ON (t.name)"));
    }
}
