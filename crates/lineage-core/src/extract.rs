//! Relation extraction: read set × write set → `FLOWS_TO` relations.
//!
//! Pure and deterministic. Non-table entities are dropped silently, as are
//! temp tables when a prefix filter is configured.

use std::collections::HashSet;

use crate::config::LineageConfig;
use crate::error::{LineageError, Result};
use crate::types::{Relation, RelationKind, TableRef};

/// Turns the tables touched by a statement into lineage relations.
#[derive(Debug, Clone, Default)]
pub struct RelationExtractor {
    temp_prefixes: Vec<String>,
}

impl RelationExtractor {
    /// Extractor that keeps every table entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor honouring `ignore_temp_tables` / `temp_table_prefixes`.
    pub fn from_config(config: &LineageConfig) -> Self {
        if config.ignore_temp_tables {
            Self::new().with_temp_prefixes(config.temp_table_prefixes.iter().cloned())
        } else {
            Self::new()
        }
    }

    /// Drop tables whose unqualified name starts with any of `prefixes`.
    pub fn with_temp_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.temp_prefixes = prefixes
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Produce one `FLOWS_TO` relation per (input table, output table) pair.
    ///
    /// Relations are ordered by output table, then input table, each in the
    /// order first seen. Either side being empty yields an empty result.
    pub fn extract(
        &self,
        inputs: &[TableRef],
        outputs: &[TableRef],
        correlation_id: &str,
    ) -> Result<Vec<Relation>> {
        if correlation_id.trim().is_empty() {
            return Err(LineageError::InvalidArgument(
                "correlation id must not be empty".to_string(),
            ));
        }

        let sources = self.lineage_tables(inputs)?;
        let targets = self.lineage_tables(outputs)?;

        tracing::debug!(
            correlation_id,
            inputs = sources.len(),
            outputs = targets.len(),
            "Filtered statement tables"
        );

        let mut relations = Vec::with_capacity(sources.len() * targets.len());
        for target in &targets {
            for source in &sources {
                relations.push(Relation::new(
                    source.name.clone(),
                    target.name.clone(),
                    RelationKind::FlowsTo,
                    correlation_id,
                    source.database.clone(),
                ));
            }
        }

        Ok(relations)
    }

    /// Table entities that take part in lineage, deduplicated by name.
    fn lineage_tables<'a>(&self, entities: &'a [TableRef]) -> Result<Vec<&'a TableRef>> {
        let mut seen = HashSet::new();
        let mut tables = Vec::new();

        for entity in entities.iter().filter(|e| e.is_table()) {
            if entity.name.trim().is_empty() {
                return Err(LineageError::InvalidArgument(format!(
                    "table in database '{}' has an empty name",
                    entity.database
                )));
            }
            if self.is_temp(entity) {
                tracing::debug!(table = %entity.name, "Skipping temp table");
                continue;
            }
            if seen.insert(entity.name.as_str()) {
                tables.push(entity);
            }
        }

        Ok(tables)
    }

    fn is_temp(&self, table: &TableRef) -> bool {
        let name = table.unqualified_name();
        self.temp_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}
