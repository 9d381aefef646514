//! Write operations for the lineage graph.
//!
//! All mutations use MERGE (upsert) semantics so that re-running a
//! statement never duplicates nodes or edges. Nodes are identified by
//! table name, edges by (source, target, relation kind).

use std::time::Duration;

use async_trait::async_trait;
use neo4rs::Txn;

use lineage_core::types::{format_timestamp, local_now};
use lineage_core::{LineageConfig, Relation};

use crate::client::{GraphClient, GraphError};
use crate::retry::with_retry;
use crate::sink::LineageSink;
use crate::statements::{merge_relation, CREATE_TABLE_NAME_INDEX};

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Upserts relation batches into Neo4j, one transaction per batch.
#[derive(Clone)]
pub struct GraphWriter {
    client: GraphClient,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl GraphWriter {
    /// A writer that tries each batch once.
    pub fn new(client: GraphClient) -> Self {
        Self {
            client,
            max_attempts: 1,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Total attempts for a batch that fails transiently.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Build a writer from configuration and create indexes if enabled.
    ///
    /// Index creation failures are logged; the writer works without them.
    pub async fn bootstrap(client: GraphClient, config: &LineageConfig) -> Self {
        let writer = Self::new(client).with_max_attempts(config.max_retry_attempts);

        if config.neo4j.create_indexes {
            if let Err(e) = writer.ensure_indexes().await {
                tracing::error!(error = %e, "Failed to create Neo4j indexes");
            }
        }

        writer
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    /// Create the `Table(name)` index if it does not exist yet.
    pub async fn ensure_indexes(&self) -> Result<(), GraphError> {
        let q = self.client.statement(CREATE_TABLE_NAME_INDEX);
        self.client.run(q).await?;
        tracing::info!("Ensured Neo4j indexes");
        Ok(())
    }

    /// Merge every relation inside a single transaction.
    ///
    /// An empty batch is a no-op and never touches the store.
    pub async fn write_batch(&self, relations: &[Relation]) -> Result<(), GraphError> {
        if relations.is_empty() {
            return Ok(());
        }

        with_retry("write_batch", self.max_attempts, self.retry_backoff, move || {
            self.write_once(relations)
        })
        .await?;

        tracing::info!(relations = relations.len(), "Saved relations to Neo4j");
        Ok(())
    }

    async fn write_once(&self, relations: &[Relation]) -> Result<(), GraphError> {
        let mut txn = self.client.start_txn().await?;

        match self.merge_all(&mut txn, relations).await {
            Ok(()) => self.client.bounded("commit", txn.commit()).await,
            Err(e) => {
                if let Err(rollback) = self.client.bounded("rollback", txn.rollback()).await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn merge_all(&self, txn: &mut Txn, relations: &[Relation]) -> Result<(), GraphError> {
        let timestamp = format_timestamp(local_now());

        for relation in relations {
            let q = self
                .client
                .statement(&merge_relation(relation.kind))
                .param("source_table", relation.source_table.clone())
                .param("target_table", relation.target_table.clone())
                .param("database_name", relation.database_name.clone())
                .param("query_id", relation.correlation_id.clone())
                .param("timestamp", timestamp.clone());

            self.client.bounded("merge relation", txn.run(q)).await?;
            tracing::debug!(relation = %relation, "Merged relation");
        }

        Ok(())
    }
}

#[async_trait]
impl LineageSink for GraphWriter {
    async fn write_batch(&self, relations: &[Relation]) -> Result<(), GraphError> {
        GraphWriter::write_batch(self, relations).await
    }
}
