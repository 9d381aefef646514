//! Seams between the lineage pipeline and the graph store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use lineage_core::Relation;

use crate::client::GraphError;

/// Persists relation batches with merge semantics.
///
/// A batch is all-or-nothing: either every relation is applied or none is.
#[async_trait]
pub trait LineageSink: Send + Sync {
    async fn write_batch(&self, relations: &[Relation]) -> Result<(), GraphError>;
}

/// Deletes lineage edges older than a cutoff.
#[async_trait]
pub trait EdgeReaper: Send + Sync {
    /// Returns the number of edges actually deleted.
    async fn delete_edges_before(&self, cutoff: NaiveDateTime) -> Result<u64, GraphError>;
}

#[async_trait]
impl<S: LineageSink + ?Sized> LineageSink for Arc<S> {
    async fn write_batch(&self, relations: &[Relation]) -> Result<(), GraphError> {
        (**self).write_batch(relations).await
    }
}

#[async_trait]
impl<R: EdgeReaper + ?Sized> EdgeReaper for Arc<R> {
    async fn delete_edges_before(&self, cutoff: NaiveDateTime) -> Result<u64, GraphError> {
        (**self).delete_edges_before(cutoff).await
    }
}
