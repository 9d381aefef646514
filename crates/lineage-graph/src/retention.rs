//! Time-based retention for lineage edges.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta};

use lineage_core::types::{format_timestamp, local_now};

use crate::client::{GraphClient, GraphError};
use crate::sink::EdgeReaper;
use crate::statements::DELETE_EXPIRED_EDGES;

#[async_trait]
impl EdgeReaper for GraphClient {
    async fn delete_edges_before(&self, cutoff: NaiveDateTime) -> Result<u64, GraphError> {
        let q = self
            .statement(DELETE_EXPIRED_EDGES)
            .param("cutoff", format_timestamp(cutoff));

        match self.query_one(q).await? {
            Some(row) => deleted_count(row.get::<i64>("deleted")),
            None => Ok(0),
        }
    }
}

fn deleted_count<E: std::fmt::Display>(value: Result<i64, E>) -> Result<u64, GraphError> {
    value
        .map(|n| n.max(0) as u64)
        .map_err(|e| GraphError::Serialization(format!("Failed to read deleted count: {e}")))
}

/// Deletes edges whose provenance timestamp has aged out.
pub struct RetentionSweeper<R = GraphClient> {
    reaper: R,
}

impl<R: EdgeReaper> RetentionSweeper<R> {
    pub fn new(reaper: R) -> Self {
        Self { reaper }
    }

    /// Delete every lineage edge older than `retention_days` days.
    ///
    /// Zero or negative disables the sweep without contacting the store.
    /// Failures are logged and reported as zero deletions.
    pub async fn sweep(&self, retention_days: i64) -> u64 {
        if retention_days <= 0 {
            tracing::debug!(retention_days, "Retention disabled, skipping sweep");
            return 0;
        }

        let Some(cutoff) = TimeDelta::try_days(retention_days)
            .and_then(|window| local_now().checked_sub_signed(window))
        else {
            tracing::warn!(retention_days, "Retention window out of range, skipping sweep");
            return 0;
        };

        match self.reaper.delete_edges_before(cutoff).await {
            Ok(deleted) => {
                tracing::info!(
                    retention_days,
                    cutoff = %format_timestamp(cutoff),
                    deleted,
                    "Cleaned up old relations"
                );
                deleted
            }
            Err(e) => {
                tracing::error!(retention_days, error = %e, "Error cleaning up old relations");
                0
            }
        }
    }
}
