//! Execution events handed over by the host query engine.
//!
//! One event per statement execution: the tables it read, the tables it
//! wrote, and a correlation id that groups the resulting relations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TableRef;

/// A completed statement execution as seen by the lineage hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub inputs: Vec<TableRef>,
    pub outputs: Vec<TableRef>,
    pub correlation_id: String,
    /// Statement text, if the host exposes it. Logged only.
    pub query_text: Option<String>,
}

impl ExecutionEvent {
    /// Build an event with a freshly minted correlation id.
    pub fn new(inputs: Vec<TableRef>, outputs: Vec<TableRef>) -> Self {
        Self {
            inputs,
            outputs,
            correlation_id: Uuid::new_v4().to_string(),
            query_text: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_query_text(mut self, query_text: impl Into<String>) -> Self {
        self.query_text = Some(query_text.into());
        self
    }
}
