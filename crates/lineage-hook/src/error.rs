//! Error types for the lineage-hook crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Extraction error: {0}")]
    Extract(#[from] lineage_core::LineageError),

    #[error("Graph error: {0}")]
    Graph(#[from] lineage_graph::GraphError),

    #[error("Graph store unavailable, lineage capture is log-only")]
    StoreUnavailable,

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HookError>;
