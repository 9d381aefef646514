//! lineage-core: Shared types, extraction, and configuration for table lineage capture.
//!
//! This crate provides the in-memory half of the lineage pipeline:
//! - Table references and relation records (`FLOWS_TO` edges)
//! - Execution events handed over by the host query engine
//! - The relation extractor (read set × write set → relations)
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod types;

pub use config::LineageConfig;
pub use error::LineageError;
pub use events::ExecutionEvent;
pub use extract::RelationExtractor;
pub use types::{EntityKind, Relation, RelationKind, TableRef};
