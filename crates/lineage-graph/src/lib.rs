//! lineage-graph: Neo4j persistence for table lineage.
//!
//! This crate is the single mutation point for the lineage graph. Every
//! relation is merged as two `Table` nodes and a typed edge, and the
//! retention sweep is the only code path that deletes edges.

pub mod client;
#[cfg(any(test, feature = "testkit"))]
pub mod memory;
pub mod queries;
pub mod retention;
pub mod retry;
pub mod sink;
pub mod statements;
pub mod writer;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use retention::RetentionSweeper;
pub use sink::{EdgeReaper, LineageSink};
pub use writer::GraphWriter;
