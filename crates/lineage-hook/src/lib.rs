//! lineage-hook: Table lineage capture for a host query engine.
//!
//! The host calls [`LineageHook::on_execution`] once per statement. The hook
//! extracts `FLOWS_TO` relations from the statement's read and write sets
//! and merges them into Neo4j. Nothing it does can fail or unwind into the
//! host. Retention sweeps run separately through [`SweepScheduler`].

pub mod error;
pub mod hook;
pub mod scheduler;

pub use error::HookError;
pub use hook::LineageHook;
pub use scheduler::{SweepScheduler, SweepTotals};
