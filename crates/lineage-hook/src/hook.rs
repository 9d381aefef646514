//! The execution hook: the boundary between the host engine and lineage capture.
//!
//! Every failure below this boundary (bad input, unreachable store, rejected
//! credentials, malformed statements, even panics) is logged and dropped.
//! The host's statement completes the same way whether capture worked or not.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio::runtime::Runtime;

use lineage_core::{ExecutionEvent, LineageConfig, RelationExtractor};
use lineage_graph::{GraphClient, GraphConfig, GraphError, GraphWriter, LineageSink};

use crate::error::{HookError, Result};

/// Captures table lineage for each statement the host executes.
///
/// `on_execution` blocks the calling thread for the duration of the store
/// round trips and may be called from many host threads at once. It must
/// not be called from inside an async runtime.
pub struct LineageHook<S = GraphWriter> {
    config: LineageConfig,
    extractor: RelationExtractor,
    sink: Option<S>,
    runtime: Runtime,
}

impl LineageHook<GraphWriter> {
    /// Build the hook the host should register, if any.
    ///
    /// Returns `None` when `hook_enabled` is off. Never fails otherwise: if
    /// the store cannot be reached at startup the hook runs log-only.
    pub fn install(config: LineageConfig) -> Option<Self> {
        if !config.hook_enabled {
            tracing::info!("Lineage hook disabled, not registering");
            return None;
        }

        match Self::connect(config.clone()) {
            Ok(hook) => Some(hook),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Lineage store unavailable at startup, capture is log-only"
                );
                match Self::log_only(config) {
                    Ok(hook) => Some(hook),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to start lineage hook");
                        None
                    }
                }
            }
        }
    }

    /// Connect to Neo4j and prepare the writer (creating indexes if enabled).
    ///
    /// When lineage is disabled no connection is made.
    pub fn connect(config: LineageConfig) -> Result<Self> {
        let runtime = build_runtime()?;

        let sink = if config.enabled {
            let graph_config = GraphConfig::from(&config);
            let writer = runtime.block_on(async {
                let client = GraphClient::connect(&graph_config).await?;
                Ok::<_, GraphError>(GraphWriter::bootstrap(client, &config).await)
            })?;
            Some(writer)
        } else {
            None
        };

        tracing::info!(enabled = config.enabled, "Lineage hook initialized");
        Ok(Self {
            extractor: RelationExtractor::from_config(&config),
            config,
            sink,
            runtime,
        })
    }
}

impl<S: LineageSink> LineageHook<S> {
    /// Hook writing through the given sink.
    pub fn new(config: LineageConfig, sink: S) -> Result<Self> {
        Self::assemble(config, Some(sink))
    }

    /// Hook without a store: relations are extracted and logged, never written.
    pub fn log_only(config: LineageConfig) -> Result<Self> {
        Self::assemble(config, None)
    }

    fn assemble(config: LineageConfig, sink: Option<S>) -> Result<Self> {
        Ok(Self {
            extractor: RelationExtractor::from_config(&config),
            runtime: build_runtime()?,
            config,
            sink,
        })
    }

    /// Host entry point. Never fails and never panics outward.
    pub fn on_execution(&self, event: &ExecutionEvent) {
        if !self.config.enabled {
            tracing::debug!("Lineage tracking is disabled, skipping hook execution");
            return;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.capture(event))) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!(
                    correlation_id = %event.correlation_id,
                    inputs = event.inputs.len(),
                    outputs = event.outputs.len(),
                    error = %e,
                    "Error processing statement in lineage hook"
                );
            }
            Err(payload) => {
                tracing::error!(
                    correlation_id = %event.correlation_id,
                    panic = panic_message(payload.as_ref()),
                    "Lineage hook panicked"
                );
            }
        }
    }

    /// Extract and persist the relations of one statement.
    ///
    /// Returns the number of relations written. Unlike [`Self::on_execution`]
    /// this surfaces failures to the caller.
    pub fn capture(&self, event: &ExecutionEvent) -> Result<usize> {
        if !self.config.enabled {
            return Ok(0);
        }

        if let Some(query) = &event.query_text {
            tracing::debug!(
                correlation_id = %event.correlation_id,
                query = %query,
                "Processing statement"
            );
        }

        let relations = self
            .extractor
            .extract(&event.inputs, &event.outputs, &event.correlation_id)?;

        if relations.is_empty() {
            tracing::info!(
                correlation_id = %event.correlation_id,
                "No table relations found in statement"
            );
            return Ok(0);
        }

        let Some(sink) = &self.sink else {
            return Err(HookError::StoreUnavailable);
        };

        self.runtime.block_on(sink.write_batch(&relations))?;

        tracing::info!(
            correlation_id = %event.correlation_id,
            relations = relations.len(),
            "Captured statement lineage"
        );
        Ok(relations.len())
    }
}

fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("lineage-hook")
        .enable_all()
        .build()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use lineage_core::{EntityKind, Relation, RelationKind, TableRef};
    use lineage_graph::memory::MemoryGraph;

    use super::*;

    struct PanickingSink;

    #[async_trait]
    impl LineageSink for PanickingSink {
        async fn write_batch(
            &self,
            _relations: &[Relation],
        ) -> std::result::Result<(), GraphError> {
            panic!("sink exploded")
        }
    }

    fn statement(correlation_id: &str) -> ExecutionEvent {
        ExecutionEvent::new(
            vec![
                TableRef::table("db1", "db1.table1"),
                TableRef::table("db1", "db1.table2"),
            ],
            vec![TableRef::table("db2", "db2.result_table")],
        )
        .with_correlation_id(correlation_id)
    }

    fn memory_hook(
        config: LineageConfig,
    ) -> (LineageHook<Arc<MemoryGraph>>, Arc<MemoryGraph>) {
        let graph = Arc::new(MemoryGraph::new());
        let hook = LineageHook::new(config, graph.clone()).unwrap();
        (hook, graph)
    }

    #[test]
    fn test_statement_end_to_end() {
        let (hook, graph) = memory_hook(LineageConfig::default());

        assert_eq!(hook.capture(&statement("q1")).unwrap(), 2);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        for source in ["db1.table1", "db1.table2"] {
            let edge = graph
                .edge(source, "db2.result_table", RelationKind::FlowsTo)
                .unwrap();
            assert_eq!(edge.query_id, "q1");
        }
        assert_eq!(
            graph.table("db1.table1").unwrap().database.as_deref(),
            Some("db1")
        );
    }

    #[test]
    fn test_rerun_updates_provenance_only() {
        let (hook, graph) = memory_hook(LineageConfig::default());

        hook.on_execution(&statement("q1"));
        hook.on_execution(&statement("q2"));

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        for source in ["db1.table1", "db1.table2"] {
            let edge = graph
                .edge(source, "db2.result_table", RelationKind::FlowsTo)
                .unwrap();
            assert_eq!(edge.query_id, "q2");
        }
    }

    #[test]
    fn test_disabled_skips_store() {
        let config = LineageConfig {
            enabled: false,
            ..LineageConfig::default()
        };
        let (hook, graph) = memory_hook(config);

        hook.on_execution(&statement("q1"));
        assert_eq!(hook.capture(&statement("q1")).unwrap(), 0);
        assert_eq!(graph.write_calls(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_no_relations_skips_store() {
        let (hook, graph) = memory_hook(LineageConfig::default());
        let select_only = ExecutionEvent::new(vec![TableRef::table("db", "db.a")], Vec::new())
            .with_query_text("SELECT * FROM db.a");

        assert_eq!(hook.capture(&select_only).unwrap(), 0);
        assert_eq!(graph.write_calls(), 0);
    }

    #[test]
    fn test_partitions_and_temp_tables_ignored() {
        let (hook, graph) = memory_hook(LineageConfig::default());
        let event = ExecutionEvent::new(
            vec![
                TableRef::table("db", "db.orders"),
                TableRef::table("db", "db.tmp_stage"),
                TableRef::of_kind(EntityKind::Partition, "db", "db.orders/dt=2024-01-01"),
            ],
            vec![TableRef::table("db", "db.report")],
        );

        assert_eq!(hook.capture(&event).unwrap(), 1);
        assert!(graph.table("db.tmp_stage").is_none());
    }

    #[test]
    fn test_store_failure_is_absorbed() {
        let (hook, graph) = memory_hook(LineageConfig::default());
        graph.fail_next_writes([GraphError::Connection("connection refused".into())]);

        hook.on_execution(&statement("q1"));
        assert_eq!(graph.edge_count(), 0);

        graph.fail_next_writes([GraphError::Auth("unauthorized".into())]);
        let err = hook.capture(&statement("q1")).unwrap_err();
        assert!(matches!(err, HookError::Graph(GraphError::Auth(_))));
    }

    #[test]
    fn test_invalid_event_is_absorbed() {
        let (hook, graph) = memory_hook(LineageConfig::default());
        let event = statement("q1").with_correlation_id("");

        hook.on_execution(&event);
        assert!(matches!(
            hook.capture(&event).unwrap_err(),
            HookError::Extract(_)
        ));
        assert_eq!(graph.write_calls(), 0);
    }

    #[test]
    fn test_log_only_hook() {
        let hook = LineageHook::<MemoryGraph>::log_only(LineageConfig::default()).unwrap();

        hook.on_execution(&statement("q1"));
        assert!(matches!(
            hook.capture(&statement("q1")).unwrap_err(),
            HookError::StoreUnavailable
        ));
    }

    #[test]
    fn test_install_respects_hook_flag() {
        let config = LineageConfig {
            hook_enabled: false,
            ..LineageConfig::default()
        };
        assert!(LineageHook::install(config).is_none());
    }

    #[test]
    fn test_install_survives_unreachable_store() {
        let mut config = LineageConfig::default();
        config.neo4j.uri = "bolt://127.0.0.1:1".to_string();
        config.connection_timeout_seconds = 1;

        let hook = LineageHook::install(config).expect("hook is installed even without a store");
        hook.on_execution(&statement("q1"));
    }

    #[test]
    fn test_panicking_sink_does_not_unwind() {
        let hook = LineageHook::new(LineageConfig::default(), PanickingSink).unwrap();
        hook.on_execution(&statement("q1"));
    }

    #[test]
    fn test_concurrent_statements_converge() {
        let (hook, graph) = memory_hook(LineageConfig::default());

        std::thread::scope(|s| {
            for worker in 0..8 {
                let hook = &hook;
                s.spawn(move || {
                    hook.on_execution(&statement(&format!("q{worker}")));
                });
            }
        });

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.write_calls(), 8);
    }
}
