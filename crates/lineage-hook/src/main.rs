//! CLI entry point for exercising lineage capture outside a query engine.
//!
//! `record` and `demo` feed synthetic statements through the same hook the
//! host registers; `sweep` runs the retention sweep once or as a daemon.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use lineage_core::{ExecutionEvent, LineageConfig, TableRef};
use lineage_graph::{GraphClient, GraphConfig, RetentionSweeper};
use lineage_hook::{LineageHook, SweepScheduler};

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "Capture table lineage into Neo4j")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: lineage).
    #[arg(short, long, default_value = "lineage", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Record a single source -> target relation.
    Record {
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        /// Database of the source table.
        #[arg(long, default_value = "default")]
        database: String,
    },
    /// Record a fixed set of example relations.
    Demo,
    /// Delete edges older than the retention window.
    Sweep {
        /// Override `retention_days` from config.
        #[arg(long)]
        days: Option<i64>,
        /// Keep running and sweep every `retention_interval_secs`.
        #[arg(long)]
        daemon: bool,
    },
}

/// (source, target, source database)
const DEMO_RELATIONS: &[(&str, &str, &str)] = &[
    ("source_table1", "target_table", "default"),
    ("source_table2", "target_table", "default"),
    ("source_table3", "target_table", "default"),
    ("db1.table1", "db2.result_table", "db1"),
    ("db1.table2", "db2.result_table", "db1"),
];

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let config = LineageConfig::load(&cli.config);

    match cli.command {
        Command::Record {
            source,
            target,
            database,
        } => {
            let hook = LineageHook::connect(config)?;
            record(&hook, &source, &target, &database)?;
        }
        Command::Demo => {
            let hook = LineageHook::connect(config)?;
            for (source, target, database) in DEMO_RELATIONS {
                record(&hook, source, target, database)?;
            }
        }
        Command::Sweep { days, daemon } => sweep(config, days, daemon)?,
    }

    Ok(())
}

fn record(hook: &LineageHook, source: &str, target: &str, database: &str) -> anyhow::Result<()> {
    let event = ExecutionEvent::new(
        vec![TableRef::table(database, source)],
        vec![TableRef::table(database_of(target), target)],
    )
    .with_query_text(format!("INSERT INTO {target} SELECT * FROM {source}"));

    let written = hook.capture(&event)?;

    let summary = serde_json::json!({
        "correlation_id": event.correlation_id,
        "source": source,
        "target": target,
        "relations": written,
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn sweep(config: LineageConfig, days: Option<i64>, daemon: bool) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let retention_days = days.unwrap_or(config.retention_days);

    runtime.block_on(async {
        let client = GraphClient::connect(&GraphConfig::from(&config)).await?;
        let sweeper = RetentionSweeper::new(client);

        if daemon {
            let scheduler =
                SweepScheduler::new(sweeper, retention_days, config.retention_interval());
            let totals = scheduler.run_until(tokio::signal::ctrl_c()).await;
            println!(
                "{}",
                serde_json::json!({ "runs": totals.runs, "deleted": totals.deleted })
            );
        } else {
            let deleted = sweeper.sweep(retention_days).await;
            println!(
                "{}",
                serde_json::json!({ "retention_days": retention_days, "deleted": deleted })
            );
        }

        anyhow::Ok(())
    })
}

/// Qualifier of `db.table`, or `default` for a bare name.
fn database_of(table: &str) -> &str {
    match table.split_once('.') {
        Some((db, _)) => db,
        None => "default",
    }
}
