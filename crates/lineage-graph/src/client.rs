//! Neo4j connection management and shared graph client.

use std::future::Future;
use std::time::Duration;

use neo4rs::{
    query, ConfigBuilder, Graph, Neo4jClientErrorKind, Neo4jErrorKind, Neo4jSecurityErrorKind,
    Query,
};

use lineage_core::LineageConfig;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j authentication failed: {0}")]
    Auth(String),

    #[error("Neo4j query error: {0}")]
    Query(#[source] neo4rs::Error),

    #[error("Neo4j {operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } => true,
            Self::Query(neo4rs::Error::Neo4j(e)) => matches!(
                e.kind(),
                Neo4jErrorKind::Transient
                    | Neo4jErrorKind::Client(
                        Neo4jClientErrorKind::SessionExpired
                            | Neo4jClientErrorKind::Security(
                                Neo4jSecurityErrorKind::AuthorizationExpired
                            )
                    )
            ),
            _ => false,
        }
    }
}

/// Lost sockets surface as `Connection` wherever they happen, so a batch
/// interrupted mid-transaction is retried like a failed connect.
impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        match e {
            neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
                Self::Connection(e.to_string())
            }
            neo4rs::Error::AuthenticationError(msg) => Self::Auth(msg),
            other => Self::Query(other),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
    /// Bound on connecting and on every statement round trip.
    pub timeout: Duration,
    /// Log each statement's text before it is sent.
    pub log_statements: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            max_connections: 16,
            fetch_size: 256,
            timeout: Duration::from_secs(30),
            log_statements: false,
        }
    }
}

impl From<&LineageConfig> for GraphConfig {
    fn from(config: &LineageConfig) -> Self {
        Self {
            uri: config.neo4j.uri.clone(),
            user: config.neo4j.username.clone(),
            password: config.neo4j.password.clone(),
            max_connections: config.neo4j.max_connections,
            fetch_size: config.neo4j.fetch_size,
            timeout: config.connection_timeout(),
            log_statements: config.log_cypher,
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc), so one client can be shared by every
/// thread that captures lineage.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
    timeout: Duration,
    log_statements: bool,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = match tokio::time::timeout(config.timeout, Graph::connect(neo_config)).await {
            Ok(Ok(graph)) => graph,
            Ok(Err(neo4rs::Error::AuthenticationError(msg))) => return Err(GraphError::Auth(msg)),
            Ok(Err(e)) => return Err(GraphError::Connection(e.to_string())),
            Err(_) => {
                return Err(GraphError::Timeout {
                    operation: "connect",
                    seconds: config.timeout.as_secs(),
                })
            }
        };

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            timeout: config.timeout,
            log_statements: config.log_statements,
        })
    }

    /// Build a query from statement text, logging the text if enabled.
    pub fn statement(&self, cypher: &str) -> Query {
        if self.log_statements {
            tracing::info!(cypher = %cypher, "Executing Cypher");
        }
        query(cypher)
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.bounded("run", self.graph.run(query)).await
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.bounded("execute", self.graph.execute(query)).await?;
        self.bounded("fetch", stream.next()).await
    }

    /// Begin a transaction.
    ///
    /// Callers must commit or roll back on every exit path.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        self.bounded("begin", self.graph.start_txn()).await
    }

    /// Await a driver future under the configured timeout.
    pub async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, GraphError>
    where
        F: Future<Output = Result<T, neo4rs::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GraphError::Timeout {
                operation,
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
