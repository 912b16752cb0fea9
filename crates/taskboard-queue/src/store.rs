//! Store access seam and its Redis implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};
use crate::scripts::QueryScript;

/// Read-only operations the inspection engine needs from the store.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Execute a query script atomically on the server.
    async fn eval(
        &self,
        script: &QueryScript,
        keys: &[String],
        args: &[String],
    ) -> QueueResult<redis::Value>;

    /// Register a script with the server, which also validates its syntax.
    async fn load_script(&self, script: &QueryScript) -> QueueResult<()>;

    /// All fields of a hash. Empty when the key does not exist.
    async fn hash_fields(&self, key: &str) -> QueueResult<HashMap<String, String>>;

    /// Members of a state index newest first, `start..=stop` inclusive.
    ///
    /// Sorted-set indexes are read by descending score; list indexes
    /// (`wait`, `active`) from the head, where new jobs are pushed.
    async fn index_range_rev(&self, key: &str, start: isize, stop: isize) -> QueueResult<Vec<String>>;

    /// Number of members in a state index. Zero when it does not exist.
    async fn index_len(&self, key: &str) -> QueueResult<u64>;

    async fn ping(&self) -> QueueResult<()>;
}

/// PEM material for mutual TLS.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub client_cert: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
    pub root_cert: Option<Vec<u8>>,
}

/// How to reach the store.
#[derive(Debug, Clone)]
pub struct RedisOptions {
    /// `redis://` or `rediss://` URL
    pub url: String,
    /// Extra certificates for `rediss://` connections
    pub tls: Option<TlsMaterial>,
    /// Bound on establishing the connection
    pub connect_timeout: Duration,
}

impl RedisOptions {
    fn client(&self) -> QueueResult<redis::Client> {
        match &self.tls {
            Some(tls) if tls.has_certificates() => {
                let client_tls = match (&tls.client_cert, &tls.client_key) {
                    (Some(cert), Some(key)) => Some(redis::ClientTlsConfig {
                        client_cert: cert.clone(),
                        client_key: key.clone(),
                    }),
                    _ => None,
                };
                let certs = redis::TlsCertificates {
                    client_tls,
                    root_cert: tls.root_cert.clone(),
                };
                Ok(redis::Client::build_with_tls(self.url.as_str(), certs)?)
            }
            _ => Ok(redis::Client::open(self.url.as_str())?),
        }
    }
}

impl TlsMaterial {
    fn has_certificates(&self) -> bool {
        self.root_cert.is_some() || (self.client_cert.is_some() && self.client_key.is_some())
    }
}

/// Redis-backed store sharing one multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect and verify the server answers.
    pub async fn connect(options: &RedisOptions) -> QueueResult<Self> {
        let client = options
            .client()
            .map_err(|e| QueueError::connection_failed(format!("invalid Redis settings: {e}")))?;

        let conn = tokio::time::timeout(
            options.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            QueueError::connection_failed(format!(
                "timed out after {:?}",
                options.connect_timeout
            ))
        })?
        .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        let store = Self { conn };
        store
            .ping()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        info!("Connected to Redis");
        Ok(store)
    }
}

/// Redis type of a state index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexKind {
    SortedSet,
    List,
    Missing,
}

impl RedisStore {
    async fn index_kind(&self, conn: &mut MultiplexedConnection, key: &str) -> QueueResult<IndexKind> {
        let kind: String = redis::cmd("TYPE").arg(key).query_async(conn).await?;
        match kind.as_str() {
            "zset" => Ok(IndexKind::SortedSet),
            "list" => Ok(IndexKind::List),
            "none" => Ok(IndexKind::Missing),
            other => Err(QueueError::unexpected_reply(
                "type",
                format!("{key} is a {other}, not a job index"),
            )),
        }
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn eval(
        &self,
        script: &QueryScript,
        keys: &[String],
        args: &[String],
    ) -> QueueResult<redis::Value> {
        let mut conn = self.conn.clone();
        let mut invocation = script.script().prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }
        let value: redis::Value = invocation.invoke_async(&mut conn).await?;
        Ok(value)
    }

    async fn load_script(&self, script: &QueryScript) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        let hash = script.script().prepare_invoke().load_async(&mut conn).await?;
        debug!(script = %script.name(), hash = %hash, "Loaded query script");
        Ok(())
    }

    async fn hash_fields(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn index_range_rev(&self, key: &str, start: isize, stop: isize) -> QueueResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = match self.index_kind(&mut conn, key).await? {
            IndexKind::SortedSet => conn.zrevrange(key, start, stop).await?,
            IndexKind::List => conn.lrange(key, start, stop).await?,
            IndexKind::Missing => Vec::new(),
        };
        Ok(ids)
    }

    async fn index_len(&self, key: &str) -> QueueResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = match self.index_kind(&mut conn, key).await? {
            IndexKind::SortedSet => conn.zcard(key).await?,
            IndexKind::List => conn.llen(key).await?,
            IndexKind::Missing => 0,
        };
        Ok(len)
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}
