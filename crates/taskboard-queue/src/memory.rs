//! In-process store for tests.
//!
//! Emulates the query scripts, hash reads and index reads the engine uses,
//! with hooks to inject failures and latency. Indexes are either sorted sets
//! or lists, as the producing library writes both.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::Value;

use crate::error::QueueResult;
use crate::scripts::{QueryScript, ScriptName};
use crate::store::QueueStore;

#[derive(Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    indexes: HashMap<String, Vec<(f64, String)>>,
    /// Head first, like `LPUSH`
    lists: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a job hash.
    pub fn put_hash(&self, key: &str, fields: &[(&str, &str)]) {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.lock().hashes.insert(key.to_string(), fields);
    }

    /// Add a member to a sorted set.
    pub fn index_add(&self, key: &str, score: f64, member: &str) {
        let mut inner = self.lock();
        let index = inner.indexes.entry(key.to_string()).or_default();
        index.retain(|(_, m)| m != member);
        index.push((score, member.to_string()));
    }

    /// Push a member onto the head of a list index.
    pub fn list_push(&self, key: &str, member: &str) {
        self.lock()
            .lists
            .entry(key.to_string())
            .or_default()
            .insert(0, member.to_string());
    }

    /// Make every call touching `key` fail.
    ///
    /// For scripts the key is the queue base key or the discovery pattern.
    pub fn fail_on(&self, key: &str) {
        self.lock().failing.insert(key.to_string());
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, key: &str) -> QueueResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failing) = {
            let inner = self.lock();
            (inner.delay, inner.failing.contains(key))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(redis::RedisError::from((redis::ErrorKind::IoError, "injected failure")).into());
        }
        Ok(())
    }

    /// Index members newest first, whichever type the index has.
    fn newest_first(&self, key: &str) -> Vec<String> {
        let inner = self.lock();
        if let Some(list) = inner.lists.get(key) {
            return list.clone();
        }
        let mut members = inner.indexes.get(key).cloned().unwrap_or_default();
        members.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        members.into_iter().map(|(_, m)| m).collect()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn eval(&self, script: &QueryScript, keys: &[String], args: &[String]) -> QueueResult<Value> {
        match script.name() {
            ScriptName::DiscoverQueues => {
                let pattern = args.first().cloned().unwrap_or_default();
                self.enter(&pattern).await?;
                let prefix = pattern.trim_end_matches('*');
                let limit: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(usize::MAX);

                let inner = self.lock();
                let mut all: Vec<&String> = inner
                    .hashes
                    .keys()
                    .chain(inner.indexes.keys())
                    .chain(inner.lists.keys())
                    .collect();
                all.sort();
                // COUNT bounds the keys examined, MATCH filters afterwards
                let page = all
                    .into_iter()
                    .take(limit)
                    .filter(|k| k.starts_with(prefix))
                    .map(|k| Value::BulkString(k.as_bytes().to_vec()))
                    .collect();
                Ok(Value::Array(page))
            }
            ScriptName::CountStates => {
                let base = keys.first().cloned().unwrap_or_default();
                self.enter(&base).await?;

                let inner = self.lock();
                let mut reply = Vec::with_capacity(args.len() * 2);
                for suffix in args {
                    let key = format!("{base}:{suffix}");
                    let count = match inner.lists.get(&key) {
                        Some(list) => list.len(),
                        None => inner.indexes.get(&key).map_or(0, Vec::len),
                    };
                    reply.push(Value::BulkString(suffix.as_bytes().to_vec()));
                    reply.push(Value::Int(count as i64));
                }
                Ok(Value::Array(reply))
            }
        }
    }

    async fn load_script(&self, script: &QueryScript) -> QueueResult<()> {
        self.enter(script.name().as_str()).await
    }

    async fn hash_fields(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        self.enter(key).await?;
        Ok(self.lock().hashes.get(key).cloned().unwrap_or_default())
    }

    async fn index_range_rev(&self, key: &str, start: isize, stop: isize) -> QueueResult<Vec<String>> {
        self.enter(key).await?;
        let members = self.newest_first(key);
        if start < 0 || stop < start || start as usize >= members.len() {
            return Ok(Vec::new());
        }
        let end = (stop as usize).min(members.len() - 1);
        Ok(members[start as usize..=end].to_vec())
    }

    async fn index_len(&self, key: &str) -> QueueResult<u64> {
        self.enter(key).await?;
        let inner = self.lock();
        let len = match inner.lists.get(key) {
            Some(list) => list.len(),
            None => inner.indexes.get(key).map_or(0, Vec::len),
        };
        Ok(len as u64)
    }

    async fn ping(&self) -> QueueResult<()> {
        self.enter("PING").await
    }
}
