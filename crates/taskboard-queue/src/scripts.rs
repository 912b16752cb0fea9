//! Embedded server-side query scripts.
//!
//! The bundle is compiled into the binary and turned into an immutable
//! table once at startup. A missing or empty script fails [`ScriptRuntime::load`],
//! and [`ScriptRuntime::preload`] lets the server reject scripts that do not parse,
//! so the engine never starts serving with a query capability missing.

use std::fmt;

use redis::Value;

use crate::error::{QueueError, QueueResult};
use crate::store::QueueStore;

/// Script sources shipped with the crate, keyed by file stem.
pub const BUNDLE: &[(&str, &str)] = &[
    ("discover_queues", include_str!("../lua/discover_queues.lua")),
    ("count_states", include_str!("../lua/count_states.lua")),
];

/// The query scripts the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptName {
    DiscoverQueues,
    CountStates,
}

impl ScriptName {
    pub const ALL: [ScriptName; 2] = [ScriptName::DiscoverQueues, ScriptName::CountStates];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptName::DiscoverQueues => "discover_queues",
            ScriptName::CountStates => "count_states",
        }
    }

    fn from_bundle_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled script.
#[derive(Debug, Clone)]
pub struct QueryScript {
    name: ScriptName,
    script: redis::Script,
}

impl QueryScript {
    fn new(name: ScriptName, source: &str) -> Self {
        Self {
            name,
            script: redis::Script::new(source),
        }
    }

    pub fn name(&self) -> ScriptName {
        self.name
    }

    pub fn script(&self) -> &redis::Script {
        &self.script
    }

    /// SHA1 the server knows this script by.
    pub fn hash(&self) -> &str {
        self.script.get_hash()
    }
}

/// Immutable table of compiled query scripts, indexed by [`ScriptName`].
#[derive(Debug)]
pub struct ScriptRuntime {
    table: Vec<QueryScript>,
}

impl ScriptRuntime {
    /// Build the table from the embedded bundle.
    pub fn load() -> QueueResult<Self> {
        Self::load_from(BUNDLE)
    }

    pub fn load_from(bundle: &[(&str, &str)]) -> QueueResult<Self> {
        let mut slots: Vec<Option<QueryScript>> = vec![None; ScriptName::ALL.len()];

        for (file, source) in bundle {
            let name = ScriptName::from_bundle_name(file)
                .ok_or_else(|| QueueError::script_bundle(format!("unknown script {file:?}")))?;
            if source.trim().is_empty() {
                return Err(QueueError::script_bundle(format!("script {name} is empty")));
            }
            let slot = &mut slots[name.slot()];
            if slot.is_some() {
                return Err(QueueError::script_bundle(format!("script {name} bundled twice")));
            }
            *slot = Some(QueryScript::new(name, source));
        }

        let table = slots
            .into_iter()
            .zip(ScriptName::ALL)
            .map(|(slot, name)| {
                slot.ok_or_else(|| QueueError::script_bundle(format!("script {name} is missing")))
            })
            .collect::<QueueResult<Vec<_>>>()?;

        Ok(Self { table })
    }

    pub fn get(&self, name: ScriptName) -> &QueryScript {
        &self.table[name.slot()]
    }

    /// Register every script with the server.
    pub async fn preload(&self, store: &dyn QueueStore) -> QueueResult<()> {
        for script in &self.table {
            store.load_script(script).await.map_err(|e| {
                QueueError::script_bundle(format!("server rejected {}: {e}", script.name()))
            })?;
        }
        Ok(())
    }

    pub async fn run(
        &self,
        store: &dyn QueueStore,
        name: ScriptName,
        keys: &[String],
        args: &[String],
    ) -> QueueResult<Value> {
        store.eval(self.get(name), keys, args).await
    }

    /// Raw key names from one bounded scan page starting at `cursor`.
    pub async fn discover_queues(
        &self,
        store: &dyn QueueStore,
        pattern: &str,
        cursor: u64,
        limit: u64,
    ) -> QueueResult<Vec<String>> {
        let args = [pattern.to_string(), cursor.to_string(), limit.to_string()];
        let reply = self.run(store, ScriptName::DiscoverQueues, &[], &args).await?;
        redis::from_redis_value(&reply)
            .map_err(|e| QueueError::unexpected_reply("discover_queues", e.to_string()))
    }

    /// `(suffix, count)` pairs for every requested state index of one queue.
    ///
    /// The reply names each count, and its length is checked against the request.
    pub async fn count_states(
        &self,
        store: &dyn QueueStore,
        queue_key: &str,
        suffixes: &[&str],
    ) -> QueueResult<Vec<(String, u64)>> {
        let keys = [queue_key.to_string()];
        let args: Vec<String> = suffixes.iter().map(|s| s.to_string()).collect();
        let reply = self.run(store, ScriptName::CountStates, &keys, &args).await?;

        let items = match reply {
            Value::Array(items) => items,
            other => {
                return Err(QueueError::unexpected_reply(
                    "count_states",
                    format!("expected array, got {other:?}"),
                ))
            }
        };
        if items.len() != suffixes.len() * 2 {
            return Err(QueueError::unexpected_reply(
                "count_states",
                format!("{} items for {} states", items.len(), suffixes.len()),
            ));
        }

        items
            .chunks_exact(2)
            .map(|pair| {
                let suffix: String = redis::from_redis_value(&pair[0])?;
                let count: u64 = redis::from_redis_value(&pair[1])?;
                Ok((suffix, count))
            })
            .collect::<Result<Vec<_>, redis::RedisError>>()
            .map_err(|e| QueueError::unexpected_reply("count_states", e.to_string()))
    }
}
