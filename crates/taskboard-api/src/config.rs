//! Layered configuration: defaults, optional YAML file, `TASKBOARD_` env vars.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use taskboard_queue::{InspectorConfig, RedisOptions, TlsMaterial};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TASKBOARD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to read {what} from {path}: {source}")]
    ReadFile {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Incomplete TLS configuration: {0}")]
    Tls(String),
}

/// Full application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub api: ApiConfig,
    pub queue: QueueConfig,
}

/// Redis connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Full connection URL; overrides the discrete fields when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
    pub username: String,
    pub use_tls: bool,
    pub tls: TlsConfig,
    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            password: String::new(),
            db: 0,
            username: String::new(),
            use_tls: false,
            tls: TlsConfig::default(),
            connect_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
    pub insecure_skip_verify: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub metrics_enabled: bool,
    /// development or production
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1337,
            request_timeout_secs: 10,
            cors_origins: vec!["*".to_string()],
            metrics_enabled: true,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Key namespace
    pub prefix: String,
    pub scan_count: u64,
    pub page_size: u64,
    pub max_page_size: u64,
    pub hydrate_concurrency: usize,
    pub operation_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        let defaults = InspectorConfig::default();
        Self {
            prefix: defaults.namespace,
            scan_count: defaults.scan_count,
            page_size: defaults.page_size,
            max_page_size: defaults.max_page_size,
            hydrate_concurrency: defaults.hydrate_concurrency,
            operation_timeout_ms: defaults.operation_timeout.as_millis() as u64,
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// With an explicit `path` that file must exist; otherwise `config.yaml` is
    /// looked up in `.`, `./config` and `$HOME/.taskboard`, all optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                builder = builder
                    .add_source(File::with_name("config").required(false))
                    .add_source(File::with_name("config/config").required(false));
                if let Some(home) = std::env::var_os("HOME") {
                    let file = PathBuf::from(home).join(".taskboard").join("config.yaml");
                    builder = builder.add_source(File::from(file).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl RedisConfig {
    /// Connection URL, built from the discrete fields unless `url` is set.
    pub fn connection_url(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|url| !url.is_empty()) {
            return url.to_string();
        }

        let scheme = if self.use_tls { "rediss" } else { "redis" };
        let user = urlencoding::encode(&self.username);
        let password = urlencoding::encode(&self.password);
        let auth = match (user.is_empty(), password.is_empty()) {
            (true, true) => String::new(),
            (true, false) => format!(":{password}@"),
            (false, true) => format!("{user}@"),
            (false, false) => format!("{user}:{password}@"),
        };
        let insecure = if self.use_tls && self.tls.insecure_skip_verify {
            "#insecure"
        } else {
            ""
        };

        format!("{scheme}://{auth}{}:{}/{}{insecure}", self.host, self.port, self.db)
    }

    /// Build connection options, reading certificate files from disk.
    pub fn to_options(&self) -> Result<RedisOptions, ConfigError> {
        Ok(RedisOptions {
            url: self.connection_url(),
            tls: self.tls_material()?,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        })
    }

    fn tls_material(&self) -> Result<Option<TlsMaterial>, ConfigError> {
        if !self.use_tls {
            return Ok(None);
        }

        let tls = &self.tls;
        if tls.cert_file.is_none() && tls.key_file.is_none() && tls.ca_file.is_none() {
            return Ok(None);
        }

        let (client_cert, client_key) = match (&tls.cert_file, &tls.key_file) {
            (Some(cert), Some(key)) => (
                Some(read_file("client certificate", cert)?),
                Some(read_file("client key", key)?),
            ),
            (None, None) => (None, None),
            _ => {
                return Err(ConfigError::Tls(
                    "cert_file and key_file must be set together".to_string(),
                ))
            }
        };
        let root_cert = tls
            .ca_file
            .as_deref()
            .map(|ca| read_file("CA certificate", ca))
            .transpose()?;

        Ok(Some(TlsMaterial {
            client_cert,
            client_key,
            root_cert,
        }))
    }
}

impl QueueConfig {
    pub fn to_inspector_config(&self) -> InspectorConfig {
        InspectorConfig {
            namespace: self.prefix.clone(),
            scan_count: self.scan_count,
            page_size: self.page_size,
            max_page_size: self.max_page_size,
            hydrate_concurrency: self.hydrate_concurrency,
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
        }
    }
}

fn read_file(what: &'static str, path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::ReadFile {
        what,
        path: path.to_path_buf(),
        source,
    })
}
