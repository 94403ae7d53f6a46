use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: default_workers() }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 5000 }
fn default_workers() -> Option<usize> { Some(4) }

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), lock_timeout_ms: default_lock_timeout() }
    }
}

fn default_data_dir() -> String { "data".into() }
fn default_lock_timeout() -> u64 { 5000 }

pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`) when present, else defaults;
    /// environment overrides win over both. Then normalize and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path).map_err(|e| anyhow!("cannot load {path}: {e}"))?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay `SERVER_HOST`, `PORT` (or `SERVER_PORT`), `TOKIO_WORKER_THREADS`,
    /// `DATA_DIR` and `LOCK_TIMEOUT_MS` as returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(workers) = lookup("TOKIO_WORKER_THREADS") {
            self.server.worker_threads = Some(parse_var("TOKIO_WORKER_THREADS", &workers)?);
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.storage.data_dir = dir;
        }
        if let Some(ms) = lookup("LOCK_TIMEOUT_MS") {
            self.storage.lock_timeout_ms = parse_var("LOCK_TIMEOUT_MS", &ms)?;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| anyhow!("{key}={raw:?} is not a valid value"))
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.lock_timeout_ms == 0 {
            return Err(anyhow!("storage.lock_timeout_ms must be a positive number of milliseconds"));
        }
        Ok(())
    }
}
