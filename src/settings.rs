use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub data: Data,
    pub matcher: Matcher,
    pub cache: Cache,
    pub relay: Relay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    /// Directory of `.kdl` snapshot files loaded at startup. Default: data/snapshot
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matcher {
    /// Deadline for one REGEX evaluation, including the wait for a worker.
    pub timeout_ms: u64,
    /// Size of the blocking worker pool.
    pub max_workers: usize,
    /// Backtracking steps after which a single match attempt gives up.
    pub backtrack_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cache {
    /// Memoize access decisions. Off by default.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relay {
    pub timeout_ms: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for Data {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("data/snapshot"),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            max_workers: 8,
            backtrack_limit: 1_000_000,
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let matcher = Matcher::default();
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default(
                "data.snapshot_dir",
                Data::default().snapshot_dir.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default("matcher.timeout_ms", matcher.timeout_ms)
            .into_diagnostic()?
            .set_default("matcher.max_workers", matcher.max_workers as u64)
            .into_diagnostic()?
            .set_default("matcher.backtrack_limit", matcher.backtrack_limit as u64)
            .into_diagnostic()?
            .set_default("cache.enabled", false)
            .into_diagnostic()?
            .set_default("relay.timeout_ms", Relay::default().timeout_ms)
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: SWITCHER__SERVER__PORT=9090, etc.
        builder = builder.add_source(config::Environment::with_prefix("SWITCHER").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        if s.data.snapshot_dir.is_relative() {
            s.data.snapshot_dir = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.data.snapshot_dir);
        }

        Ok(s)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
