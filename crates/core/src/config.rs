use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PancakeError;

/// Secrets available to query templates, keyed by lower-cased name.
pub type Secrets = BTreeMap<String, String>;

/// Environment prefix marking a secret: `PANCAKE_SECRET_API_TOKEN` becomes `api_token`.
const SECRET_PREFIX: &str = "PANCAKE_SECRET_";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Collect `PANCAKE_SECRET_*` variables. Profiled variables
/// (`{PROFILE}_PANCAKE_SECRET_*`) override unprefixed ones with the same name.
fn secrets_from_env(profile: &str) -> Secrets {
    let mut secrets = Secrets::new();
    let profiled_prefix = format!("{}_{}", profile, SECRET_PREFIX);

    let vars: Vec<(String, String)> = env::vars().filter(|(_, v)| !v.is_empty()).collect();

    for (key, value) in &vars {
        if let Some(name) = key.strip_prefix(SECRET_PREFIX) {
            if !name.is_empty() {
                secrets.insert(name.to_lowercase(), value.clone());
            }
        }
    }
    if !profile.is_empty() {
        for (key, value) in &vars {
            if let Some(name) = key.strip_prefix(&profiled_prefix) {
                if !name.is_empty() {
                    secrets.insert(name.to_lowercase(), value.clone());
                }
            }
        }
    }

    secrets
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub secrets: Secrets,
    pub options: RunOptions,
    pub http: HttpConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// When `profile` is set (e.g. `PROD`), every key is first looked up as
    /// `{PROFILE}_{KEY}`, falling back to `{KEY}`. Empty string = default.
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            secrets: secrets_from_env(p),
            options: RunOptions::from_env_profiled(p),
            http: HttpConfig::from_env_profiled(p),
        }
    }

    /// Environment config for `profile`, overlaid with the TOML file at `path`
    /// when one is given.
    pub fn load(profile: &str, path: Option<&Path>) -> Result<Self, PancakeError> {
        let mut config = Self::for_profile(profile);
        if let Some(path) = path {
            let content = std::fs::read_to_string(path)?;
            config.overlay_toml(&content).map_err(|e| match e {
                PancakeError::Config(msg) => {
                    PancakeError::Config(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;
            tracing::debug!(path = %path.display(), "Config file applied");
        }
        Ok(config)
    }

    /// Apply `[secrets]`, `[options]` and `[http]` tables from a TOML document.
    /// Keys present in the document win over the current values.
    pub fn overlay_toml(&mut self, content: &str) -> Result<(), PancakeError> {
        let file: FileOverlay =
            toml::from_str(content).map_err(|e| PancakeError::Config(e.to_string()))?;

        for (name, value) in file.secrets {
            self.secrets.insert(name.to_lowercase(), value);
        }

        let o = file.options;
        if let Some(v) = o.interval {
            self.options.interval = v;
        }
        if let Some(v) = o.jitter {
            self.options.jitter = v;
        }
        if let Some(v) = o.version {
            self.options.version = v;
        }

        let h = file.http;
        if let Some(v) = h.timeout_secs {
            self.http.timeout_secs = v;
        }
        if let Some(v) = h.max_pages {
            self.http.max_pages = v;
        }
        if let Some(v) = h.concurrency {
            self.http.concurrency = v.max(1);
        }

        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let names: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  options:  interval={}s, jitter={}s, version={}",
            self.options.interval,
            self.options.jitter,
            self.options.version
        );
        tracing::info!(
            "  http:     timeout={}s, max_pages={}, concurrency={}",
            self.http.timeout_secs,
            self.http.max_pages,
            self.http.concurrency
        );
        tracing::info!("  secrets:  [{}]", names.join(", "));
    }
}

// ── Run options ───────────────────────────────────────────────

/// Options consumed by the scheduling layer. The query engine never reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Seconds between runs.
    pub interval: u64,
    /// Random delay added to each interval, in seconds.
    pub jitter: u64,
    /// Row protocol version.
    pub version: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            interval: 60,
            jitter: 5,
            version: 1,
        }
    }
}

impl RunOptions {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            interval: profiled_env_parse(p, "PANCAKE_INTERVAL", d.interval),
            jitter: profiled_env_parse(p, "PANCAKE_JITTER", d.jitter),
            version: profiled_env_parse(p, "PANCAKE_VERSION", d.version),
        }
    }
}

// ── HTTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Upper bound on pages fetched by a single paginated query.
    pub max_pages: usize,
    /// Rows executed at once by the runner (1 = sequential).
    pub concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_pages: 1000,
            concurrency: 1,
        }
    }
}

impl HttpConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            timeout_secs: profiled_env_parse(p, "PANCAKE_HTTP_TIMEOUT_SECS", d.timeout_secs),
            max_pages: profiled_env_parse(p, "PANCAKE_MAX_PAGES", d.max_pages),
            concurrency: profiled_env_parse(p, "PANCAKE_CONCURRENCY", d.concurrency).max(1),
        }
    }
}

// ── TOML overlay ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileOverlay {
    secrets: Secrets,
    options: OptionsOverlay,
    http: HttpOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionsOverlay {
    interval: Option<u64>,
    jitter: Option<u64>,
    version: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HttpOverlay {
    timeout_secs: Option<u64>,
    max_pages: Option<usize>,
    concurrency: Option<usize>,
}
