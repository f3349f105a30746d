use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

// ── defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POLL_MS: u64 = 2_000;

const ENV_CONFIG_FILE: &str = "DEPLOY_CONSOLE_CONFIG";
const ENV_API_BASE: &str = "DEPLOY_CONSOLE_API_BASE";
const ENV_TIMEOUT_MS: &str = "DEPLOY_CONSOLE_TIMEOUT_MS";
const ENV_POLL_MS: &str = "DEPLOY_CONSOLE_POLL_MS";
const ENV_DEPLOY_METHOD: &str = "DEPLOY_CONSOLE_DEPLOY_METHOD";

static CONFIG: OnceLock<ConsoleConfig> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("console configuration already initialized")]
    AlreadyInitialized,
}

/// HTTP verb used for the deploy action.
///
/// The control plane currently exposes deploy as `GET /app/{id}/deploy/`.
/// The client still treats it as a mutating action whatever the verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeployMethod {
    Get,
    Post,
}

impl DeployMethod {
    pub fn as_http(self) -> http::Method {
        match self {
            DeployMethod::Get => http::Method::GET,
            DeployMethod::Post => http::Method::POST,
        }
    }

    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(DeployMethod::Get),
            "POST" => Ok(DeployMethod::Post),
            other => Err(ConfigError::Invalid {
                field: "deploy_method",
                reason: format!("expected GET or POST, got {other:?}"),
            }),
        }
    }
}

/// Process-wide console settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Control-plane base URL without trailing slash, e.g. `http://localhost:8000`.
    pub api_base: String,
    /// Upper bound applied to every remote call.
    pub request_timeout: Duration,
    /// Revalidation interval for deployment detail views.
    pub deployment_poll_interval: Duration,
    pub deploy_method: DeployMethod,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            deployment_poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            deploy_method: DeployMethod::Get,
        }
    }
}

/// On-disk shape; every field optional so a file may override a subset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_base: Option<String>,
    request_timeout_ms: Option<u64>,
    deployment_poll_ms: Option<u64>,
    deploy_method: Option<DeployMethod>,
}

impl ConsoleConfig {
    /// Builds a config from a base URL with every other field defaulted.
    pub fn with_api_base(api_base: impl Into<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self {
            api_base: api_base.into(),
            ..Self::default()
        };
        cfg.normalize()?;
        Ok(cfg)
    }

    /// Loads defaults, then the YAML file named by `DEPLOY_CONSOLE_CONFIG`
    /// (if set), then individual `DEPLOY_CONSOLE_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(path) = lookup(ENV_CONFIG_FILE).filter(|p| !p.trim().is_empty()) {
            cfg.apply_file(Path::new(path.trim()))?;
        }

        if let Some(base) = lookup(ENV_API_BASE) {
            cfg.api_base = base;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            cfg.request_timeout = Duration::from_millis(parse_millis("request_timeout", &ms)?);
        }
        if let Some(ms) = lookup(ENV_POLL_MS) {
            cfg.deployment_poll_interval =
                Duration::from_millis(parse_millis("deployment_poll_interval", &ms)?);
        }
        if let Some(method) = lookup(ENV_DEPLOY_METHOD) {
            cfg.deploy_method = DeployMethod::parse(&method)?;
        }

        cfg.normalize()?;
        log::info!(
            "config: api_base={} timeout={:?} poll={:?} deploy_method={:?}",
            cfg.api_base,
            cfg.request_timeout,
            cfg.deployment_poll_interval,
            cfg.deploy_method
        );
        Ok(cfg)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: ConfigFile = if raw.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        };

        if let Some(base) = file.api_base {
            self.api_base = base;
        }
        if let Some(ms) = file.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.deployment_poll_ms {
            self.deployment_poll_interval = Duration::from_millis(ms);
        }
        if let Some(method) = file.deploy_method {
            self.deploy_method = method;
        }
        log::info!("config: loaded overrides from {}", path.display());
        Ok(())
    }

    fn normalize(&mut self) -> Result<(), ConfigError> {
        let base = self.api_base.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "api_base",
                reason: format!("expected an absolute http(s) URL, got {:?}", self.api_base),
            });
        }
        self.api_base = base.to_string();

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "request_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Joins a resource path (leading slash) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

fn parse_millis(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{raw:?}: {e}"),
    })
}

// ── process-wide access ───────────────────────────────────────────────────────

/// Installs the process-wide configuration. Call once at startup.
pub fn init(config: ConsoleConfig) -> Result<&'static ConsoleConfig, ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    Ok(get())
}

/// Returns the installed configuration, falling back to defaults when
/// `init` was never called.
pub fn get() -> &'static ConsoleConfig {
    CONFIG.get_or_init(ConsoleConfig::default)
}
