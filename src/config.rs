use std::str::FromStr;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "CareWatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SAFETY_URL: &str = "http://localhost:8080";
pub const DEFAULT_SAFETY_PATH: &str = "/safety-check";
/// Transport timeout of the safety-check client; kept below the monitor's
/// response ceiling so transport errors surface first.
pub const DEFAULT_SAFETY_TIMEOUT_SECS: u64 = 20;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "medgemma:4b";
pub const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 120;

pub const ENV_DEBOUNCE_MS: &str = "CAREWATCH_DEBOUNCE_MS";
pub const ENV_RESPONSE_TIMEOUT_SECS: &str = "CAREWATCH_RESPONSE_TIMEOUT_SECS";
pub const ENV_SAFETY_URL: &str = "CAREWATCH_SAFETY_URL";
pub const ENV_SAFETY_TOKEN: &str = "CAREWATCH_SAFETY_TOKEN";
pub const ENV_OLLAMA_URL: &str = "CAREWATCH_OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "CAREWATCH_OLLAMA_MODEL";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "carewatch_lib=debug,warn"
    } else {
        "carewatch_lib=info,warn"
    }
}

/// Timing of the debounced safety monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub debounce: Duration,
    /// Ceiling on one remote call; elapsed surfaces as a transient error.
    pub response_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            response_timeout: Duration::from_secs(DEFAULT_RESPONSE_TIMEOUT_SECS),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            debounce: Duration::from_millis(parse_or(
                &lookup,
                ENV_DEBOUNCE_MS,
                DEFAULT_DEBOUNCE_MS,
            )),
            response_timeout: Duration::from_secs(parse_or(
                &lookup,
                ENV_RESPONSE_TIMEOUT_SECS,
                defaults.response_timeout.as_secs(),
            ))
            .max(Duration::from_secs(1)),
        }
    }
}

/// Remote safety-check service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyServiceConfig {
    pub base_url: String,
    pub path: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SafetyServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SAFETY_URL.to_string(),
            path: DEFAULT_SAFETY_PATH.to_string(),
            auth_token: None,
            timeout_secs: DEFAULT_SAFETY_TIMEOUT_SECS,
        }
    }
}

impl SafetyServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup(ENV_SAFETY_URL).unwrap_or(defaults.base_url),
            auth_token: lookup(ENV_SAFETY_TOKEN),
            ..defaults
        }
    }
}

/// Local Ollama instance used by the chat extraction path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: DEFAULT_OLLAMA_TIMEOUT_SECS,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup(ENV_OLLAMA_URL).unwrap_or(defaults.base_url),
            model: lookup(ENV_OLLAMA_MODEL).unwrap_or(defaults.model),
            ..defaults
        }
    }
}

/// Non-blank environment value.
fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default = %default, "Unparsable config value, using default");
                default
            }
        },
        None => default,
    }
}
