//! Server configuration, populated from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use i14y_structure::Lang;

/// A variable that is set but cannot be used.
#[derive(Debug, thiserror::Error)]
#[error("{name}={value:?}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime configuration of the editing service.
///
/// Every field has a default, so the server starts with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `I14Y_BIND` | `0.0.0.0:5000` | TCP socket address to listen on |
/// | `I14Y_SESSION_TTL_SECS` | `3600` | Inactivity after which a session is evicted |
/// | `I14Y_SWEEP_INTERVAL_SECS` | `300` | Seconds between eviction sweeps |
/// | `I14Y_CATALOGUE_API` | `https://input.i14y.admin.ch/api/Catalog` | Base URL of concept and dataset search |
/// | `I14Y_PUBLIC_API` | `https://api.i14y.admin.ch/api/public/v1` | Base URL of the code list export |
/// | `I14Y_CATALOGUE_TIMEOUT_SECS` | `10` | Timeout of a catalogue request |
/// | `I14Y_MAX_UPLOAD_BYTES` | `16777216` | Request body limit for uploads |
/// | `I14Y_DEFAULT_LANG` | `de` | Language of plain-string labels |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub catalogue_api: String,
    pub public_api: String,
    pub catalogue_timeout: Duration,
    pub max_upload_bytes: usize,
    pub default_lang: Lang,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            session_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
            catalogue_api: "https://input.i14y.admin.ch/api/Catalog".into(),
            public_api: "https://api.i14y.admin.ch/api/public/v1".into(),
            catalogue_timeout: Duration::from_secs(10),
            max_upload_bytes: 16 * 1024 * 1024,
            default_lang: Lang::De,
        }
    }
}

impl ServerConfig {
    /// Populate config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Populate config from `lookup`, applying defaults for absent variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let secs = |name: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(v) => match v.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
                    _ => Err(ConfigError {
                        name,
                        value: v,
                        reason: "expected a positive number of seconds".into(),
                    }),
                },
            }
        };

        let bind_addr = match lookup("I14Y_BIND") {
            None => defaults.bind_addr,
            Some(v) => v.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError {
                name: "I14Y_BIND",
                value: v.clone(),
                reason: e.to_string(),
            })?,
        };
        let max_upload_bytes = match lookup("I14Y_MAX_UPLOAD_BYTES") {
            None => defaults.max_upload_bytes,
            Some(v) => v.trim().parse().map_err(|_| ConfigError {
                name: "I14Y_MAX_UPLOAD_BYTES",
                value: v.clone(),
                reason: "expected a byte count".into(),
            })?,
        };
        let default_lang = match lookup("I14Y_DEFAULT_LANG") {
            None => defaults.default_lang,
            Some(v) => v.parse().map_err(|reason| ConfigError {
                name: "I14Y_DEFAULT_LANG",
                value: v.clone(),
                reason,
            })?,
        };

        Ok(Self {
            bind_addr,
            session_ttl: secs("I14Y_SESSION_TTL_SECS", defaults.session_ttl)?,
            sweep_interval: secs("I14Y_SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            catalogue_api: lookup("I14Y_CATALOGUE_API")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.catalogue_api),
            public_api: lookup("I14Y_PUBLIC_API")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_api),
            catalogue_timeout: secs("I14Y_CATALOGUE_TIMEOUT_SECS", defaults.catalogue_timeout)?,
            max_upload_bytes,
            default_lang,
        })
    }
}
