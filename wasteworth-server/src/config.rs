use std::{
    env,
    fmt::Display,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use tracing::info;
use wasteworth_core::plugin::BackendId;

#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub backend: BackendId,
    /// JSON file with initial collectors for the memory backend.
    pub seed_path: Option<PathBuf>,
    /// Root of the upstream directory API; enables the remote backend.
    pub remote_url: Option<String>,
    pub lookup_timeout: Duration,
}

impl Config {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_ms: u64 = try_load(&lookup, "WASTEWORTH_LOOKUP_TIMEOUT_MS", "2000")?;

        Ok(Self {
            host: try_load(&lookup, "WASTEWORTH_HOST", &Ipv4Addr::UNSPECIFIED.to_string())?,
            port: try_load(&lookup, "WASTEWORTH_PORT", "8080")?,
            backend: BackendId(try_load(&lookup, "WASTEWORTH_BACKEND", "memory")?),
            seed_path: optional(&lookup, "WASTEWORTH_SEED").map(PathBuf::from),
            remote_url: optional(&lookup, "WASTEWORTH_REMOTE_URL"),
            lookup_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = optional(lookup, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
        value: raw.clone(),
    })
}
