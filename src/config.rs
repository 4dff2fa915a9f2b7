//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::worker::ManagerConfig;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent name for identification.
    pub name: String,
    /// Address the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Simulated latency of each price lookup.
    pub work_delay: Duration,
    /// Upper bound on a single task (None = unbounded).
    pub task_timeout: Option<Duration>,
    /// How long finished tasks are kept (None = forever).
    pub retention: Option<Duration>,
    /// How often the retention sweep runs.
    pub sweep_interval: Duration,
    /// Upstream price endpoint. The mock table is used when unset.
    pub price_url: Option<String>,
    /// Directory for rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "finance-agent".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8001,
            work_delay: Duration::from_secs(2),
            task_timeout: None,
            retention: None,
            sweep_interval: Duration::from_secs(60), // 1 minute
            price_url: None,
            log_dir: None,
        }
    }
}

impl AgentConfig {
    /// Build the config from `FINANCE_AGENT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            name: defaults.name,
            host: get("FINANCE_AGENT_HOST").unwrap_or(defaults.host),
            port: parse(&get, "FINANCE_AGENT_PORT")?.unwrap_or(defaults.port),
            work_delay: parse(&get, "FINANCE_AGENT_WORK_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.work_delay),
            task_timeout: parse(&get, "FINANCE_AGENT_TASK_TIMEOUT_SECS")?.map(Duration::from_secs),
            retention: parse(&get, "FINANCE_AGENT_RETENTION_SECS")?.map(Duration::from_secs),
            sweep_interval: match parse::<u64, _>(&get, "FINANCE_AGENT_SWEEP_INTERVAL_SECS")? {
                Some(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "FINANCE_AGENT_SWEEP_INTERVAL_SECS".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                Some(secs) => Duration::from_secs(secs),
                None => defaults.sweep_interval,
            },
            price_url: get("FINANCE_AGENT_PRICE_URL"),
            log_dir: get("FINANCE_AGENT_LOG_DIR").map(PathBuf::from),
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The subset of settings the task manager needs.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            task_timeout: self.task_timeout,
            retention: self.retention,
        }
    }
}

fn parse<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}
