//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chkobba::{LobbyConfig, stake::Stake};
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:3001";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape endpoint; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Queue, matching and match actor settings
    pub lobby: LobbyConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `stakes_override` - Optional stake allow-list override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        stakes_override: Option<Vec<Stake>>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or(default_bind()?),
        };
        let metrics_bind = parse_addr("METRICS_BIND")?;

        let defaults = LobbyConfig::default();
        let valid_stakes = match stakes_override {
            Some(stakes) => stakes,
            None => match std::env::var("VALID_STAKES") {
                Ok(raw) => parse_stakes(&raw).map_err(|reason| ConfigError::Invalid {
                    var: "VALID_STAKES".to_string(),
                    reason,
                })?,
                Err(_) => defaults.valid_stakes.clone(),
            },
        };

        let lobby = LobbyConfig {
            valid_stakes,
            queue_wait_secs: parse_env_or("QUEUE_WAIT_SECS", defaults.queue_wait_secs),
            queue_max_wait_secs: parse_env_or("QUEUE_MAX_WAIT_SECS", defaults.queue_max_wait_secs),
            matching_interval_ms: parse_env_or(
                "MATCHING_INTERVAL_MS",
                defaults.matching_interval_ms,
            ),
            fallback_think_ms: parse_env_or("FALLBACK_THINK_MS", defaults.fallback_think_ms),
            ..defaults
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            lobby,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(metrics_bind) = self.metrics_bind
            && metrics_bind == self.bind
        {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from SERVER_BIND ({})", self.bind),
            });
        }

        self.lobby.validate().map_err(|reason| ConfigError::Invalid {
            var: "lobby".to_string(),
            reason,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a comma separated stake list such as `1,3,5,10`.
pub fn parse_stakes(raw: &str) -> Result<Vec<Stake>, String> {
    let stakes = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Stake>()
                .map_err(|e| format!("'{s}' is not a stake amount: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if stakes.is_empty() {
        return Err("At least one stake must be listed".to_string());
    }
    Ok(stakes)
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::MissingRequired {
        var: "SERVER_BIND".to_string(),
        hint: "Set an address such as 127.0.0.1:3001".to_string(),
    })
}

fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|e| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{raw}' is not a socket address: {e}"),
        }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:3001".parse().unwrap(),
            metrics_bind: None,
            lobby: LobbyConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "VALID_STAKES".to_string(),
            reason: "empty".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("VALID_STAKES"));
        assert!(msg.contains("empty"));
    }

    #[test]
    fn test_parse_stakes() {
        assert_eq!(parse_stakes("1,3, 5 ,10").unwrap(), vec![1, 3, 5, 10]);
        assert_eq!(parse_stakes("7").unwrap(), vec![7]);
        assert!(parse_stakes("").is_err());
        assert!(parse_stakes(" , ").is_err());
        assert!(parse_stakes("1,two").is_err());
        assert!(parse_stakes("-3").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
        assert_eq!(DEFAULT_BIND.parse::<SocketAddr>().unwrap(), config().bind);
    }

    #[test]
    fn test_config_validation_zero_stake() {
        let mut config = config();
        config.lobby.valid_stakes = vec![0, 5];

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_wait_not_below_max_wait() {
        let mut config = config();
        config.lobby.queue_wait_secs = 30;
        config.lobby.queue_max_wait_secs = 30;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_metrics_bind_collides() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "METRICS_BIND"));
    }
}
