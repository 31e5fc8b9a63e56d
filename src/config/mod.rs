use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the rewards service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub policy: RewardPolicyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            policy: RewardPolicyConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Policy dials for the reward calculator.
///
/// Percentages are whole percent (10 means 10% of net margin); all amounts
/// are integer cents. The minimum clamp may be zero, which disables it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RewardPolicyConfig {
    pub tier_percent: u8,
    pub min_reward_cents: i64,
    pub max_reward_cents: i64,
    pub operating_buffer_cents: i64,
}

impl RewardPolicyConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let tier_percent = parse_env("REWARD_TIER_PERCENT", defaults.tier_percent)?;
        let min_reward_cents = parse_env("REWARD_MIN_CENTS", defaults.min_reward_cents)?;
        let max_reward_cents = parse_env("REWARD_MAX_CENTS", defaults.max_reward_cents)?;
        let operating_buffer_cents =
            parse_env("REWARD_BUFFER_CENTS", defaults.operating_buffer_cents)?;

        let policy = Self {
            tier_percent,
            min_reward_cents,
            max_reward_cents,
            operating_buffer_cents,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tier_percent > 100 {
            return Err(ConfigError::InvalidPolicy {
                detail: "REWARD_TIER_PERCENT must be between 0 and 100",
            });
        }
        if self.min_reward_cents < 0
            || self.max_reward_cents < 0
            || self.operating_buffer_cents < 0
        {
            return Err(ConfigError::InvalidPolicy {
                detail: "reward policy amounts must be non-negative cents",
            });
        }
        if self.min_reward_cents > self.max_reward_cents {
            return Err(ConfigError::InvalidPolicy {
                detail: "REWARD_MIN_CENTS must not exceed REWARD_MAX_CENTS",
            });
        }
        Ok(())
    }
}

impl Default for RewardPolicyConfig {
    fn default() -> Self {
        Self {
            tier_percent: 10,
            min_reward_cents: 0,
            max_reward_cents: 50_000,
            operating_buffer_cents: 50,
        }
    }
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidPolicyValue { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPolicyValue { key: &'static str },
    InvalidPolicy { detail: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPolicyValue { key } => {
                write!(f, "{key} must be a valid integer")
            }
            ConfigError::InvalidPolicy { detail } => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("REWARD_TIER_PERCENT");
        env::remove_var("REWARD_MIN_CENTS");
        env::remove_var("REWARD_MAX_CENTS");
        env::remove_var("REWARD_BUFFER_CENTS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.policy, RewardPolicyConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn policy_overrides_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REWARD_TIER_PERCENT", "15");
        env::set_var("REWARD_BUFFER_CENTS", "125");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.policy.tier_percent, 15);
        assert_eq!(config.policy.operating_buffer_cents, 125);
    }

    #[test]
    fn inverted_clamp_bounds_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REWARD_MIN_CENTS", "1000");
        env::set_var("REWARD_MAX_CENTS", "100");
        let err = AppConfig::load().expect_err("inverted bounds rejected");
        assert!(err.to_string().contains("REWARD_MIN_CENTS"));
    }
}
