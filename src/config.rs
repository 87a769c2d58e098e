//! Runtime configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_SIGN_IN_MAX_FAILURES: usize = 5;
pub const DEFAULT_SIGN_IN_WINDOW_SECS: u64 = 300;
pub const DEFAULT_LOADING_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInLimitConfig {
    pub max_failures: usize,
    pub window: Duration,
}

impl Default for SignInLimitConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_SIGN_IN_MAX_FAILURES,
            window: Duration::from_secs(DEFAULT_SIGN_IN_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    /// Below this length the in-memory provider reports a weak password.
    pub min_password_len: usize,
    /// Delete the new principal when its profile write fails.
    pub compensate_profile_failure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { min_password_len: DEFAULT_MIN_PASSWORD_LEN, compensate_profile_failure: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingConfig {
    /// `None` disables the route guard's loading fallback.
    pub loading_timeout: Option<Duration>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { loading_timeout: Some(Duration::from_secs(DEFAULT_LOADING_TIMEOUT_SECS)) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub sign_in_limit: SignInLimitConfig,
    pub routing: RoutingConfig,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `MATE_MIN_PASSWORD_LEN`: default 6
    /// - `MATE_SIGN_IN_MAX_FAILURES`: default 5
    /// - `MATE_SIGN_IN_WINDOW_SECS`: default 300
    /// - `MATE_COMPENSATE_PROFILE_FAILURE`: default false
    /// - `MATE_LOADING_TIMEOUT_SECS`: default 15, `0` disables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is present but unparseable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth = AuthConfig {
            min_password_len: env_parse(&lookup, "MATE_MIN_PASSWORD_LEN", DEFAULT_MIN_PASSWORD_LEN)?,
            compensate_profile_failure: env_bool(&lookup, "MATE_COMPENSATE_PROFILE_FAILURE")?.unwrap_or(false),
        };
        let sign_in_limit = SignInLimitConfig {
            max_failures: env_parse(&lookup, "MATE_SIGN_IN_MAX_FAILURES", DEFAULT_SIGN_IN_MAX_FAILURES)?,
            window: Duration::from_secs(env_parse(&lookup, "MATE_SIGN_IN_WINDOW_SECS", DEFAULT_SIGN_IN_WINDOW_SECS)?),
        };
        let timeout_secs = env_parse(&lookup, "MATE_LOADING_TIMEOUT_SECS", DEFAULT_LOADING_TIMEOUT_SECS)?;
        let routing = RoutingConfig { loading_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)) };

        Ok(Self { auth, sign_in_limit, routing })
    }
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: key.to_owned(), value: raw }),
    }
}

fn env_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid { var: key.to_owned(), value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
