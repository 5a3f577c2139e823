use std::{env, fmt::Display, str::FromStr, sync::Arc};

use rand::{distributions::Alphanumeric, Rng};

use crate::constants::{
    MAX_AMOUNT_INGREDIENTS, MAX_COOKING_TIME, MIN_AMOUNT_INGREDIENTS, MIN_COOKING_TIME,
    RECIPE_COUNT_PER_PAGE, SESSION_LIFETIME_HOURS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Inclusive bounds applied by the recipe validation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min_cooking_time: i32,
    pub max_cooking_time: i32,
    pub min_amount: i32,
    pub max_amount: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_cooking_time: MIN_COOKING_TIME,
            max_cooking_time: MAX_COOKING_TIME,
            min_amount: MIN_AMOUNT_INGREDIENTS,
            max_amount: MAX_AMOUNT_INGREDIENTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub secret: Arc<str>,
    pub session_hours: i64,
    pub page_size: i64,
    pub limits: Limits,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let limits = Limits {
            min_cooking_time: try_load("FOODGRAM_MIN_COOKING_TIME", MIN_COOKING_TIME)?,
            max_cooking_time: try_load("FOODGRAM_MAX_COOKING_TIME", MAX_COOKING_TIME)?,
            min_amount: try_load("FOODGRAM_MIN_AMOUNT", MIN_AMOUNT_INGREDIENTS)?,
            max_amount: try_load("FOODGRAM_MAX_AMOUNT", MAX_AMOUNT_INGREDIENTS)?,
        };
        if limits.min_cooking_time < 1 || limits.min_cooking_time > limits.max_cooking_time {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_MIN_COOKING_TIME",
                reason: String::from("bounds must satisfy 1 <= min <= max"),
            });
        }
        if limits.min_amount < 1 || limits.min_amount > limits.max_amount {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_MIN_AMOUNT",
                reason: String::from("bounds must satisfy 1 <= min <= max"),
            });
        }

        Ok(Self {
            port: try_load("FOODGRAM_PORT", 8000)?,
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: try_load("FOODGRAM_MAX_CONNECTIONS", 5)?,
            secret: load_secret(),
            session_hours: try_load("FOODGRAM_SESSION_HOURS", SESSION_LIFETIME_HOURS)?,
            page_size: try_load("FOODGRAM_PAGE_SIZE", RECIPE_COUNT_PER_PAGE)?,
            limits,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn load_secret() -> Arc<str> {
    match var("FOODGRAM_SECRET") {
        Some(secret) => Arc::from(secret),
        None => {
            log::warn!("FOODGRAM_SECRET not set, sessions will not survive a restart");
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(48)
                .map(char::from)
                .collect();
            Arc::from(secret)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_fall_back_to_defaults() {
        assert_eq!(try_load("FOODGRAM_TEST_UNSET_KEY", 42_i64).unwrap(), 42);
    }

    #[test]
    fn invalid_values_are_errors() {
        env::set_var("FOODGRAM_TEST_INVALID_KEY", "many");
        let err = try_load("FOODGRAM_TEST_INVALID_KEY", 1_i32).unwrap_err();
        assert!(err.to_string().starts_with("Invalid FOODGRAM_TEST_INVALID_KEY value"));
    }

    #[test]
    fn generated_secret_is_not_empty() {
        env::remove_var("FOODGRAM_SECRET");
        assert_eq!(load_secret().len(), 48);
    }
}
