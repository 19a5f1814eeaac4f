//! Runtime configuration
//!
//! Values come from the environment (optionally loaded from `.env` by the
//! binaries). Every field has a default so the library works unconfigured.

use crate::error::InterpreterError;
use crate::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::env;
use std::str::FromStr;
use std::sync::Arc;

/// Knobs for the dialogue and handler layer
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Pending dialogue states older than this are ignored
    pub context_ttl_secs: i64,
    /// How many past contexts a session keeps for recovery
    pub context_history_limit: usize,
    /// Payment term used when a sale/expense is "fiado" with no date
    pub default_payment_term_days: u64,
    /// Products at or below this quantity are reported as low stock
    pub low_stock_threshold: i64,
    /// Max products shown in catalog listings
    pub max_listed_products: usize,
    /// Key mixed into confirmation fingerprints; random per process if unset
    pub confirmation_secret: Option<String>,
    /// Proposals older than this are refused at execution time
    pub confirmation_ttl_secs: i64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: 600,
            context_history_limit: 5,
            default_payment_term_days: 30,
            low_stock_threshold: 5,
            max_listed_products: 20,
            confirmation_secret: None,
            confirmation_ttl_secs: 86_400,
        }
    }
}

impl InterpreterConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            context_ttl_secs: env_or("CONTEXT_TTL_SECS", defaults.context_ttl_secs)?,
            context_history_limit: env_or("CONTEXT_HISTORY_LIMIT", defaults.context_history_limit)?,
            default_payment_term_days: env_or(
                "DEFAULT_PAYMENT_TERM_DAYS",
                defaults.default_payment_term_days,
            )?,
            low_stock_threshold: env_or("LOW_STOCK_THRESHOLD", defaults.low_stock_threshold)?,
            max_listed_products: env_or("MAX_LISTED_PRODUCTS", defaults.max_listed_products)?,
            confirmation_secret: env::var("CONFIRMATION_SECRET").ok(),
            confirmation_ttl_secs: env_or("CONFIRMATION_TTL_SECS", defaults.confirmation_ttl_secs)?,
        })
    }
}

/// Settings for the HTTP adapter binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub ledger_api_base_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .or_else(|_| env::var("API_PORT"))
            .unwrap_or_else(|_| "8080".to_string());

        let port = port
            .parse::<u16>()
            .map_err(|e| InterpreterError::ConfigError(format!("invalid PORT '{}': {}", port, e)))?;

        Ok(Self {
            port,
            database_url: env::var("POSTGRES_URL").or_else(|_| env::var("DATABASE_URL")).ok(),
            ledger_api_base_url: env::var("LEDGER_API_BASE_URL").ok(),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            InterpreterError::ConfigError(format!("invalid value for {}: {}", key, e))
        }),
        _ => Ok(default),
    }
}

//
// ================= Clock =================
//

/// Source of "today" for date extraction and scheduling
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single day, used in tests and replays
pub struct FixedClock {
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.context_history_limit, 5);
        assert_eq!(config.default_payment_term_days, 30);
    }

    #[test]
    fn test_env_override_and_invalid_value() {
        env::set_var("LOW_STOCK_THRESHOLD", "9");
        let config = InterpreterConfig::from_env().unwrap();
        assert_eq!(config.low_stock_threshold, 9);

        env::set_var("LOW_STOCK_THRESHOLD", "many");
        assert!(InterpreterConfig::from_env().is_err());
        env::remove_var("LOW_STOCK_THRESHOLD");
    }
}
