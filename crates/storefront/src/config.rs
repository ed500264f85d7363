//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FRESHCART_API_BASE_URL` - Commerce API root, must end with `/`
//!   (default: `https://ecommerce.routemisr.com/api/`)
//! - `FRESHCART_QUANTITY_DEBOUNCE_MS` - Quiet period before a quantity change
//!   is sent (default: 500)
//! - `FRESHCART_STOCK_CEILING` - Quantity ceiling when stock is unknown
//!   (default: 999)
//! - `FRESHCART_NOTICE_LINGER_MS` - How long a settled notice stays up
//!   (default: 4000)
//! - `FRESHCART_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `FRESHCART_CHECKOUT_RETURN_URL` - Where the payment page sends the
//!   shopper back to (default: `http://localhost:3000`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://ecommerce.routemisr.com/api/";
const DEFAULT_QUANTITY_DEBOUNCE_MS: u64 = 500;
const DEFAULT_STOCK_CEILING: u32 = 999;
const DEFAULT_NOTICE_LINGER_MS: u64 = 4000;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CHECKOUT_RETURN_URL: &str = "http://localhost:3000";

/// Configuration errors that can occur during loading.
///
/// Every variable has a default, so only a bad value is an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Commerce API connection settings
    pub commerce: CommerceConfig,
    /// Cart behavior tuning
    pub cart: CartConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Commerce API connection settings.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    pub base_url: Url,
    pub catalog_cache_ttl: Duration,
    pub checkout_return_url: String,
}

/// Cart behavior tuning.
#[derive(Debug, Clone, Copy)]
pub struct CartConfig {
    /// Quiet period after the last quantity click
    pub quantity_debounce: Duration,
    /// Ceiling used when a product's stock is unknown
    pub stock_ceiling: u32,
    /// How long a success, warning or error notice stays up
    pub notice_linger: Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            quantity_debounce: Duration::from_millis(DEFAULT_QUANTITY_DEBOUNCE_MS),
            stock_ceiling: DEFAULT_STOCK_CEILING,
            notice_linger: Duration::from_millis(DEFAULT_NOTICE_LINGER_MS),
        }
    }
}

impl CommerceConfig {
    /// Defaults for everything but the API root.
    #[must_use]
    pub fn for_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            checkout_return_url: DEFAULT_CHECKOUT_RETURN_URL.to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "FRESHCART_API_BASE_URL",
            &get_env_or_default(&lookup, "FRESHCART_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let debounce_ms = parse_number::<u64>(
            &lookup,
            "FRESHCART_QUANTITY_DEBOUNCE_MS",
            DEFAULT_QUANTITY_DEBOUNCE_MS,
        )?;
        let stock_ceiling =
            parse_number::<u32>(&lookup, "FRESHCART_STOCK_CEILING", DEFAULT_STOCK_CEILING)?;
        if stock_ceiling == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "FRESHCART_STOCK_CEILING".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let notice_linger_ms =
            parse_number::<u64>(&lookup, "FRESHCART_NOTICE_LINGER_MS", DEFAULT_NOTICE_LINGER_MS)?;
        let cache_ttl_secs = parse_number::<u64>(
            &lookup,
            "FRESHCART_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        Ok(Self {
            commerce: CommerceConfig {
                base_url,
                catalog_cache_ttl: Duration::from_secs(cache_ttl_secs),
                checkout_return_url: get_env_or_default(
                    &lookup,
                    "FRESHCART_CHECKOUT_RETURN_URL",
                    DEFAULT_CHECKOUT_RETURN_URL,
                ),
            },
            cart: CartConfig {
                quantity_debounce: Duration::from_millis(debounce_ms),
                stock_ceiling,
                notice_linger: Duration::from_millis(notice_linger_ms),
            },
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Defaults everywhere, pointed at `base_url`.
    #[must_use]
    pub fn for_base_url(base_url: Url) -> Self {
        Self {
            commerce: CommerceConfig::for_base_url(base_url),
            cart: CartConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating blank as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_env_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(lookup, key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Endpoint paths are joined onto the base, which drops the last segment
/// unless the base ends with `/`.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must end with '/'".to_string(),
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.commerce.base_url.as_str(), DEFAULT_API_BASE_URL);
        assert_eq!(config.cart.quantity_debounce, Duration::from_millis(500));
        assert_eq!(config.cart.stock_ceiling, 999);
        assert_eq!(config.cart.notice_linger, Duration::from_secs(4));
        assert_eq!(config.commerce.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.commerce.checkout_return_url, "http://localhost:3000");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("FRESHCART_API_BASE_URL", "http://127.0.0.1:8080/api/"),
            ("FRESHCART_QUANTITY_DEBOUNCE_MS", "250"),
            ("FRESHCART_STOCK_CEILING", "50"),
            ("FRESHCART_NOTICE_LINGER_MS", "1500"),
            ("SENTRY_DSN", "  "),
            ("SENTRY_ENVIRONMENT", "staging"),
        ])
        .unwrap();
        assert_eq!(config.commerce.base_url.as_str(), "http://127.0.0.1:8080/api/");
        assert_eq!(config.cart.quantity_debounce, Duration::from_millis(250));
        assert_eq!(config.cart.stock_ceiling, 50);
        assert_eq!(config.cart.notice_linger, Duration::from_millis(1500));
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_base_url_needs_trailing_slash() {
        let err = load(&[("FRESHCART_API_BASE_URL", "https://example.com/api")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "FRESHCART_API_BASE_URL"));
    }

    #[test]
    fn test_base_url_scheme() {
        assert!(load(&[("FRESHCART_API_BASE_URL", "ftp://example.com/")]).is_err());
        assert!(load(&[("FRESHCART_API_BASE_URL", "not a url")]).is_err());
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(load(&[("FRESHCART_QUANTITY_DEBOUNCE_MS", "soon")]).is_err());
        assert!(load(&[("FRESHCART_STOCK_CEILING", "-1")]).is_err());
        assert!(load(&[("FRESHCART_STOCK_CEILING", "0")]).is_err());
        assert!(load(&[("FRESHCART_NOTICE_LINGER_MS", "later")]).is_err());
    }

    #[test]
    fn test_only_bad_values_fail() {
        // No variable is required; an empty environment loads.
        assert!(load(&[]).is_ok());

        let err = load(&[("FRESHCART_CATALOG_CACHE_TTL_SECS", "1h")]).unwrap_err();
        let ConfigError::InvalidEnvVar(key, reason) = err;
        assert_eq!(key, "FRESHCART_CATALOG_CACHE_TTL_SECS");
        assert!(!reason.is_empty());
    }
}
