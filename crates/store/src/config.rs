//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `POCKET_CART_DIR` - Directory holding persisted slots (default: .pocket-cart)
//! - `POCKET_CART_NAMESPACE` - Namespace prefix of the storage key (default: pocket-cart)
//! - `POCKET_CART_STRICT_HYDRATION` - Fail on a corrupt snapshot instead of
//!   starting empty (default: false)

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageKey;

const DEFAULT_STORAGE_DIR: &str = ".pocket-cart";
const DEFAULT_NAMESPACE: &str = "pocket-cart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory used by the file storage backend
    pub storage_dir: PathBuf,
    /// Namespace prefix of the persistence key
    pub namespace: String,
    /// Whether a corrupt snapshot is an error rather than an empty cart
    pub strict_hydration: bool,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            namespace: DEFAULT_NAMESPACE.to_string(),
            strict_hydration: false,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_dir = non_empty(lookup("POCKET_CART_DIR"))
            .map_or(defaults.storage_dir, PathBuf::from);

        let namespace = match non_empty(lookup("POCKET_CART_NAMESPACE")) {
            Some(ns) if ns.contains(char::is_whitespace) => {
                return Err(ConfigError::InvalidEnvVar(
                    "POCKET_CART_NAMESPACE".to_string(),
                    "must not contain whitespace".to_string(),
                ));
            }
            Some(ns) => ns,
            None => defaults.namespace,
        };

        let strict_hydration = match non_empty(lookup("POCKET_CART_STRICT_HYDRATION")) {
            Some(value) => parse_bool("POCKET_CART_STRICT_HYDRATION", &value)?,
            None => defaults.strict_hydration,
        };

        Ok(Self {
            storage_dir,
            namespace,
            strict_hydration,
        })
    }

    /// Override the storage directory.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Override the key namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Override strict hydration.
    #[must_use]
    pub const fn with_strict_hydration(mut self, strict: bool) -> Self {
        self.strict_hydration = strict;
        self
    }

    /// The key of the slot holding the persisted cart.
    #[must_use]
    pub fn storage_key(&self) -> StorageKey {
        StorageKey::products(&self.namespace)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            format!("expected true or false, got {value:?}"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<CartConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CartConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, CartConfig::default());
        assert_eq!(config.storage_key().as_str(), "pocket-cart:products");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config_from(&[
            ("POCKET_CART_DIR", "/tmp/carts"),
            ("POCKET_CART_NAMESPACE", "@GoMarketplace"),
            ("POCKET_CART_STRICT_HYDRATION", "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.storage_dir, PathBuf::from("/tmp/carts"));
        assert_eq!(config.storage_key().as_str(), "@GoMarketplace:products");
        assert!(config.strict_hydration);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("POCKET_CART_NAMESPACE", "  "),
            ("POCKET_CART_DIR", ""),
        ])
        .unwrap();
        assert_eq!(config, CartConfig::default());
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let err = config_from(&[("POCKET_CART_STRICT_HYDRATION", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("POCKET_CART_STRICT_HYDRATION"));
    }

    #[test]
    fn test_namespace_with_whitespace_is_rejected() {
        assert!(config_from(&[("POCKET_CART_NAMESPACE", "my app")]).is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = CartConfig::default()
            .with_storage_dir("/data")
            .with_namespace("shop")
            .with_strict_hydration(true);

        assert_eq!(config.storage_dir, PathBuf::from("/data"));
        assert_eq!(config.storage_key().as_str(), "shop:products");
        assert!(config.strict_hydration);
    }
}
