//! Store configuration loading from config.toml
//!
//! This module loads the sync settings and the seed catalog from a TOML file.
//! The seed catalog is written to storage by the admin store the first time it
//! opens against an empty `adminProducts` key.

use crate::core::order::TransitionPolicy;
use crate::core::product::{Category, Product};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Storefront polling and order workflow settings
    #[serde(default)]
    pub sync: SyncConfig,
    /// Products to seed the admin catalog with
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// `[sync]` table
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SyncConfig {
    /// How often the storefront re-reads the admin snapshot, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Whether order status changes must follow the fulfilment graph
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            transition_policy: TransitionPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Poll interval as a `Duration`, never shorter than one millisecond
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Configuration for a single seed product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Display name
    pub name: String,
    /// List price before discount
    pub original_price: f64,
    /// Selling price
    pub price: f64,
    /// Category slug (e.g., "electronics")
    pub category: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Image URL
    #[serde(default)]
    pub image: String,
    /// Units in stock
    #[serde(default)]
    pub stock: u32,
}

impl Config {
    /// Builds the seed catalog, numbering products from 1 in file order.
    ///
    /// An empty `[[products]]` list yields the single default product.
    #[must_use]
    pub fn seed_catalog(&self) -> Vec<Product> {
        if self.products.is_empty() {
            return vec![Product::default_product()];
        }
        self.products
            .iter()
            .zip(1_i64..)
            .map(|(p, id)| Product {
                id,
                name: p.name.clone(),
                original_price: p.original_price,
                price: p.price,
                category: Category::from(p.category.clone()),
                description: p.description.clone(),
                image: p.image.clone(),
                stock: p.stock,
            })
            .collect()
    }
}

/// Loads store configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A product entry is missing a required field
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from the default location (./config.toml)
///
/// A missing file is not an error: the defaults (2 s polling, permissive
/// transitions, single default product) are used instead.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::info!("No config.toml found, using default store configuration");
        return Ok(Config::default());
    }
    load_config(path)
}
