//! # Gateway Configuration
//!
//! Configuration for the generation client, the configuration store and the
//! pricing catalogs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ATELIER_GENERATION_URL=https://gen.example.com                     │
//! │     ATELIER_STORE_URL=https://api.example.com                          │
//! │     ATELIER_REQUEST_TIMEOUT_SECS=90                                    │
//! │     ATELIER_MAX_RETRIES=5                                              │
//! │     ATELIER_DEFAULT_TIER=oak                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/atelier/atelier.toml (Linux)                             │
//! │     ~/Library/Application Support/com.atelier.atelier/atelier.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost services, "standard" tier at 1500 per m³                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # atelier.toml
//! [generation]
//! base_url = "http://localhost:8000"
//! request_timeout_secs = 120
//! max_retries = 3
//!
//! [store]
//! base_url = "http://localhost:8000"
//!
//! [pricing]
//! default_tier = "standard"
//! height_policy = "declared_height"
//!
//! [[tiers]]
//! name = "standard"
//! description = "Melamine 19 mm"
//! price_per_cubic_meter = "1500"
//!
//! [[supplements]]
//! id = "drawer"
//! kind = "drawer"
//! label = "Soft-close drawer"
//! unit_price = "45"
//! ```

use atelier_core::{
    HeightPolicy, Money, PriceTier, Supplement, SupplementCatalog, SupplementKind, TierCatalog,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::http::{endpoint, RetryPolicy};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "atelier.toml";

// =============================================================================
// Generation Settings
// =============================================================================

/// Settings for the 3D/DXF generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Base URL; requests go to `{base_url}/generate`.
    #[serde(default = "default_service_url")]
    pub base_url: String,

    /// Deadline for one generation attempt (seconds). Generation is slow.
    #[serde(default = "default_generation_timeout")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt on transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Completed artifacts kept in the preview cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    10
}
fn default_cache_capacity() -> u64 {
    256
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            base_url: default_service_url(),
            request_timeout_secs: default_generation_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl GenerationSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Settings for the configuration store REST service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL; records live under `{base_url}/configurations`.
    #[serde(default = "default_service_url")]
    pub base_url: String,

    /// Deadline for one store request (seconds).
    #[serde(default = "default_store_timeout")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Retries for idempotent store requests (deletes).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_store_timeout() -> u64 {
    15
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            base_url: default_service_url(),
            request_timeout_secs: default_store_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl StoreSettings {
    /// Creates are never retried: a timed-out POST may still have been stored.
    pub fn create_policy(&self) -> RetryPolicy {
        RetryPolicy::single_attempt(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn delete_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Pricing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Tier used when the caller names none.
    #[serde(default = "default_tier_name")]
    pub default_tier: String,

    /// Height rule for sloped presets.
    #[serde(default)]
    pub height_policy: HeightPolicy,
}

fn default_tier_name() -> String {
    "standard".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            default_tier: default_tier_name(),
            height_policy: HeightPolicy::default(),
        }
    }
}

/// One `[[tiers]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_per_cubic_meter: Decimal,
}

/// One `[[supplements]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementEntry {
    pub id: String,
    pub kind: SupplementKind,
    #[serde(default)]
    pub label: String,
    pub unit_price: Decimal,
}

fn default_tiers() -> Vec<TierEntry> {
    vec![
        TierEntry {
            name: "standard".to_string(),
            description: "Melamine 19 mm".to_string(),
            price_per_cubic_meter: Decimal::from(1500),
        },
        TierEntry {
            name: "oak".to_string(),
            description: "Solid oak veneer".to_string(),
            price_per_cubic_meter: Decimal::from(2800),
        },
    ]
}

fn default_supplements() -> Vec<SupplementEntry> {
    let entry = |id: &str, kind, label: &str, units: i64| SupplementEntry {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        unit_price: Decimal::from(units),
    };
    vec![
        entry("lacquer", SupplementKind::Material, "Matt lacquer finish", 120),
        entry("plinth", SupplementKind::Base, "Recessed plinth", 35),
        entry("drawer", SupplementKind::Drawer, "Soft-close drawer", 45),
        entry("rail", SupplementKind::WardrobeRail, "Wardrobe rail", 30),
    ]
}

/// Resolved pricing inputs, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct PricingCatalog {
    pub tiers: TierCatalog,
    pub supplements: SupplementCatalog,
    pub default_tier: String,
    pub height_policy: HeightPolicy,
}

// =============================================================================
// Main Gateway Configuration
// =============================================================================

/// Complete gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierEntry>,

    #[serde(default = "default_supplements")]
    pub supplements: Vec<SupplementEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            generation: GenerationSettings::default(),
            store: StoreSettings::default(),
            pricing: PricingSettings::default(),
            tiers: default_tiers(),
            supplements: default_supplements(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (atelier.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> GatewayResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading gateway config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load gateway config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> GatewayResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| GatewayError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GatewayError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| GatewayError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Gateway config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GatewayResult<()> {
        endpoint(&self.generation.base_url, "generate")?;
        endpoint(&self.store.base_url, "configurations")?;

        if self.generation.request_timeout_secs == 0 || self.store.request_timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.generation.cache_capacity == 0 {
            return Err(GatewayError::InvalidConfig(
                "cache_capacity must be greater than 0".into(),
            ));
        }

        let catalog = self.pricing_catalog()?;
        catalog.tiers.get(&catalog.default_tier)?;

        Ok(())
    }

    /// Builds the tier and supplement catalogs from the `[[tiers]]` and
    /// `[[supplements]]` tables.
    pub fn pricing_catalog(&self) -> GatewayResult<PricingCatalog> {
        if self.tiers.is_empty() {
            return Err(GatewayError::InvalidConfig(
                "at least one [[tiers]] entry is required".into(),
            ));
        }

        let mut tiers = TierCatalog::new();
        for entry in &self.tiers {
            tiers.insert(PriceTier::new(
                entry.name.clone(),
                entry.description.clone(),
                entry.price_per_cubic_meter,
            )?)?;
        }

        let mut supplements = SupplementCatalog::new();
        for entry in &self.supplements {
            supplements.insert(Supplement {
                id: entry.id.clone(),
                kind: entry.kind,
                label: entry.label.clone(),
                unit_price: Money::from_decimal(entry.unit_price),
            })?;
        }

        Ok(PricingCatalog {
            tiers,
            supplements,
            default_tier: self.pricing.default_tier.clone(),
            height_policy: self.pricing.height_policy,
        })
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ATELIER_GENERATION_URL") {
            debug!(url = %url, "Overriding generation URL from environment");
            self.generation.base_url = url;
        }

        if let Some(url) = lookup("ATELIER_STORE_URL") {
            debug!(url = %url, "Overriding store URL from environment");
            self.store.base_url = url;
        }

        if let Some(secs) = lookup("ATELIER_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.generation.request_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid ATELIER_REQUEST_TIMEOUT_SECS"),
            }
        }

        if let Some(retries) = lookup("ATELIER_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(r) => self.generation.max_retries = r,
                Err(_) => warn!(value = %retries, "Ignoring invalid ATELIER_MAX_RETRIES"),
            }
        }

        if let Some(tier) = lookup("ATELIER_DEFAULT_TIER") {
            debug!(tier = %tier, "Overriding default tier from environment");
            self.pricing.default_tier = tier;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "atelier", "atelier")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
