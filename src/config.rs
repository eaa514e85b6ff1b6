use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::{BrandTier, BrandTierTable, EstimatorParams, RoutingParams};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub collection: CollectionSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub estimation: EstimationSettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub professionals: String,
    pub filters: String,
    pub verifications: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

/// Business constants of the price estimator
#[derive(Debug, Clone, Deserialize)]
pub struct EstimationSettings {
    #[serde(default = "default_seller_discount")]
    pub seller_discount: f64,
    #[serde(default = "default_year_window")]
    pub year_window: i32,
    #[serde(default = "default_comparable_limit")]
    pub comparable_limit: usize,
    #[serde(default = "default_year_decay")]
    pub year_decay: f64,
    #[serde(default = "default_mileage_scale_km")]
    pub mileage_scale_km: f64,
    #[serde(default = "default_weight_floor")]
    pub weight_floor: f64,
    #[serde(default = "default_annual_depreciation")]
    pub annual_depreciation: f64,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default)]
    pub tiers: TierSettings,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            seller_discount: default_seller_discount(),
            year_window: default_year_window(),
            comparable_limit: default_comparable_limit(),
            year_decay: default_year_decay(),
            mileage_scale_km: default_mileage_scale_km(),
            weight_floor: default_weight_floor(),
            annual_depreciation: default_annual_depreciation(),
            query_timeout_ms: default_query_timeout_ms(),
            tiers: TierSettings::default(),
        }
    }
}

fn default_seller_discount() -> f64 { 0.70 }
fn default_year_window() -> i32 { 2 }
fn default_comparable_limit() -> usize { 50 }
fn default_year_decay() -> f64 { 0.2 }
fn default_mileage_scale_km() -> f64 { 100_000.0 }
fn default_weight_floor() -> f64 { 0.1 }
fn default_annual_depreciation() -> f64 { 0.10 }
fn default_query_timeout_ms() -> u64 { 3_000 }

/// Brand-tier reference prices. Brand lists, when given, replace the
/// built-in assignment for that tier.
#[derive(Debug, Clone, Deserialize)]
pub struct TierSettings {
    #[serde(default = "default_luxury_price")]
    pub luxury_price: i64,
    #[serde(default = "default_mainstream_premium_price")]
    pub mainstream_premium_price: i64,
    #[serde(default = "default_economy_price")]
    pub economy_price: i64,
    #[serde(default = "default_baseline_price")]
    pub baseline_price: i64,
    #[serde(default)]
    pub luxury_brands: Option<Vec<String>>,
    #[serde(default)]
    pub mainstream_premium_brands: Option<Vec<String>>,
    #[serde(default)]
    pub economy_brands: Option<Vec<String>>,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            luxury_price: default_luxury_price(),
            mainstream_premium_price: default_mainstream_premium_price(),
            economy_price: default_economy_price(),
            baseline_price: default_baseline_price(),
            luxury_brands: None,
            mainstream_premium_brands: None,
            economy_brands: None,
        }
    }
}

fn default_luxury_price() -> i64 { 800_000 }
fn default_mainstream_premium_price() -> i64 { 450_000 }
fn default_economy_price() -> i64 { 300_000 }
fn default_baseline_price() -> i64 { 350_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_filter_timeout_ms")]
    pub filter_timeout_ms: u64,
    #[serde(default = "default_list_timeout_ms")]
    pub list_timeout_ms: u64,
    #[serde(default = "default_verification_timeout_ms")]
    pub verification_timeout_ms: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            filter_timeout_ms: default_filter_timeout_ms(),
            list_timeout_ms: default_list_timeout_ms(),
            verification_timeout_ms: default_verification_timeout_ms(),
        }
    }
}

fn default_max_concurrency() -> usize { 16 }
fn default_filter_timeout_ms() -> u64 { 2_000 }
fn default_list_timeout_ms() -> u64 { 5_000 }
fn default_verification_timeout_ms() -> u64 { 2_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl EstimationSettings {
    pub fn params(&self) -> EstimatorParams {
        EstimatorParams {
            seller_discount: self.seller_discount,
            year_window: self.year_window,
            comparable_limit: self.comparable_limit,
            year_decay: self.year_decay,
            mileage_scale_km: self.mileage_scale_km,
            weight_floor: self.weight_floor,
            annual_depreciation: self.annual_depreciation,
            query_timeout: Duration::from_millis(self.query_timeout_ms),
        }
    }

    /// Built-in brand lists first, then every configured list on top, so a
    /// configured brand wins over any default assignment
    pub fn tier_table(&self) -> BrandTierTable {
        let tiers = &self.tiers;
        let defaults = BrandTierTable::default();
        let configured = [
            (BrandTier::Luxury, &tiers.luxury_brands),
            (BrandTier::MainstreamPremium, &tiers.mainstream_premium_brands),
            (BrandTier::Economy, &tiers.economy_brands),
        ];

        let mut table = BrandTierTable::new(
            tiers.luxury_price,
            tiers.mainstream_premium_price,
            tiers.economy_price,
            tiers.baseline_price,
        );

        for (tier, brands) in &configured {
            if brands.is_none() {
                table = table.with_brands(*tier, defaults.brands_in(*tier));
            }
        }
        for (tier, brands) in &configured {
            if let Some(list) = brands {
                table = table.with_brands(*tier, list);
            }
        }

        table
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.seller_discount > 0.0 && self.seller_discount <= 1.0, "estimation.seller_discount must be in (0, 1]"),
            (self.weight_floor > 0.0 && self.weight_floor <= 1.0, "estimation.weight_floor must be in (0, 1]"),
            (self.year_window >= 0, "estimation.year_window must not be negative"),
            (self.comparable_limit > 0, "estimation.comparable_limit must be positive"),
            (self.year_decay >= 0.0, "estimation.year_decay must not be negative"),
            (self.mileage_scale_km > 0.0, "estimation.mileage_scale_km must be positive"),
            (
                self.annual_depreciation >= 0.0 && self.annual_depreciation < 1.0,
                "estimation.annual_depreciation must be in [0, 1)",
            ),
            (
                self.tiers.luxury_price > 0
                    && self.tiers.mainstream_premium_price > 0
                    && self.tiers.economy_price > 0
                    && self.tiers.baseline_price > 0,
                "estimation.tiers prices must be positive",
            ),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(ConfigError::Message(message.to_string())),
            None => Ok(()),
        }
    }
}

impl RoutingSettings {
    pub fn params(&self) -> RoutingParams {
        RoutingParams {
            max_concurrency: self.max_concurrency,
            filter_timeout: Duration::from_millis(self.filter_timeout_ms),
            list_timeout: Duration::from_millis(self.list_timeout_ms),
        }
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Message("routing.max_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with OPPORTUNITY__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., OPPORTUNITY__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("OPPORTUNITY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_env_overrides(settings)?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("OPPORTUNITY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.estimation.validate()?;
        self.routing.validate()
    }
}

/// Apply the conventional unprefixed variables used by deployment tooling
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("REDIS_URL", "cache.redis_url"),
        ("BACKEND_ENDPOINT", "backend.endpoint"),
        ("BACKEND_API_KEY", "backend.api_key"),
        ("BACKEND_PROJECT_ID", "backend.project_id"),
        ("BACKEND_DATABASE_ID", "backend.database_id"),
    ];

    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
