use serde::{Deserialize, Serialize};

/// Vehicle being priced or routed. Supplied per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleQuery {
    pub brand: String,
    pub model: String,
    pub year: i32,
    #[serde(rename = "mileageKm", default)]
    pub mileage_km: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
}

impl VehicleQuery {
    pub fn new(brand: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            year,
            mileage_km: None,
            version: None,
        }
    }

    pub fn with_mileage(mut self, mileage_km: u32) -> Self {
        self.mileage_km = Some(mileage_km);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Historical listing used as a price reference point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub price: i64,
    #[serde(rename = "mileageKm", default)]
    pub mileage_km: Option<u32>,
    pub year: i32,
}

/// Parameters for a comparable-listings lookup.
///
/// Stores only return records with `active = true` and `price > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableQuery {
    pub brand: String,
    pub model: String,
    pub year_min: i32,
    pub year_max: i32,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationMethod {
    WeightedAverage,
    BrandTierFallback,
    /// Price given by the caller rather than estimated
    Supplied,
}

/// Estimated seller price for a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEstimate {
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: i64,
    #[serde(rename = "marketPrice")]
    pub market_price: i64,
    #[serde(rename = "comparablesFound")]
    pub comparables_found: usize,
    pub method: EstimationMethod,
}

/// Professional buyer eligible for opportunities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    AcceptAll,
    #[default]
    Custom,
}

/// Inclusive numeric range that only constrains when enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RangeFilter {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min: i64,
    #[serde(default = "unbounded")]
    pub max: i64,
}

fn unbounded() -> i64 {
    i64::MAX
}

impl RangeFilter {
    pub fn disabled() -> Self {
        Self { enabled: false, min: 0, max: i64::MAX }
    }

    pub fn between(min: i64, max: i64) -> Self {
        Self { enabled: true, min, max }
    }

    /// Disabled ranges accept every value.
    #[inline]
    pub fn accepts(&self, value: i64) -> bool {
        !self.enabled || (self.min <= value && value <= self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    #[serde(default)]
    pub min: Option<i32>,
    #[serde(default)]
    pub max: Option<i32>,
}

impl YearRange {
    #[inline]
    pub fn contains(&self, year: i32) -> bool {
        self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
    }
}

/// One brand entry of a custom filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandCriteria {
    pub brand: String,
    #[serde(rename = "allowedModels", default)]
    pub allowed_models: Vec<String>,
    #[serde(rename = "allowedVersions", default)]
    pub allowed_versions: Vec<String>,
    #[serde(rename = "yearRange", default)]
    pub year_range: Option<YearRange>,
}

impl BrandCriteria {
    pub fn new(brand: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            allowed_models: vec![],
            allowed_versions: vec![],
            year_range: None,
        }
    }

    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    pub fn years(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.year_range = Some(YearRange { min, max });
        self
    }
}

/// A professional's acceptance criteria for vehicle opportunities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(rename = "isActive", default)]
    pub active: bool,
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub brands: Vec<BrandCriteria>,
    #[serde(rename = "priceRange", default)]
    pub price_range: RangeFilter,
    #[serde(rename = "mileageRange", default)]
    pub mileage_range: RangeFilter,
}

impl FilterSpec {
    pub fn accept_all() -> Self {
        Self {
            active: true,
            mode: FilterMode::AcceptAll,
            brands: vec![],
            price_range: RangeFilter::disabled(),
            mileage_range: RangeFilter::disabled(),
        }
    }

    pub fn custom(brands: Vec<BrandCriteria>) -> Self {
        Self {
            active: true,
            mode: FilterMode::Custom,
            brands,
            price_range: RangeFilter::disabled(),
            mileage_range: RangeFilter::disabled(),
        }
    }

    pub fn with_price_range(mut self, min: i64, max: i64) -> Self {
        self.price_range = RangeFilter::between(min, max);
        self
    }

    pub fn with_mileage_range(mut self, min: i64, max: i64) -> Self {
        self.mileage_range = RangeFilter::between(min, max);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// True when at least one numeric range constrains the vehicle
    pub fn has_enabled_range(&self) -> bool {
        self.price_range.enabled || self.mileage_range.enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    None,
    BrandModelMismatch,
    PriceOutOfRange,
    MileageOutOfRange,
    FilterInactive,
    NoFilter,
    FilterUnavailable,
}

/// Outcome of evaluating one professional against a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "professionalId")]
    pub professional_id: String,
    pub matched: bool,
    #[serde(rename = "rejectionReason")]
    pub rejection_reason: RejectionReason,
}

impl MatchResult {
    pub fn new(professional_id: impl Into<String>, reason: RejectionReason) -> Self {
        Self {
            professional_id: professional_id.into(),
            matched: reason == RejectionReason::None,
            rejection_reason: reason,
        }
    }
}

/// Aggregate outcome of routing one vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    #[serde(rename = "matchedProfessionalIds")]
    pub matched_professional_ids: Vec<String>,
    #[serde(rename = "totalProfessionalsEvaluated")]
    pub total_professionals_evaluated: usize,
    #[serde(rename = "priceEstimate")]
    pub price_estimate: PriceEstimate,
    #[serde(rename = "priceWasEstimated")]
    pub price_was_estimated: bool,
    pub details: Vec<MatchResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    EnRevision,
    Rechazado,
}

impl VerificationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::EnRevision => "en_revision",
            VerificationStatus::Rechazado => "rechazado",
        }
    }
}

/// Verification state of a professional as held by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationState {
    #[serde(rename = "verificationStatus")]
    pub status: VerificationStatus,
    #[serde(rename = "isActive", default)]
    pub active: bool,
}

impl VerificationState {
    pub fn verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Only verified and active professionals may submit offers
    pub fn may_bid(&self) -> bool {
        self.verified() && self.active
    }
}
