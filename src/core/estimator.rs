use chrono::Datelike;
use std::sync::Arc;
use std::time::Duration;

use crate::core::tiers::BrandTierTable;
use crate::models::{Comparable, ComparableQuery, EstimationMethod, PriceEstimate, VehicleQuery};
use crate::services::ComparableStore;

/// Tunable constants for price estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorParams {
    /// Fraction of the market price quoted to the seller
    pub seller_discount: f64,
    /// Comparables are searched within ± this many model years
    pub year_window: i32,
    pub comparable_limit: usize,
    /// Weight lost per model year of difference
    pub year_decay: f64,
    /// Mileage difference at which the mileage weight reaches zero (before flooring)
    pub mileage_scale_km: f64,
    pub weight_floor: f64,
    pub annual_depreciation: f64,
    pub query_timeout: Duration,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            seller_discount: 0.70,
            year_window: 2,
            comparable_limit: 50,
            year_decay: 0.2,
            mileage_scale_km: 100_000.0,
            weight_floor: 0.1,
            annual_depreciation: 0.10,
            query_timeout: Duration::from_secs(3),
        }
    }
}

/// Similarity weight of one comparable relative to the target vehicle
///
/// `time_weight * mileage_weight`, each floored at `weight_floor`. A missing
/// mileage on either side makes the mileage factor neutral.
#[inline]
pub fn similarity_weight(
    comparable: &Comparable,
    target_year: i32,
    target_mileage_km: Option<u32>,
    params: &EstimatorParams,
) -> f64 {
    let year_gap = (comparable.year - target_year).abs() as f64;
    let time_weight = (1.0 - year_gap * params.year_decay).max(params.weight_floor);

    let mileage_weight = match (comparable.mileage_km, target_mileage_km) {
        (Some(theirs), Some(ours)) => {
            let gap = (theirs as f64 - ours as f64).abs();
            (1.0 - gap / params.mileage_scale_km).max(params.weight_floor)
        }
        _ => 1.0,
    };

    time_weight * mileage_weight
}

/// Similarity-weighted average price, rounded to whole currency units
///
/// Returns `None` when there is nothing to average or the result is not a
/// positive price.
pub fn weighted_market_price(
    comparables: &[Comparable],
    target_year: i32,
    target_mileage_km: Option<u32>,
    params: &EstimatorParams,
) -> Option<i64> {
    let (weighted_sum, weight_total) = comparables
        .iter()
        .filter(|c| c.price > 0)
        .fold((0.0, 0.0), |(sum, total), c| {
            let weight = similarity_weight(c, target_year, target_mileage_km, params);
            (sum + c.price as f64 * weight, total + weight)
        });

    if weight_total <= 0.0 {
        return None;
    }

    let market_price = (weighted_sum / weight_total).round();
    if !market_price.is_finite() || market_price < 1.0 {
        return None;
    }

    Some(market_price as i64)
}

/// Market price from the brand's tier reference price depreciated by age
pub fn brand_tier_market_price(
    brand: &str,
    year: i32,
    reference_year: i32,
    tiers: &BrandTierTable,
    params: &EstimatorParams,
) -> i64 {
    let age = (reference_year - year).max(0);
    let base = tiers.base_price_for(brand) as f64;
    let depreciated = base * (1.0 - params.annual_depreciation).powi(age);

    (depreciated.round() as i64).max(1)
}

/// Seller-facing price at the configured discount below market
#[inline]
pub fn seller_price(market_price: i64, params: &EstimatorParams) -> i64 {
    ((market_price as f64 * params.seller_discount).round() as i64).max(1)
}

/// Estimates fair prices from comparable listings, falling back to a
/// brand-tier heuristic. Never fails: store errors and timeouts degrade to
/// the fallback.
#[derive(Clone)]
pub struct PriceEstimator {
    store: Arc<dyn ComparableStore>,
    tiers: BrandTierTable,
    params: EstimatorParams,
    reference_year: Option<i32>,
}

impl PriceEstimator {
    pub fn new(store: Arc<dyn ComparableStore>, tiers: BrandTierTable, params: EstimatorParams) -> Self {
        Self {
            store,
            tiers,
            params,
            reference_year: None,
        }
    }

    pub fn with_defaults(store: Arc<dyn ComparableStore>) -> Self {
        Self::new(store, BrandTierTable::default(), EstimatorParams::default())
    }

    /// Pin the year used for age-based depreciation instead of the current year
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    fn reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(|| chrono::Utc::now().year())
    }

    /// Estimate the seller price for a vehicle
    pub async fn estimate(&self, vehicle: &VehicleQuery) -> PriceEstimate {
        let mut comparables = self.load_comparables(vehicle).await;
        // Only positively priced listings take part in the average or the count
        comparables.retain(|c| c.price > 0);

        if !comparables.is_empty() {
            match weighted_market_price(&comparables, vehicle.year, vehicle.mileage_km, &self.params) {
                Some(market_price) => {
                    return PriceEstimate {
                        estimated_price: seller_price(market_price, &self.params),
                        market_price,
                        comparables_found: comparables.len(),
                        method: EstimationMethod::WeightedAverage,
                    };
                }
                None => {
                    tracing::warn!(
                        "Comparables for {} {} {} produced no positive price, using brand tier",
                        vehicle.brand,
                        vehicle.model,
                        vehicle.year
                    );
                }
            }
        }

        self.fallback(vehicle)
    }

    /// Brand-tier estimate, used when no comparable data is usable
    pub fn fallback(&self, vehicle: &VehicleQuery) -> PriceEstimate {
        let market_price = brand_tier_market_price(
            &vehicle.brand,
            vehicle.year,
            self.reference_year(),
            &self.tiers,
            &self.params,
        );

        tracing::debug!(
            "Brand tier estimate for {} {} {}: market {} ({:?})",
            vehicle.brand,
            vehicle.model,
            vehicle.year,
            market_price,
            self.tiers.classify(&vehicle.brand)
        );

        PriceEstimate {
            estimated_price: seller_price(market_price, &self.params),
            market_price,
            comparables_found: 0,
            method: EstimationMethod::BrandTierFallback,
        }
    }

    async fn load_comparables(&self, vehicle: &VehicleQuery) -> Vec<Comparable> {
        let query = ComparableQuery {
            brand: vehicle.brand.trim().to_string(),
            model: vehicle.model.trim().to_string(),
            year_min: vehicle.year - self.params.year_window,
            year_max: vehicle.year + self.params.year_window,
            limit: self.params.comparable_limit,
        };

        match tokio::time::timeout(self.params.query_timeout, self.store.find_comparables(&query)).await {
            Ok(Ok(comparables)) => comparables,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Comparable store query failed for {} {}, using brand tier: {}",
                    query.brand,
                    query.model,
                    e
                );
                vec![]
            }
            Err(_) => {
                tracing::warn!(
                    "Comparable store query timed out after {:?} for {} {}, using brand tier",
                    self.params.query_timeout,
                    query.brand,
                    query.model
                );
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryComparables, ListingRecord};

    fn comparable(price: i64, year: i32, mileage_km: Option<u32>) -> Comparable {
        Comparable { price, mileage_km, year }
    }

    fn estimator(listings: Vec<ListingRecord>) -> PriceEstimator {
        PriceEstimator::with_defaults(Arc::new(InMemoryComparables::new(listings)))
            .with_reference_year(2025)
    }

    #[test]
    fn test_identical_comparable_has_full_weight() {
        let params = EstimatorParams::default();
        let weight = similarity_weight(&comparable(1, 2020, Some(50_000)), 2020, Some(50_000), &params);
        assert!((weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_decays_linearly_by_year() {
        let params = EstimatorParams::default();
        let weight = similarity_weight(&comparable(1, 2022, None), 2020, None, &params);
        assert!((weight - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_weight_floor() {
        let params = EstimatorParams::default();
        let far = comparable(1, 2010, Some(500_000));
        let weight = similarity_weight(&far, 2020, Some(10_000), &params);
        assert!((weight - 0.01).abs() < 1e-9);
        assert!(weight > 0.0);
    }

    #[test]
    fn test_missing_mileage_is_neutral() {
        let params = EstimatorParams::default();
        let weight = similarity_weight(&comparable(1, 2020, None), 2020, Some(90_000), &params);
        assert_eq!(weight, 1.0);
    }

    #[test]
    fn test_weighted_average_favours_similar_listings() {
        let params = EstimatorParams::default();
        let comparables = vec![
            comparable(300_000, 2020, Some(50_000)),
            comparable(200_000, 2018, Some(50_000)),
        ];

        // weights 1.0 and 0.6
        let price = weighted_market_price(&comparables, 2020, Some(50_000), &params).unwrap();
        assert_eq!(price, 262_500);
    }

    #[test]
    fn test_weighted_average_empty_is_none() {
        let params = EstimatorParams::default();
        assert_eq!(weighted_market_price(&[], 2020, None, &params), None);
    }

    #[test]
    fn test_brand_tier_depreciation() {
        let params = EstimatorParams::default();
        let tiers = BrandTierTable::default();

        assert_eq!(brand_tier_market_price("Toyota", 2025, 2025, &tiers, &params), 450_000);
        assert_eq!(brand_tier_market_price("Toyota", 2023, 2025, &tiers, &params), 364_500);
        // future model years are not appreciated
        assert_eq!(brand_tier_market_price("Toyota", 2027, 2025, &tiers, &params), 450_000);
    }

    #[tokio::test]
    async fn test_estimate_single_comparable() {
        let estimator = estimator(vec![ListingRecord::new("Toyota", "Corolla", 2020, Some(50_000), 300_000)]);
        let vehicle = VehicleQuery::new("Toyota", "Corolla", 2020).with_mileage(50_000);

        let estimate = estimator.estimate(&vehicle).await;

        assert_eq!(estimate.market_price, 300_000);
        assert_eq!(estimate.estimated_price, 210_000);
        assert_eq!(estimate.comparables_found, 1);
        assert_eq!(estimate.method, EstimationMethod::WeightedAverage);
    }

    #[tokio::test]
    async fn test_estimate_without_comparables_uses_fallback() {
        let estimator = estimator(vec![]);
        let vehicle = VehicleQuery::new("BMW", "X3", 2023);

        let estimate = estimator.estimate(&vehicle).await;

        assert_eq!(estimate.method, EstimationMethod::BrandTierFallback);
        assert_eq!(estimate.comparables_found, 0);
        assert_eq!(estimate.market_price, 648_000);
        assert_eq!(estimate.estimated_price, 453_600);
    }

    #[tokio::test]
    async fn test_store_failure_uses_fallback() {
        let estimator = PriceEstimator::with_defaults(Arc::new(InMemoryComparables::unavailable()))
            .with_reference_year(2025);

        let estimate = estimator.estimate(&VehicleQuery::new("Kia", "Rio", 2025)).await;

        assert_eq!(estimate.method, EstimationMethod::BrandTierFallback);
        assert_eq!(estimate.market_price, 300_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_uses_fallback() {
        let store = InMemoryComparables::new(vec![ListingRecord::new("Kia", "Rio", 2025, None, 999_999)])
            .with_delay(Duration::from_secs(60));
        let estimator = PriceEstimator::with_defaults(Arc::new(store)).with_reference_year(2025);

        let estimate = estimator.estimate(&VehicleQuery::new("Kia", "Rio", 2025)).await;

        assert_eq!(estimate.method, EstimationMethod::BrandTierFallback);
    }

    struct FixedComparables(Vec<Comparable>);

    #[async_trait::async_trait]
    impl ComparableStore for FixedComparables {
        async fn find_comparables(
            &self,
            _query: &ComparableQuery,
        ) -> Result<Vec<Comparable>, crate::services::StoreError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_unpriced_comparables_are_not_counted() {
        let store = FixedComparables(vec![
            comparable(300_000, 2020, Some(50_000)),
            comparable(0, 2020, Some(50_000)),
            comparable(-1, 2021, None),
        ]);
        let estimator = PriceEstimator::with_defaults(Arc::new(store)).with_reference_year(2025);
        let vehicle = VehicleQuery::new("Toyota", "Corolla", 2020).with_mileage(50_000);

        let estimate = estimator.estimate(&vehicle).await;

        assert_eq!(estimate.method, EstimationMethod::WeightedAverage);
        assert_eq!(estimate.comparables_found, 1);
        assert_eq!(estimate.market_price, 300_000);
    }

    #[tokio::test]
    async fn test_only_unpriced_comparables_fall_back() {
        let store = FixedComparables(vec![comparable(0, 2020, None)]);
        let estimator = PriceEstimator::with_defaults(Arc::new(store)).with_reference_year(2025);

        let estimate = estimator.estimate(&VehicleQuery::new("Toyota", "Corolla", 2025)).await;

        assert_eq!(estimate.method, EstimationMethod::BrandTierFallback);
        assert_eq!(estimate.comparables_found, 0);
    }
}
