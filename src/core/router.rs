use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{validate_vehicle, EngineError};
use crate::core::estimator::PriceEstimator;
use crate::core::filters::evaluate_with_reason;
use crate::models::{
    EstimationMethod, MatchResult, PriceEstimate, Professional, RejectionReason, RoutingResult,
    VehicleQuery,
};
use crate::services::FilterRegistry;

/// Concurrency and timeout limits for per-professional evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingParams {
    pub max_concurrency: usize,
    pub filter_timeout: Duration,
    /// Bound on listing the active professionals
    pub list_timeout: Duration,
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            filter_timeout: Duration::from_secs(2),
            list_timeout: Duration::from_secs(5),
        }
    }
}

/// Decides which professionals are offered a vehicle
///
/// # Pipeline
/// 1. Price: the supplied price, or one estimate per request
/// 2. Enumerate active professionals
/// 3. Load each filter and evaluate it, with bounded concurrency
/// 4. Collect matches and the per-professional trace
///
/// Filter load failures and timeouts are recorded as `FilterUnavailable`
/// entries; they never abort the routing call. Dropping the returned future
/// cancels all in-flight registry reads.
#[derive(Clone)]
pub struct OpportunityRouter {
    estimator: PriceEstimator,
    registry: Arc<dyn FilterRegistry>,
    params: RoutingParams,
}

impl OpportunityRouter {
    pub fn new(estimator: PriceEstimator, registry: Arc<dyn FilterRegistry>, params: RoutingParams) -> Self {
        Self {
            estimator,
            registry,
            params,
        }
    }

    pub fn estimator(&self) -> &PriceEstimator {
        &self.estimator
    }

    /// Price estimation entry point
    pub async fn estimate(&self, vehicle: &VehicleQuery) -> Result<PriceEstimate, EngineError> {
        validate_vehicle(vehicle)?;
        Ok(self.estimator.estimate(vehicle).await)
    }

    /// Route a vehicle to every professional whose filter accepts it
    pub async fn route(
        &self,
        vehicle: &VehicleQuery,
        supplied_price: Option<i64>,
    ) -> Result<RoutingResult, EngineError> {
        validate_vehicle(vehicle)?;

        let (price_estimate, price_was_estimated) = match supplied_price {
            Some(price) if price > 0 => (
                PriceEstimate {
                    estimated_price: price,
                    market_price: price,
                    comparables_found: 0,
                    method: EstimationMethod::Supplied,
                },
                false,
            ),
            Some(price) => {
                return Err(EngineError::InvalidInput(format!(
                    "estimated price must be positive, got {}",
                    price
                )));
            }
            None => (self.estimator.estimate(vehicle).await, true),
        };

        let listing = self.registry.list_active_professionals();
        let professionals = match tokio::time::timeout(self.params.list_timeout, listing).await {
            Ok(Ok(professionals)) => professionals,
            Ok(Err(e)) => {
                tracing::warn!("Filter registry unavailable, no professionals evaluated: {}", e);
                vec![]
            }
            Err(_) => {
                tracing::warn!(
                    "Listing professionals timed out after {:?}, no professionals evaluated",
                    self.params.list_timeout
                );
                vec![]
            }
        };

        let total_professionals_evaluated = professionals.len();
        let price = price_estimate.estimated_price;

        let mut details: Vec<MatchResult> = stream::iter(professionals)
            .map(|professional| self.evaluate_professional(professional, vehicle, price))
            .buffer_unordered(self.params.max_concurrency.max(1))
            .collect()
            .await;

        details.sort_by(|a, b| a.professional_id.cmp(&b.professional_id));

        let matched_professional_ids: Vec<String> = details
            .iter()
            .filter(|d| d.matched)
            .map(|d| d.professional_id.clone())
            .collect();

        tracing::debug!(
            "Routed {} {} {} at {}: {}/{} matched",
            vehicle.brand,
            vehicle.model,
            vehicle.year,
            price,
            matched_professional_ids.len(),
            total_professionals_evaluated
        );

        Ok(RoutingResult {
            matched_professional_ids,
            total_professionals_evaluated,
            price_estimate,
            price_was_estimated,
            details,
        })
    }

    async fn evaluate_professional(
        &self,
        professional: Professional,
        vehicle: &VehicleQuery,
        price: i64,
    ) -> MatchResult {
        let lookup = self.registry.get_filter_spec(&professional.id);

        let reason = match tokio::time::timeout(self.params.filter_timeout, lookup).await {
            Ok(Ok(Some(spec))) => evaluate_with_reason(&spec, vehicle, Some(price)),
            Ok(Ok(None)) => RejectionReason::NoFilter,
            Ok(Err(e)) => {
                tracing::warn!("Skipping professional {}: filter load failed: {}", professional.id, e);
                RejectionReason::FilterUnavailable
            }
            Err(_) => {
                tracing::warn!(
                    "Skipping professional {}: filter load timed out after {:?}",
                    professional.id,
                    self.params.filter_timeout
                );
                RejectionReason::FilterUnavailable
            }
        };

        MatchResult::new(professional.id, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BrandCriteria, FilterSpec};
    use crate::services::{InMemoryComparables, InMemoryRegistry, ListingRecord};

    fn router(registry: InMemoryRegistry) -> OpportunityRouter {
        let store = InMemoryComparables::new(vec![ListingRecord::new(
            "Toyota",
            "Corolla",
            2020,
            Some(50_000),
            300_000,
        )]);
        let estimator = PriceEstimator::with_defaults(Arc::new(store)).with_reference_year(2025);
        OpportunityRouter::new(estimator, Arc::new(registry), RoutingParams::default())
    }

    fn corolla() -> VehicleQuery {
        VehicleQuery::new("Toyota", "Corolla", 2020).with_mileage(50_000)
    }

    #[tokio::test]
    async fn test_route_estimates_price_once() {
        let registry = InMemoryRegistry::new()
            .with_professional("a", Some(FilterSpec::accept_all()))
            .with_professional("b", Some(FilterSpec::custom(vec![BrandCriteria::new("Honda")])));

        let result = router(registry).route(&corolla(), None).await.unwrap();

        assert!(result.price_was_estimated);
        assert_eq!(result.price_estimate.estimated_price, 210_000);
        assert_eq!(result.total_professionals_evaluated, 2);
        assert_eq!(result.matched_professional_ids, vec!["a"]);
        assert_eq!(result.details[1].rejection_reason, RejectionReason::BrandModelMismatch);
    }

    #[tokio::test]
    async fn test_supplied_price_skips_estimation() {
        let registry = InMemoryRegistry::new()
            .with_professional("a", Some(FilterSpec::accept_all().with_price_range(0, 100_000)));

        let result = router(registry).route(&corolla(), Some(90_000)).await.unwrap();

        assert!(!result.price_was_estimated);
        assert_eq!(result.price_estimate.method, EstimationMethod::Supplied);
        assert_eq!(result.matched_professional_ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_non_positive_supplied_price_rejected() {
        let result = router(InMemoryRegistry::new()).route(&corolla(), Some(0)).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_missing_brand_rejected() {
        let vehicle = VehicleQuery::new("", "Corolla", 2020);
        let result = router(InMemoryRegistry::new()).route(&vehicle, None).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failed_filter_load_is_skipped() {
        let registry = InMemoryRegistry::new()
            .with_professional("a", Some(FilterSpec::accept_all()))
            .with_professional("b", Some(FilterSpec::accept_all()))
            .with_professional("c", None)
            .with_failing_filter("b");

        let result = router(registry).route(&corolla(), None).await.unwrap();

        assert_eq!(result.total_professionals_evaluated, 3);
        assert_eq!(result.matched_professional_ids, vec!["a"]);
        assert_eq!(result.details[1].rejection_reason, RejectionReason::FilterUnavailable);
        assert_eq!(result.details[2].rejection_reason, RejectionReason::NoFilter);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_filter_load_times_out() {
        let registry = InMemoryRegistry::new()
            .with_professional("fast", Some(FilterSpec::accept_all()))
            .with_professional("slow", Some(FilterSpec::accept_all()))
            .with_filter_delay("slow", Duration::from_secs(30));

        let result = router(registry).route(&corolla(), None).await.unwrap();

        assert_eq!(result.matched_professional_ids, vec!["fast"]);
        assert_eq!(result.details[1].rejection_reason, RejectionReason::FilterUnavailable);
    }

    #[tokio::test]
    async fn test_registry_outage_yields_empty_result() {
        let result = router(InMemoryRegistry::unavailable())
            .route(&corolla(), None)
            .await
            .unwrap();

        assert_eq!(result.total_professionals_evaluated, 0);
        assert!(result.matched_professional_ids.is_empty());
        assert!(result.details.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_registry_listing_times_out() {
        let registry = InMemoryRegistry::new()
            .with_professional("a", Some(FilterSpec::accept_all()))
            .with_listing_delay(Duration::from_secs(3600));

        let started = tokio::time::Instant::now();
        let result = router(registry).route(&corolla(), None).await.unwrap();

        assert!(started.elapsed() <= RoutingParams::default().list_timeout + Duration::from_secs(1));
        assert_eq!(result.total_professionals_evaluated, 0);
        assert!(result.details.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_load_concurrently() {
        let delay = Duration::from_millis(1_500);
        let mut registry = InMemoryRegistry::new();
        for id in ["a", "b", "c", "d"] {
            registry = registry
                .with_professional(id, Some(FilterSpec::accept_all()))
                .with_filter_delay(id, delay);
        }
        let registry = Arc::new(registry);
        let estimator = PriceEstimator::with_defaults(Arc::new(InMemoryComparables::new(vec![])));
        let router = OpportunityRouter::new(estimator, registry.clone(), RoutingParams::default());

        let started = tokio::time::Instant::now();
        let result = router.route(&corolla(), Some(210_000)).await.unwrap();

        assert_eq!(result.matched_professional_ids.len(), 4);
        assert!(started.elapsed() < delay * 2);
        assert_eq!(registry.peak_filter_loads(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_capped() {
        let delay = Duration::from_millis(500);
        let mut registry = InMemoryRegistry::new();
        for id in ["a", "b", "c", "d", "e", "f"] {
            registry = registry
                .with_professional(id, Some(FilterSpec::accept_all()))
                .with_filter_delay(id, delay);
        }
        let registry = Arc::new(registry);
        let estimator = PriceEstimator::with_defaults(Arc::new(InMemoryComparables::new(vec![])));
        let params = RoutingParams {
            max_concurrency: 2,
            ..RoutingParams::default()
        };
        let router = OpportunityRouter::new(estimator, registry.clone(), params);

        let started = tokio::time::Instant::now();
        let result = router.route(&corolla(), Some(210_000)).await.unwrap();

        assert_eq!(result.matched_professional_ids.len(), 6);
        assert_eq!(registry.peak_filter_loads(), 2);
        // Three waves of two loads each
        assert!(started.elapsed() >= delay * 3);
    }
}
