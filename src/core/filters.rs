use crate::models::{BrandCriteria, FilterMode, FilterSpec, RejectionReason, VehicleQuery};

/// Check whether a vehicle satisfies a professional's filter
#[inline]
pub fn evaluate(spec: &FilterSpec, vehicle: &VehicleQuery, estimated_price: Option<i64>) -> bool {
    evaluate_with_reason(spec, vehicle, estimated_price) == RejectionReason::None
}

/// Evaluate a filter and report the first rule the vehicle failed
///
/// Rules run in order and short-circuit:
/// 1. Filter must be active
/// 2. Brand/model/version/year criteria (custom mode only)
/// 3. Price range, when enabled and a price is known
/// 4. Mileage range, when enabled and mileage is known
///
/// Disabled ranges are vacuously satisfied.
pub fn evaluate_with_reason(
    spec: &FilterSpec,
    vehicle: &VehicleQuery,
    estimated_price: Option<i64>,
) -> RejectionReason {
    if !spec.active {
        return RejectionReason::FilterInactive;
    }

    if spec.mode == FilterMode::Custom && !matches_brand_model(spec, vehicle) {
        return RejectionReason::BrandModelMismatch;
    }

    if let Some(price) = estimated_price {
        if !spec.price_range.accepts(price) {
            return RejectionReason::PriceOutOfRange;
        }
    }

    if let Some(mileage) = vehicle.mileage_km {
        if !spec.mileage_range.accepts(mileage as i64) {
            return RejectionReason::MileageOutOfRange;
        }
    }

    RejectionReason::None
}

/// Brand criterion of a custom filter
///
/// With no brand entries the criterion only passes when another sub-range is
/// enabled; a custom filter that constrains nothing matches nothing.
fn matches_brand_model(spec: &FilterSpec, vehicle: &VehicleQuery) -> bool {
    if spec.brands.is_empty() {
        return spec.has_enabled_range();
    }

    spec.brands.iter().any(|entry| entry_accepts(entry, vehicle))
}

#[inline]
fn entry_accepts(entry: &BrandCriteria, vehicle: &VehicleQuery) -> bool {
    if !same_name(&entry.brand, &vehicle.brand) {
        return false;
    }

    // Empty model list means every model of the brand
    if !entry.allowed_models.is_empty()
        && !entry.allowed_models.iter().any(|m| same_name(m, &vehicle.model)) {
        return false;
    }

    // Vehicles without version data are not disqualified
    if let Some(version) = &vehicle.version {
        if !entry.allowed_versions.is_empty()
            && !entry.allowed_versions.iter().any(|v| same_name(v, version)) {
            return false;
        }
    }

    if let Some(range) = &entry.year_range {
        if !range.contains(vehicle.year) {
            return false;
        }
    }

    true
}

#[inline]
fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrandCriteria;

    fn corolla(mileage_km: u32) -> VehicleQuery {
        VehicleQuery::new("Toyota", "Corolla", 2020).with_mileage(mileage_km)
    }

    fn toyota_only() -> FilterSpec {
        FilterSpec::custom(vec![BrandCriteria::new("Toyota")])
    }

    #[test]
    fn test_inactive_filter_never_matches() {
        let spec = FilterSpec::accept_all().inactive();

        assert_eq!(
            evaluate_with_reason(&spec, &corolla(10_000), Some(200_000)),
            RejectionReason::FilterInactive
        );
    }

    #[test]
    fn test_accept_all_matches_anything() {
        let spec = FilterSpec::accept_all();

        assert!(evaluate(&spec, &corolla(10_000), Some(200_000)));
        assert!(evaluate(&spec, &VehicleQuery::new("Lada", "Niva", 1990), None));
    }

    #[test]
    fn test_accept_all_still_checks_enabled_ranges() {
        let spec = FilterSpec::accept_all().with_price_range(0, 100_000);

        assert_eq!(
            evaluate_with_reason(&spec, &corolla(10_000), Some(200_000)),
            RejectionReason::PriceOutOfRange
        );
    }

    #[test]
    fn test_empty_custom_filter_fails_closed() {
        let spec = FilterSpec::custom(vec![]);

        assert_eq!(
            evaluate_with_reason(&spec, &corolla(10_000), Some(200_000)),
            RejectionReason::BrandModelMismatch
        );
    }

    #[test]
    fn test_custom_price_only_filter() {
        let spec = FilterSpec::custom(vec![]).with_price_range(100_000, 300_000);

        assert!(evaluate(&spec, &corolla(10_000), Some(210_000)));
        assert!(!evaluate(&spec, &corolla(10_000), Some(350_000)));
    }

    #[test]
    fn test_brand_mismatch() {
        let civic = VehicleQuery::new("Honda", "Civic", 2020).with_mileage(50_000);

        assert_eq!(
            evaluate_with_reason(&toyota_only(), &civic, Some(210_000)),
            RejectionReason::BrandModelMismatch
        );
    }

    #[test]
    fn test_brand_match_is_case_insensitive() {
        let vehicle = VehicleQuery::new(" TOYOTA", "corolla", 2020);
        let spec = FilterSpec::custom(vec![BrandCriteria::new("toyota").models(["Corolla"])]);

        assert!(evaluate(&spec, &vehicle, None));
    }

    #[test]
    fn test_model_allowlist() {
        let spec = FilterSpec::custom(vec![BrandCriteria::new("Toyota").models(["Camry", "RAV4"])]);

        assert_eq!(
            evaluate_with_reason(&spec, &corolla(10_000), None),
            RejectionReason::BrandModelMismatch
        );
    }

    #[test]
    fn test_year_range_on_entry() {
        let spec = FilterSpec::custom(vec![
            BrandCriteria::new("Toyota").models(["Corolla"]).years(Some(2021), None),
        ]);

        assert!(!evaluate(&spec, &corolla(10_000), None));

        let newer = VehicleQuery::new("Toyota", "Corolla", 2022);
        assert!(evaluate(&spec, &newer, None));
    }

    #[test]
    fn test_versions_only_constrain_known_versions() {
        let spec = FilterSpec::custom(vec![
            BrandCriteria::new("Toyota").models(["Corolla"]).versions(["SE"]),
        ]);

        assert!(evaluate(&spec, &corolla(10_000), None));
        assert!(evaluate(&spec, &corolla(10_000).with_version("se"), None));
        assert!(!evaluate(&spec, &corolla(10_000).with_version("LE"), None));
    }

    #[test]
    fn test_any_entry_may_match() {
        let spec = FilterSpec::custom(vec![
            BrandCriteria::new("Honda").models(["Civic"]),
            BrandCriteria::new("Toyota").models(["Corolla"]),
        ]);

        assert!(evaluate(&spec, &corolla(10_000), None));
    }

    #[test]
    fn test_mileage_out_of_range() {
        let spec = toyota_only()
            .with_price_range(0, 1_000_000)
            .with_mileage_range(0, 80_000);

        assert_eq!(
            evaluate_with_reason(&spec, &corolla(100_000), Some(210_000)),
            RejectionReason::MileageOutOfRange
        );
    }

    #[test]
    fn test_unknown_price_and_mileage_are_permissive() {
        let spec = toyota_only()
            .with_price_range(0, 1)
            .with_mileage_range(0, 1);
        let vehicle = VehicleQuery::new("Toyota", "Corolla", 2020);

        assert!(evaluate(&spec, &vehicle, None));
    }

    #[test]
    fn test_brand_failure_reported_before_price() {
        let spec = toyota_only().with_price_range(0, 1);
        let civic = VehicleQuery::new("Honda", "Civic", 2020);

        assert_eq!(
            evaluate_with_reason(&spec, &civic, Some(500_000)),
            RejectionReason::BrandModelMismatch
        );
    }
}
