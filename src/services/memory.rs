use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{
    Comparable, ComparableQuery, FilterSpec, Professional, VerificationState,
};
use crate::services::store::{ComparableStore, FilterRegistry, StoreError, VerificationSource};

/// Stored listing with the attributes the engine filters on
#[derive(Debug, Clone)]
pub struct ListingRecord {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage_km: Option<u32>,
    pub price: i64,
    pub active: bool,
}

impl ListingRecord {
    pub fn new(brand: &str, model: &str, year: i32, mileage_km: Option<u32>, price: i64) -> Self {
        Self {
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            mileage_km,
            price,
            active: true,
        }
    }
}

/// In-memory comparable listings store
#[derive(Debug, Default)]
pub struct InMemoryComparables {
    listings: Vec<ListingRecord>,
    unavailable: bool,
    delay: Option<Duration>,
    queries: AtomicUsize,
}

impl InMemoryComparables {
    pub fn new(listings: Vec<ListingRecord>) -> Self {
        Self {
            listings,
            ..Default::default()
        }
    }

    /// A store whose every query fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Delay every query, for exercising timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComparableStore for InMemoryComparables {
    async fn find_comparables(&self, query: &ComparableQuery) -> Result<Vec<Comparable>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }

        let brand = query.brand.trim().to_lowercase();
        let model = query.model.trim().to_lowercase();

        Ok(self
            .listings
            .iter()
            .filter(|l| l.active && l.price > 0)
            .filter(|l| l.brand.trim().to_lowercase() == brand)
            .filter(|l| l.model.to_lowercase().contains(&model))
            .filter(|l| l.year >= query.year_min && l.year <= query.year_max)
            .take(query.limit)
            .map(|l| Comparable {
                price: l.price,
                mileage_km: l.mileage_km,
                year: l.year,
            })
            .collect())
    }
}

/// In-memory filter registry
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    professionals: Vec<Professional>,
    filters: HashMap<String, FilterSpec>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    listing_delay: Option<Duration>,
    unavailable: bool,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose professional listing fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Add an active professional, optionally with a filter
    pub fn with_professional(mut self, id: &str, filter: Option<FilterSpec>) -> Self {
        self.professionals.push(Professional {
            id: id.to_string(),
            name: format!("Professional {}", id),
        });
        if let Some(filter) = filter {
            self.filters.insert(id.to_string(), filter);
        }
        self
    }

    /// Make filter loads for this professional fail
    pub fn with_failing_filter(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Delay filter loads for this professional
    pub fn with_filter_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Delay listing the active professionals
    pub fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = Some(delay);
        self
    }

    /// Most filter loads that were ever running at the same time
    pub fn peak_filter_loads(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Counts a filter load as in flight until dropped, including on cancellation
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FilterRegistry for InMemoryRegistry {
    async fn list_active_professionals(&self) -> Result<Vec<Professional>, StoreError> {
        if let Some(delay) = self.listing_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(StoreError::Unavailable("in-memory registry offline".to_string()));
        }
        Ok(self.professionals.clone())
    }

    async fn get_filter_spec(&self, professional_id: &str) -> Result<Option<FilterSpec>, StoreError> {
        let _load = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        if let Some(delay) = self.delays.get(professional_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(professional_id) {
            return Err(StoreError::Unavailable(format!(
                "filter for {} unavailable",
                professional_id
            )));
        }
        Ok(self.filters.get(professional_id).cloned())
    }
}

/// In-memory verification states
#[derive(Debug, Default)]
pub struct InMemoryVerifications {
    states: HashMap<String, VerificationState>,
    unavailable: bool,
}

impl InMemoryVerifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn with_state(mut self, id: &str, state: VerificationState) -> Self {
        self.states.insert(id.to_string(), state);
        self
    }
}

#[async_trait]
impl VerificationSource for InMemoryVerifications {
    async fn get_verification_state(
        &self,
        professional_id: &str,
    ) -> Result<Option<VerificationState>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("in-memory verifications offline".to_string()));
        }
        Ok(self.states.get(professional_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_comparables_respect_store_invariants() {
        let mut inactive = ListingRecord::new("Toyota", "Corolla", 2020, None, 250_000);
        inactive.active = false;

        let store = InMemoryComparables::new(vec![
            ListingRecord::new("TOYOTA", "Corolla SE", 2021, Some(40_000), 310_000),
            ListingRecord::new("Toyota", "Corolla", 2020, None, 0),
            ListingRecord::new("Toyota", "Camry", 2020, None, 400_000),
            ListingRecord::new("Toyota", "Corolla", 2015, None, 150_000),
            inactive,
        ]);

        let query = ComparableQuery {
            brand: "toyota".to_string(),
            model: "corolla".to_string(),
            year_min: 2018,
            year_max: 2022,
            limit: 50,
        };

        let found = store.find_comparables(&query).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].price, 310_000);
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_registry_failing_filter() {
        let registry = InMemoryRegistry::new()
            .with_professional("p1", Some(FilterSpec::accept_all()))
            .with_failing_filter("p1");

        assert!(registry.get_filter_spec("p1").await.is_err());
        assert_eq!(registry.list_active_professionals().await.unwrap().len(), 1);
    }
}
