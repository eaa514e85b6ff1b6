//! Opportunity Engine - vehicle price estimation and buyer routing
//!
//! Given a vehicle listing, estimates a fair seller price from comparable
//! listings and decides which professional buyers should be offered the
//! opportunity, based on each buyer's acceptance filters.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{OfferGate, OpportunityRouter, PriceEstimator};
pub use models::{FilterSpec, MatchResult, PriceEstimate, RoutingResult, VehicleQuery};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let spec = FilterSpec::accept_all();
        let vehicle = VehicleQuery::new("Toyota", "Corolla", 2020);
        assert!(crate::core::evaluate(&spec, &vehicle, None));
    }
}
