// Core engine exports
pub mod error;
pub mod estimator;
pub mod filters;
pub mod gate;
pub mod router;
pub mod tiers;

pub use error::{validate_vehicle, EngineError, GateError};
pub use estimator::{
    brand_tier_market_price, seller_price, similarity_weight, weighted_market_price,
    EstimatorParams, PriceEstimator,
};
pub use filters::{evaluate, evaluate_with_reason};
pub use gate::OfferGate;
pub use router::{OpportunityRouter, RoutingParams};
pub use tiers::{BrandTier, BrandTierTable};
