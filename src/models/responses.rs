use serde::{Deserialize, Serialize};

use crate::models::domain::{EstimationMethod, MatchResult, PriceEstimate, RoutingResult};

/// Response for the price estimation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatePriceResponse {
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: i64,
    #[serde(rename = "marketPrice")]
    pub market_price: i64,
    #[serde(rename = "comparablesFound")]
    pub comparables_found: usize,
    pub method: EstimationMethod,
}

impl From<PriceEstimate> for EstimatePriceResponse {
    fn from(estimate: PriceEstimate) -> Self {
        Self {
            estimated_price: estimate.estimated_price,
            market_price: estimate.market_price,
            comparables_found: estimate.comparables_found,
            method: estimate.method,
        }
    }
}

/// Response for the routing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOpportunityResponse {
    #[serde(rename = "routingId")]
    pub routing_id: String,
    #[serde(rename = "matchedProfessionalIds")]
    pub matched_professional_ids: Vec<String>,
    #[serde(rename = "totalProfessionalsEvaluated")]
    pub total_professionals_evaluated: usize,
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: i64,
    #[serde(rename = "priceWasEstimated")]
    pub price_was_estimated: bool,
    #[serde(rename = "priceEstimate")]
    pub price_estimate: PriceEstimate,
    pub details: Vec<MatchResult>,
}

impl RouteOpportunityResponse {
    pub fn new(routing_id: String, result: RoutingResult) -> Self {
        Self {
            routing_id,
            matched_professional_ids: result.matched_professional_ids,
            total_professionals_evaluated: result.total_professionals_evaluated,
            estimated_price: result.price_estimate.estimated_price,
            price_was_estimated: result.price_was_estimated,
            price_estimate: result.price_estimate,
            details: result.details,
        }
    }
}

/// Response for the offer gate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeOfferResponse {
    #[serde(rename = "professionalId")]
    pub professional_id: String,
    pub authorized: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
