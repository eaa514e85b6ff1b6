use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::VehicleQuery;

/// Request to estimate a vehicle's price
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EstimatePriceRequest {
    #[validate(length(min = 1))]
    pub brand: String,
    #[validate(length(min = 1))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100))]
    pub year: i32,
    #[serde(alias = "mileage_km", rename = "mileageKm", default)]
    pub mileage_km: Option<u32>,
}

impl EstimatePriceRequest {
    pub fn vehicle(&self) -> VehicleQuery {
        VehicleQuery {
            brand: self.brand.clone(),
            model: self.model.clone(),
            year: self.year,
            mileage_km: self.mileage_km,
            version: None,
        }
    }
}

/// Request to route a vehicle to interested professionals
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteOpportunityRequest {
    #[validate(length(min = 1))]
    pub brand: String,
    #[validate(length(min = 1))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100))]
    pub year: i32,
    #[serde(alias = "mileage_km", rename = "mileageKm", default)]
    pub mileage_km: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
    #[validate(range(min = 1))]
    #[serde(alias = "estimated_price", rename = "estimatedPrice", default)]
    pub estimated_price: Option<i64>,
}

impl RouteOpportunityRequest {
    pub fn vehicle(&self) -> VehicleQuery {
        VehicleQuery {
            brand: self.brand.clone(),
            model: self.model.clone(),
            year: self.year,
            mileage_km: self.mileage_km,
            version: self.version.clone(),
        }
    }
}

/// Request to check whether a professional may submit an offer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthorizeOfferRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "professional_id", rename = "professionalId")]
    pub professional_id: String,
}
