use thiserror::Error;

use crate::models::{VehicleQuery, VerificationStatus};
use crate::services::StoreError;

/// Errors surfaced by the estimation and routing entry points
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised by the offer gate
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Professional {professional_id} may not submit offers (status: {}, active: {active})", .status.label())]
    VerificationDenied {
        professional_id: String,
        status: VerificationStatus,
        active: bool,
    },

    #[error("No verification record for professional {0}")]
    UnknownProfessional(String),

    #[error("Verification lookup failed: {0}")]
    Upstream(#[from] StoreError),
}

/// Reject vehicles missing brand, model or a plausible year
pub fn validate_vehicle(vehicle: &VehicleQuery) -> Result<(), EngineError> {
    if vehicle.brand.trim().is_empty() {
        return Err(EngineError::InvalidInput("brand is required".to_string()));
    }
    if vehicle.model.trim().is_empty() {
        return Err(EngineError::InvalidInput("model is required".to_string()));
    }
    if vehicle.year <= 0 {
        return Err(EngineError::InvalidInput(format!(
            "year must be positive, got {}",
            vehicle.year
        )));
    }
    Ok(())
}
