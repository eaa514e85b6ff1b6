use std::sync::Arc;
use std::time::Duration;

use crate::core::error::GateError;
use crate::models::VerificationState;
use crate::services::{StoreError, VerificationSource};

/// Verification check run before a professional's offer is persisted
///
/// Routing never consults this gate: unverified professionals may still be
/// shown opportunities, they just cannot bid on them.
#[derive(Clone)]
pub struct OfferGate {
    source: Arc<dyn VerificationSource>,
    timeout: Duration,
}

impl OfferGate {
    pub fn new(source: Arc<dyn VerificationSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Confirm the professional is verified and active
    pub async fn authorize(&self, professional_id: &str) -> Result<VerificationState, GateError> {
        let lookup = self.source.get_verification_state(professional_id);

        let state = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(self.timeout.as_millis() as u64).into()),
        };

        let state = state.ok_or_else(|| GateError::UnknownProfessional(professional_id.to_string()))?;

        if !state.may_bid() {
            tracing::info!(
                "Offer rejected for {}: status {}, active {}",
                professional_id,
                state.status.label(),
                state.active
            );
            return Err(GateError::VerificationDenied {
                professional_id: professional_id.to_string(),
                status: state.status,
                active: state.active,
            });
        }

        Ok(state)
    }
}
