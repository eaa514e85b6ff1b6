use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Comparable, ComparableQuery, FilterSpec, Professional, VerificationState};

/// Errors raised by the external stores the engine reads from
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store request timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Read access to previously observed vehicle listings.
///
/// Implementations only return active listings with a positive price, matching
/// the brand case-insensitively and the model as a case-insensitive substring.
#[async_trait]
pub trait ComparableStore: Send + Sync {
    async fn find_comparables(&self, query: &ComparableQuery) -> Result<Vec<Comparable>, StoreError>;
}

/// Per-professional acceptance criteria
#[async_trait]
pub trait FilterRegistry: Send + Sync {
    async fn list_active_professionals(&self) -> Result<Vec<Professional>, StoreError>;

    async fn get_filter_spec(&self, professional_id: &str) -> Result<Option<FilterSpec>, StoreError>;
}

/// Verification state consulted by the offer gate
#[async_trait]
pub trait VerificationSource: Send + Sync {
    async fn get_verification_state(
        &self,
        professional_id: &str,
    ) -> Result<Option<VerificationState>, StoreError>;
}
