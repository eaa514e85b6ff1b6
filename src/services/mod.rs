// Service exports
pub mod backend;
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use backend::{BackendClient, BackendCollections, BackendError};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use memory::{InMemoryComparables, InMemoryRegistry, InMemoryVerifications, ListingRecord};
pub use postgres::{PostgresClient, PostgresError};
pub use store::{ComparableStore, FilterRegistry, StoreError, VerificationSource};
