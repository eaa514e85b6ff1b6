// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BrandCriteria, Comparable, ComparableQuery, EstimationMethod, FilterMode, FilterSpec,
    MatchResult, PriceEstimate, Professional, RangeFilter, RejectionReason, RoutingResult,
    VehicleQuery, VerificationState, VerificationStatus, YearRange,
};
pub use requests::{AuthorizeOfferRequest, EstimatePriceRequest, RouteOpportunityRequest};
pub use responses::{
    AuthorizeOfferResponse, ErrorResponse, EstimatePriceResponse, HealthResponse,
    RouteOpportunityResponse,
};
