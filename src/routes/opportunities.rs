use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{EngineError, GateError, OfferGate, OpportunityRouter};
use crate::models::{
    AuthorizeOfferRequest, AuthorizeOfferResponse, ErrorResponse, EstimatePriceRequest,
    EstimatePriceResponse, HealthResponse, PriceEstimate, RouteOpportunityRequest,
    RouteOpportunityResponse,
};
use crate::services::{CacheKey, CacheManager, PostgresClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub router: OpportunityRouter,
    pub gate: OfferGate,
    pub cache: Arc<CacheManager>,
    pub postgres: Option<Arc<PostgresClient>>,
}

/// Configure all opportunity-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/price/estimate", web::post().to(estimate_price))
        .route("/opportunities/route", web::post().to(route_opportunity))
        .route("/offers/authorize", web::post().to(authorize_offer));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    error_response(
        actix_web::http::StatusCode::BAD_REQUEST,
        "Validation failed",
        errors.to_string(),
    )
}

fn engine_error(err: EngineError) -> HttpResponse {
    match err {
        EngineError::InvalidInput(message) => error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "invalid_input",
            message,
        ),
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = match &state.postgres {
        Some(postgres) => postgres.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Price estimation endpoint
///
/// POST /api/v1/price/estimate
///
/// Request body:
/// ```json
/// { "brand": "Toyota", "model": "Corolla", "year": 2020, "mileageKm": 50000 }
/// ```
async fn estimate_price(
    state: web::Data<AppState>,
    req: web::Json<EstimatePriceRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for estimate request: {:?}", errors);
        return validation_failed(errors);
    }

    let vehicle = req.vehicle();
    let cache_key = CacheKey::estimate(&vehicle);

    if let Ok(cached) = state.cache.get::<PriceEstimate>(&cache_key).await {
        tracing::debug!("Serving cached estimate for {}", cache_key);
        return HttpResponse::Ok().json(EstimatePriceResponse::from(cached));
    }

    let estimate = match state.router.estimate(&vehicle).await {
        Ok(estimate) => estimate,
        Err(e) => return engine_error(e),
    };

    if let Err(e) = state.cache.set(&cache_key, &estimate).await {
        tracing::warn!("Failed to cache estimate {}: {}", cache_key, e);
    }

    tracing::info!(
        "Estimated {} {} {}: {} ({:?}, {} comparables)",
        vehicle.brand,
        vehicle.model,
        vehicle.year,
        estimate.estimated_price,
        estimate.method,
        estimate.comparables_found
    );

    HttpResponse::Ok().json(EstimatePriceResponse::from(estimate))
}

/// Opportunity routing endpoint
///
/// POST /api/v1/opportunities/route
///
/// Request body:
/// ```json
/// {
///   "brand": "Toyota",
///   "model": "Corolla",
///   "year": 2020,
///   "mileageKm": 50000,
///   "estimatedPrice": 210000
/// }
/// ```
async fn route_opportunity(
    state: web::Data<AppState>,
    req: web::Json<RouteOpportunityRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for route request: {:?}", errors);
        return validation_failed(errors);
    }

    // Routing results are never cached; filters change independently of vehicles
    let vehicle = req.vehicle();
    let result = match state.router.route(&vehicle, req.estimated_price).await {
        Ok(result) => result,
        Err(e) => return engine_error(e),
    };

    let routing_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        routing_id = %routing_id,
        "Routed {} {} {}: {} of {} professionals matched (price {}, estimated: {})",
        vehicle.brand,
        vehicle.model,
        vehicle.year,
        result.matched_professional_ids.len(),
        result.total_professionals_evaluated,
        result.price_estimate.estimated_price,
        result.price_was_estimated
    );

    HttpResponse::Ok().json(RouteOpportunityResponse::new(routing_id, result))
}

/// Offer gate endpoint
///
/// POST /api/v1/offers/authorize
///
/// Request body:
/// ```json
/// { "professionalId": "string" }
/// ```
async fn authorize_offer(
    state: web::Data<AppState>,
    req: web::Json<AuthorizeOfferRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.gate.authorize(&req.professional_id).await {
        Ok(_) => HttpResponse::Ok().json(AuthorizeOfferResponse {
            professional_id: req.professional_id.clone(),
            authorized: true,
        }),
        Err(e @ GateError::VerificationDenied { .. }) => error_response(
            actix_web::http::StatusCode::FORBIDDEN,
            "verification_denied",
            e.to_string(),
        ),
        Err(e @ GateError::UnknownProfessional(_)) => error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "unknown_professional",
            e.to_string(),
        ),
        Err(e @ GateError::Upstream(_)) => {
            tracing::error!("Verification lookup failed for {}: {}", req.professional_id, e);
            error_response(
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "verification_unavailable",
                e.to_string(),
            )
        }
    }
}
