use actix_cors::Cors;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use opportunity_engine::config::{LoggingSettings, Settings};
use opportunity_engine::core::{OfferGate, OpportunityRouter, PriceEstimator};
use opportunity_engine::models::ErrorResponse;
use opportunity_engine::routes::{self, opportunities::AppState};
use opportunity_engine::services::{BackendClient, BackendCollections, CacheManager, PostgresClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Malformed JSON bodies get the same error shape as validation failures
fn handle_json_payload_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    info!("JSON payload error on {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    });
    InternalError::from_response(err, response).into()
}

/// LOG_LEVEL and LOG_FORMAT take precedence over the configured values
fn init_logging(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => {
            init_logging(&settings.logging);
            settings
        }
        Err(e) => {
            init_logging(&LoggingSettings::default());
            return Err(startup_error("Configuration error", e));
        }
    };

    info!("Starting opportunity engine...");
    info!("Configuration loaded successfully");

    // Comparable listings store
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .map_err(|e| startup_error("PostgreSQL configuration error", e))?,
    );

    // Filter registry and verification collaborator
    let backend = Arc::new(
        BackendClient::new(
            settings.backend.endpoint.clone(),
            settings.backend.api_key.clone(),
            settings.backend.project_id.clone(),
            settings.backend.database_id.clone(),
            BackendCollections {
                professionals: settings.collection.professionals.clone(),
                filters: settings.collection.filters.clone(),
                verifications: settings.collection.verifications.clone(),
            },
            Duration::from_secs(settings.backend.timeout_secs.unwrap_or(10)),
        )
        .map_err(|e| startup_error("Backend client error", e))?,
    );

    info!("Backend client initialized");

    // Estimate cache; Redis is optional
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match settings.cache.redis_url.as_deref() {
        Some(url) => match CacheManager::new(url, l1_cache_size, cache_ttl).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to connect to Redis ({}), caching estimates in-process only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::local(l1_cache_size, cache_ttl),
    };

    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, Redis L2: {})",
        l1_cache_size,
        cache_ttl,
        cache.has_redis()
    );

    let estimator = PriceEstimator::new(
        postgres.clone(),
        settings.estimation.tier_table(),
        settings.estimation.params(),
    );

    info!("Price estimator initialized with {:?}", settings.estimation.params());

    let router = OpportunityRouter::new(estimator, backend.clone(), settings.routing.params());
    let gate = OfferGate::new(backend, settings.routing.verification_timeout());

    let app_state = AppState {
        router,
        gate,
        cache: Arc::new(cache),
        postgres: Some(postgres),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
