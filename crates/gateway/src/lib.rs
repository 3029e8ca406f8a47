//! Pagemark API Gateway
//!
//! The REST surface of the annotation service.
//! Handles:
//! - Authentication (register, login, bearer tokens)
//! - PDF upload, streaming, rename and deletion
//! - Highlights, drawings and notes per page
//! - Rate limiting and observability (logging, metrics)

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::{from_fn, Next},
    routing::{get, post, put},
    Router,
};
use pagemark_common::{auth::JwtManager, config::AppConfig, db::DbPool, storage::PdfStore};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub store: Arc<dyn PdfStore>,
    pub jwt: Arc<JwtManager>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let upload_limit = DefaultBodyLimit::max(config.storage.max_upload_bytes + MULTIPART_OVERHEAD);

    // API routes
    let api_routes = Router::new()
        // Auth endpoints
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        // PDF endpoints
        .route(
            "/pdf/upload",
            post(handlers::pdfs::upload).layer(upload_limit),
        )
        .route("/pdf/list", get(handlers::pdfs::list))
        .route(
            "/pdf/{id}",
            get(handlers::pdfs::get_pdf).delete(handlers::pdfs::delete_pdf),
        )
        .route("/pdf/{id}/rename", put(handlers::pdfs::rename))
        .route("/pdf/{id}/health", get(handlers::pdfs::health))
        .route("/pdf/{id}/search", get(handlers::pdfs::search))
        // Highlight endpoints; GET takes a PDF id, PUT/DELETE a highlight id
        .route("/highlight", post(handlers::highlights::create))
        .route(
            "/highlight/{id}",
            get(handlers::highlights::list)
                .put(handlers::highlights::update)
                .delete(handlers::highlights::delete),
        )
        // Drawing endpoints
        .route("/drawing", post(handlers::drawings::create))
        .route(
            "/drawing/{id}",
            get(handlers::drawings::list).delete(handlers::drawings::delete),
        )
        .route("/drawing/{id}/page/{page}", get(handlers::drawings::list_page))
        // Note endpoints
        .route("/note", post(handlers::notes::create))
        .route(
            "/note/{id}",
            get(handlers::notes::list)
                .put(handlers::notes::update)
                .delete(handlers::notes::delete),
        )
        .route("/note/{id}/page/{page}", get(handlers::notes::list_page));

    let mut app = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics));

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        let limit = config.rate_limit.requests_per_second;
        app = app.layer(from_fn(move |request: Request, next: Next| {
            middleware::rate_limit::rate_limit_middleware(request, next, limiter.clone(), limit)
        }));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(request_id)
            .layer(TraceLayer::new_for_http())
            .layer(propagate_id)
            .layer(cors_layer(&config.server.cors_origins))
            .layer(timeout_layer(config.request_timeout())),
    )
    .with_state(state)
}

/// Requests still running after `timeout` are answered with 408
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([CONTENT_TYPE, CONTENT_LENGTH])
}
