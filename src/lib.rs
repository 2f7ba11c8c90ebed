use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core domain: roles, navigation access model, session bootstrap.
pub mod error;
pub mod models;
pub mod navigation;
pub mod session;

// Seams to the hosted backend and the directory tables.
pub mod identity;
pub mod repository;
pub mod supabase;

// HTTP surface.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityProvider};
pub use repository::{PostgresRepository, RepositoryState, StaticDirectory};
pub use session::{SessionBootstrapper, SessionHandle, TimeoutPolicy};
pub use supabase::SupabaseClient;

/// ApiDoc
///
/// Generated OpenAPI document, served at `/api-docs/openapi.json` with the
/// Swagger UI mounted at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_in, handlers::get_group, handlers::get_me, handlers::get_navigation,
        handlers::get_flat_navigation, handlers::get_quick_actions, handlers::check_route_access,
        handlers::preview_navigation
    ),
    components(
        schemas(
            models::Role, models::RoleRecord, models::UserMetadata, models::AuthIdentity,
            models::AuthSession, models::Profile, models::PropertyAffiliation,
            models::DepartmentAffiliation, models::SignInRequest, models::SessionView,
            models::NavLink, models::NavItem, models::NavGroupView, models::NavSection,
            models::RouteAccess, error::AuthFailure,
        )
    ),
    tags(
        (name = "hotel-ops-portal", description = "Hotel Operations Portal navigation and session API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the services every request may need.
#[derive(Clone)]
pub struct AppState {
    /// Directory reads (profiles, roles, affiliations).
    pub repo: RepositoryState,
    /// Identity provider used for password sign-in.
    pub identity: IdentityState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`: if the `AuthUser` extractor rejects, the request
/// ends with 401 before reaching a handler.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, the scoped auth layer and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // The role check lives in the admin handlers themselves.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the request id, so every log line of a request
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
