use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes for regional administrators. Nested under `/admin`; each handler
/// authenticates through `AuthUser` and then checks the primary role itself.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/navigation/preview/{role}
        // Renders the grouped menu as another role would see it, for support and
        // for checking registry changes before rollout.
        .route(
            "/navigation/preview/{role}",
            get(handlers::preview_navigation),
        )
}
