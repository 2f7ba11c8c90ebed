use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Nothing here depends on who is asking.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/sign-in
        // Password sign-in through the identity provider. Failures come back as
        // `{ "error": code, "message": ... }`.
        .route("/auth/sign-in", post(handlers::sign_in))
        // GET /navigation/groups/{id}
        // Display metadata for one group (label key, icon, order).
        .route("/navigation/groups/{id}", get(handlers::get_group))
}
