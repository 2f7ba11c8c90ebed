use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Everything here runs after the `AuthUser` extractor middleware on the router
/// layer above. Handlers receive the caller's id and primary role; a caller with
/// no role gets empty menus and denied access checks.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Profile, roles, properties and departments, loaded settle-all.
        .route("/me", get(handlers::get_me))
        // GET /navigation
        // Visible groups and their visible entries, in display order.
        .route("/navigation", get(handlers::get_navigation))
        // GET /navigation/flat
        // The same entries flattened in group order, for search and breadcrumbs.
        .route("/navigation/flat", get(handlers::get_flat_navigation))
        // GET /navigation/quick-actions
        // The mobile bottom bar (at most five entries).
        .route("/navigation/quick-actions", get(handlers::get_quick_actions))
        // GET /navigation/access?path=...
        // Page guard: may the caller open this path, and where does it resolve for them.
        .route("/navigation/access", get(handlers::check_route_access))
}
