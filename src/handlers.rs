use crate::{
    AppState,
    auth::AuthUser,
    error::{AuthError, AuthFailure},
    models::{
        AuthIdentity, AuthSession, NavGroupView, NavItem, NavSection, Role, RouteAccess,
        RouteAccessQuery, SessionBundle, SessionView, SignInRequest, UserMetadata,
    },
    navigation::{GroupId, menu, resolver},
    session::load_resources,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

// --- Public Handlers ---

/// sign_in
///
/// [Public Route] Password sign-in against the identity provider. A rejected
/// sign-in is answered with a structured `AuthFailure` body, never a bare status.
/// The exchange is stateless: the server's own provider session is not touched,
/// so concurrent callers never see each other's tokens.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed In", body = AuthSession),
        (status = 401, description = "Invalid Credentials", body = AuthFailure),
        (status = 502, description = "Provider Error", body = AuthFailure),
        (status = 504, description = "Provider Timeout", body = AuthFailure)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<AuthSession>, AuthError> {
    let ceiling = state.config.session_timeout;
    let outcome = tokio::time::timeout(
        ceiling,
        state
            .identity
            .exchange_password(&payload.email, &payload.password),
    )
    .await
    .map_err(|_| AuthError::Timeout(ceiling.as_millis()))
    .and_then(|result| result);

    match outcome {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "sign-in succeeded");
            Ok(Json(session))
        }
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "sign-in rejected");
            Err(e)
        }
    }
}

/// get_group
///
/// [Public Route] Display metadata for one navigation group. Visibility rules are
/// not applied here; the group is returned as configured.
#[utoipa::path(
    get,
    path = "/navigation/groups/{id}",
    params(("id" = String, Path, description = "Group id, e.g. `operations`")),
    responses(
        (status = 200, description = "Group", body = NavGroupView),
        (status = 404, description = "Unknown Group")
    )
)]
pub async fn get_group(Path(id): Path<String>) -> Result<Json<NavGroupView>, StatusCode> {
    let id = id.parse::<GroupId>().map_err(|_| StatusCode::NOT_FOUND)?;
    let group = resolver::group_config(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(menu::group_view(group)))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's session bundle, built with the same
/// settle-all loader the session bootstrapper uses. Slices that fail to load come
/// back empty; a missing profile is derived from the caller's identity.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Session", body = SessionView),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> Json<SessionView> {
    let mut bundle = SessionBundle {
        identity: Some(AuthIdentity {
            id: auth.id,
            email: auth.email,
            metadata: UserMetadata::default(),
        }),
        ..SessionBundle::default()
    };

    load_resources(state.repo.as_ref(), auth.id, state.config.resource_timeout)
        .await
        .apply_to(&mut bundle);

    Json(SessionView::from(bundle))
}

/// get_navigation
///
/// [Authenticated Route] The grouped menu for the caller's primary role. A caller
/// without a resolvable role receives an empty menu.
#[utoipa::path(
    get,
    path = "/navigation",
    responses((status = 200, description = "Grouped Menu", body = [NavSection]))
)]
pub async fn get_navigation(AuthUser { role, .. }: AuthUser) -> Json<Vec<NavSection>> {
    Json(menu::menu_for_role(role))
}

#[utoipa::path(
    get,
    path = "/navigation/flat",
    responses((status = 200, description = "Flat Menu", body = [NavItem]))
)]
pub async fn get_flat_navigation(AuthUser { role, .. }: AuthUser) -> Json<Vec<NavItem>> {
    Json(menu::flat_menu_for_role(role))
}

/// get_quick_actions
///
/// [Authenticated Route] Up to five shortcuts for the mobile bottom bar.
#[utoipa::path(
    get,
    path = "/navigation/quick-actions",
    responses((status = 200, description = "Quick Actions", body = [NavItem]))
)]
pub async fn get_quick_actions(AuthUser { role, .. }: AuthUser) -> Json<Vec<NavItem>> {
    Json(menu::quick_actions_for_role(role))
}

/// check_route_access
///
/// [Authenticated Route] Page guard for direct navigation to `path`.
#[utoipa::path(
    get,
    path = "/navigation/access",
    params(RouteAccessQuery),
    responses((status = 200, description = "Access Decision", body = RouteAccess))
)]
pub async fn check_route_access(
    AuthUser { id, role, .. }: AuthUser,
    Query(query): Query<RouteAccessQuery>,
) -> Json<RouteAccess> {
    let access = menu::route_access(&query.path, role);
    if !access.allowed {
        tracing::debug!(user_id = %id, path = %query.path, "route access denied");
    }
    Json(access)
}

// --- Admin Handlers ---

/// preview_navigation
///
/// [Admin Route] The grouped menu another role would see.
///
/// *Authorization*: restricted to callers whose primary role is `regional_admin`.
#[utoipa::path(
    get,
    path = "/admin/navigation/preview/{role}",
    params(("role" = String, Path, description = "Role to preview, e.g. `staff`")),
    responses(
        (status = 200, description = "Grouped Menu", body = [NavSection]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown Role")
    )
)]
pub async fn preview_navigation(
    AuthUser { id, role: caller_role, .. }: AuthUser,
    Path(role): Path<String>,
) -> Result<Json<Vec<NavSection>>, StatusCode> {
    if caller_role != Some(Role::RegionalAdmin) {
        tracing::warn!(user_id = %id, "navigation preview refused");
        return Err(StatusCode::FORBIDDEN);
    }

    let role = role.parse::<Role>().map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(menu::menu_for_role(Some(role))))
}
