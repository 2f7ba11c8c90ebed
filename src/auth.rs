use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    identity::{MOCK_USER_EMAIL, MOCK_USER_ID},
    models::{Role, primary_role},
    repository::RepositoryState,
};

/// Claims
///
/// The part of a Supabase access token this service reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the auth user id, which is also the `profiles.id`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. `role` is the primary role
/// from the user's role records; `None` when the user has none or they could not
/// be read, in which case every navigation check fails closed.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` a known profile id in `x-user-id` is accepted.
/// 2. Mock auth: in local mock mode a request without credentials is the mock user.
/// 3. Bearer token: the Supabase JWT is validated against the project secret.
/// 4. Directory lookup: the profile must exist; the role is resolved from `user_roles`.
///
/// Rejection: StatusCode::UNAUTHORIZED (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = resolve_user(&repo, user_id, None).await {
                    return Ok(user);
                }
            }
        }

        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let Some(token) = bearer else {
            // Mock mode never survives config loading outside local, but check anyway.
            if config.mock_auth && config.env == Env::Local {
                let mut user = resolve_user(&repo, MOCK_USER_ID, Some(MOCK_USER_EMAIL.to_string()))
                    .await
                    .ok_or(StatusCode::UNAUTHORIZED)?;
                user.role = user.role.or(Some(config.mock_auth_role));
                return Ok(user);
            }
            return Err(StatusCode::UNAUTHORIZED);
        };

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Supabase sets aud to "authenticated"; the signature is what matters here.
        validation.validate_aud = false;

        let claims = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                    _ => tracing::debug!(error = %e, "rejected invalid token"),
                }
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        resolve_user(&repo, claims.sub, claims.email)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// resolve_user
///
/// Confirms the profile still exists and resolves the primary role. A failed role
/// read leaves the role unresolved rather than rejecting the request.
async fn resolve_user(
    repo: &RepositoryState,
    user_id: Uuid,
    email: Option<String>,
) -> Option<AuthUser> {
    let profile = match repo.get_profile(user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::debug!(%user_id, "no profile for authenticated user");
            return None;
        }
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "profile lookup failed during auth");
            return None;
        }
    };

    let role = match repo.get_roles(user_id).await {
        Ok(records) => primary_role(&records),
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "role lookup failed; role unresolved");
            None
        }
    };

    Some(AuthUser {
        id: profile.id,
        email: email.or(profile.email),
        role,
    })
}
