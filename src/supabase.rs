use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use std::cmp::Ordering;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    error::{AuthError, DirectoryError},
    identity::{AuthChange, AuthEvent, IdentityProvider, SessionStore},
    models::{
        AuthIdentity, AuthSession, DepartmentAffiliation, Profile, PropertyAffiliation,
        RoleRecord, RoleRow, role_records_from_rows,
    },
};

/// TokenResponse
///
/// Body of the GoTrue `/auth/v1/token` endpoint (password and refresh grants).
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthIdentity,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token.expires_at.or_else(|| {
            token
                .expires_in
                .map(|secs| chrono::Utc::now().timestamp() + secs)
        });
        AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

/// Embedded `properties(name)` / `departments(name,property_id)` resource.
#[derive(Deserialize, Default)]
struct Embedded {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    property_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct PropertyRow {
    property_id: Uuid,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    properties: Option<Embedded>,
}

#[derive(Deserialize)]
struct DepartmentRow {
    department_id: Uuid,
    #[serde(default)]
    departments: Option<Embedded>,
}

/// `ORDER BY name ASC` as Postgres does it: missing names sort last.
fn nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// SupabaseClient
///
/// HTTP client for the hosted backend: GoTrue for identity, PostgREST for the
/// directory tables. Like the browser SDK it keeps the current session in memory,
/// authorizes table reads with the user's own access token (row-level security
/// applies), and broadcasts auth-state changes to subscribers.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    sessions: SessionStore,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            sessions: SessionStore::new(None),
        }
    }

    /// Seeds a previously persisted session (e.g. from a token cache).
    pub fn with_session(self, session: AuthSession) -> Self {
        self.sessions.seed(Some(session));
        self
    }

    fn current(&self) -> Option<AuthSession> {
        self.sessions.current()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let token = response.json::<TokenResponse>().await?;
            return Ok(token.into());
        }

        let message = response.text().await.unwrap_or_default();
        // GoTrue answers bad passwords and dead refresh tokens with 400 invalid_grant.
        if status.as_u16() == 400 && message.contains("invalid_grant") {
            return Err(AuthError::InvalidCredentials);
        }
        Err(AuthError::Provider {
            status: status.as_u16(),
            message,
        })
    }

    /// rest_select
    ///
    /// GET against a PostgREST table, authorized with the signed-in user's token.
    async fn rest_select<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filter: (&str, String),
    ) -> Result<Vec<T>, DirectoryError> {
        let session = self.current().ok_or(DirectoryError::NotSignedIn)?;

        let response = self
            .http
            .get(format!("{}/rest/v1/{}", self.base_url, table))
            .query(&[("select", select.to_string()), (filter.0, filter.1)])
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<Vec<T>>().await?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    /// get_session
    ///
    /// Returns the stored session, transparently refreshing it first when the
    /// access token has expired.
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        match self.current() {
            Some(session) if session.is_expired() => self.refresh_session().await.map(Some),
            other => Ok(other),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let session = self.exchange_password(email, password).await?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.sessions.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn exchange_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.token_grant(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// sign_out
    ///
    /// Drops the local session and notifies subscribers first, then revokes the
    /// taken token remotely. A failed or abandoned revoke leaves the client
    /// signed out.
    async fn sign_out(&self) -> Result<(), AuthError> {
        match self.sessions.publish(AuthEvent::SignedOut) {
            Some(session) => {
                let response = self
                    .http
                    .post(self.auth_url("logout"))
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&session.access_token)
                    .send()
                    .await;
                match response {
                    Ok(r) if r.status().is_success() => Ok(()),
                    Ok(r) => Err(AuthError::Provider {
                        status: r.status().as_u16(),
                        message: r.text().await.unwrap_or_default(),
                    }),
                    Err(e) => Err(AuthError::from(e)),
                }
            }
            None => Ok(()),
        }
    }

    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let current = self.current().ok_or(AuthError::NoSession)?;
        let session = self
            .token_grant(
                "refresh_token",
                serde_json::json!({ "refresh_token": current.refresh_token }),
            )
            .await?;
        self.sessions.publish(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn get_user(&self) -> Result<Option<AuthIdentity>, AuthError> {
        let Some(session) = self.current() else {
            return Ok(None);
        };

        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => Ok(Some(response.json::<AuthIdentity>().await?)),
            401 | 403 => Ok(None),
            status => Err(AuthError::Provider {
                status,
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    fn auth_sequence(&self) -> u64 {
        self.sessions.sequence()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.sessions.subscribe()
    }
}

#[async_trait]
impl crate::repository::Repository for SupabaseClient {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DirectoryError> {
        let rows = self
            .rest_select::<Profile>(
                "profiles",
                "id,full_name,email,phone,avatar_url,is_active",
                ("id", format!("eq.{user_id}")),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_roles(&self, user_id: Uuid) -> Result<Vec<RoleRecord>, DirectoryError> {
        let rows = self
            .rest_select::<RoleRow>(
                "user_roles",
                "role,property_id,department_id",
                ("user_id", format!("eq.{user_id}")),
            )
            .await?;
        Ok(role_records_from_rows(rows))
    }

    async fn get_properties(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PropertyAffiliation>, DirectoryError> {
        let rows = self
            .rest_select::<PropertyRow>(
                "user_properties",
                "property_id,is_primary,properties(name)",
                ("user_id", format!("eq.{user_id}")),
            )
            .await?;

        let mut properties: Vec<PropertyAffiliation> = rows
            .into_iter()
            .map(|row| PropertyAffiliation {
                property_id: row.property_id,
                property_name: row.properties.and_then(|p| p.name),
                is_primary: row.is_primary,
            })
            .collect();
        // Same order as the SQL directory: primary first, then by name.
        properties.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| nulls_last(&a.property_name, &b.property_name))
        });
        Ok(properties)
    }

    async fn get_departments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DepartmentAffiliation>, DirectoryError> {
        let rows = self
            .rest_select::<DepartmentRow>(
                "user_departments",
                "department_id,departments(name,property_id)",
                ("user_id", format!("eq.{user_id}")),
            )
            .await?;

        let mut departments: Vec<DepartmentAffiliation> = rows
            .into_iter()
            .map(|row| {
                let embedded = row.departments.unwrap_or_default();
                DepartmentAffiliation {
                    department_id: row.department_id,
                    department_name: embedded.name,
                    property_id: embedded.property_id,
                }
            })
            .collect();
        departments.sort_by(|a, b| nulls_last(&a.department_name, &b.department_name));
        Ok(departments)
    }
}
