use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::UnknownRole;

// --- Roles ---

/// Role
///
/// The permission tier assigned to a user through a `user_roles` record.
/// Variants are declared from highest to lowest precedence; a user holding
/// several records is collapsed to one primary role (see [`primary_role`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    RegionalAdmin,
    RegionalHr,
    PropertyManager,
    PropertyHr,
    DepartmentHead,
    Staff,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::RegionalAdmin,
        Role::RegionalHr,
        Role::PropertyManager,
        Role::PropertyHr,
        Role::DepartmentHead,
        Role::Staff,
    ];

    /// Rank in the precedence table. Lower wins.
    pub fn precedence(self) -> u8 {
        match self {
            Role::RegionalAdmin => 0,
            Role::RegionalHr => 1,
            Role::PropertyManager => 2,
            Role::PropertyHr => 3,
            Role::DepartmentHead => 4,
            Role::Staff => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::RegionalAdmin => "regional_admin",
            Role::RegionalHr => "regional_hr",
            Role::PropertyManager => "property_manager",
            Role::PropertyHr => "property_hr",
            Role::DepartmentHead => "department_head",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// RoleRecord
///
/// One role assignment held by a user, optionally scoped to a property or department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleRecord {
    pub role: Role,
    pub property_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl RoleRecord {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            property_id: None,
            department_id: None,
        }
    }
}

/// RoleRow
///
/// Raw `user_roles` row as returned by Postgres or PostgREST. The role column is
/// read as text so an unknown value can be skipped without failing the whole fetch.
#[derive(Debug, Clone, Deserialize, FromRow)]
pub struct RoleRow {
    pub role: String,
    pub property_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// Converts raw rows into typed records, dropping (and logging) unknown roles.
pub fn role_records_from_rows(rows: Vec<RoleRow>) -> Vec<RoleRecord> {
    rows.into_iter()
        .filter_map(|row| match row.role.parse::<Role>() {
            Ok(role) => Some(RoleRecord {
                role,
                property_id: row.property_id,
                department_id: row.department_id,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "skipping role record");
                None
            }
        })
        .collect()
}

/// primary_role
///
/// Collapses a user's role records to the single highest-precedence role.
/// Returns `None` when no records are held, which every access check treats as deny.
pub fn primary_role(records: &[RoleRecord]) -> Option<Role> {
    records
        .iter()
        .map(|record| record.role)
        .min_by_key(|role| role.precedence())
}

// --- Identity (owned by the identity provider) ---

/// UserMetadata
///
/// Free-form metadata the identity provider keeps next to the auth user.
/// Only the fields used to build a fallback profile are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// AuthIdentity
///
/// The authenticated user as confirmed by the identity provider (`auth.users`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthIdentity {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: UserMetadata,
}

/// AuthSession
///
/// A live provider session: bearer/refresh tokens plus the user they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which the access token is rejected.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthIdentity,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| at <= chrono::Utc::now().timestamp())
    }
}

// --- Directory records (profiles, affiliations) ---

/// Profile
///
/// The user's row in `public.profiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
}

impl Profile {
    /// from_identity
    ///
    /// Builds a minimal profile from the identity provider's own user record.
    /// Used when the profile row cannot be fetched, so the session never ends up
    /// with a missing profile. The display name falls back to the email local part.
    pub fn from_identity(identity: &AuthIdentity) -> Self {
        let full_name = identity.metadata.full_name.clone().or_else(|| {
            identity
                .email
                .as_deref()
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
                .map(str::to_string)
        });

        Self {
            id: identity.id,
            full_name,
            email: identity.email.clone(),
            phone: identity.metadata.phone.clone(),
            avatar_url: identity.metadata.avatar_url.clone(),
            is_active: true,
        }
    }
}

/// PropertyAffiliation
///
/// A hotel property the user is attached to (`user_properties`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct PropertyAffiliation {
    pub property_id: Uuid,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// DepartmentAffiliation
///
/// A department the user belongs to (`user_departments`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct DepartmentAffiliation {
    pub department_id: Uuid,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub property_id: Option<Uuid>,
}

// --- Session bundle ---

/// SessionBundle
///
/// The single aggregate of everything known about the signed-in user. Created
/// empty, filled in the background after the provider confirms a session, and
/// always cleared as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionBundle {
    pub identity: Option<AuthIdentity>,
    pub profile: Option<Profile>,
    pub roles: Vec<RoleRecord>,
    pub properties: Vec<PropertyAffiliation>,
    pub departments: Vec<DepartmentAffiliation>,
}

impl SessionBundle {
    pub fn primary_role(&self) -> Option<Role> {
        primary_role(&self.roles)
    }

    pub fn identity_id(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionBundle::default()
    }
}

// --- Request Payloads ---

/// SignInRequest
///
/// Input payload for password sign-in (POST /auth/sign-in). The password is
/// forwarded to the identity provider and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// RouteAccessQuery
///
/// Query for the page guard endpoint (GET /navigation/access?path=...).
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct RouteAccessQuery {
    pub path: String,
}

// --- Response Schemas (UI Ready) ---

/// SessionView
///
/// Output schema for GET /me: the bundle plus its derived primary role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub identity: Option<AuthIdentity>,
    pub profile: Option<Profile>,
    pub roles: Vec<RoleRecord>,
    pub properties: Vec<PropertyAffiliation>,
    pub departments: Vec<DepartmentAffiliation>,
    pub primary_role: Option<Role>,
}

impl From<SessionBundle> for SessionView {
    fn from(bundle: SessionBundle) -> Self {
        let primary_role = bundle.primary_role();
        Self {
            identity: bundle.identity,
            profile: bundle.profile,
            roles: bundle.roles,
            properties: bundle.properties,
            departments: bundle.departments,
            primary_role,
        }
    }
}

/// NavLink
///
/// A child entry under a menu item. Children are a single level deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavLink {
    /// Destination for the requesting role (path override applied).
    pub path: String,
    pub label_key: String,
    pub icon: String,
    pub badge_key: Option<String>,
}

/// NavItem
///
/// One visible menu entry, already filtered and ordered for the requesting role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavItem {
    /// Destination for the requesting role (path override applied).
    pub path: String,
    /// The registry key of the entry, stable across roles.
    pub route_path: String,
    pub label_key: String,
    pub icon: String,
    pub badge_key: Option<String>,
    pub order: f64,
    pub children: Vec<NavLink>,
}

/// NavGroupView
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavGroupView {
    pub id: String,
    pub label_key: String,
    pub icon: String,
    pub order: f64,
    pub collapsible: bool,
}

/// NavSection
///
/// A visible navigation group and its visible items, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavSection {
    pub group: NavGroupView,
    pub items: Vec<NavItem>,
}

/// RouteAccess
///
/// Page guard result: whether the caller may open `path`, and where the entry
/// actually lives for their role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteAccess {
    pub path: String,
    pub allowed: bool,
    pub resolved_path: Option<String>,
}
