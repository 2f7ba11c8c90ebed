use crate::{
    error::DirectoryError,
    identity::{MOCK_USER_ID, mock_identity},
    models::{
        DepartmentAffiliation, Profile, PropertyAffiliation, Role, RoleRecord, RoleRow,
        role_records_from_rows,
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Repository Trait
///
/// Read-only access to the directory tables the session loader consumes: the
/// profile row, role assignments, property and department affiliations.
///
/// Unlike most lookups, every method reports failure explicitly. The caller needs
/// to tell "no rows" apart from "fetch failed" so a failed slice can keep its
/// previous value.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DirectoryError>;
    async fn get_roles(&self, user_id: Uuid) -> Result<Vec<RoleRecord>, DirectoryError>;
    async fn get_properties(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PropertyAffiliation>, DirectoryError>;
    async fn get_departments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DepartmentAffiliation>, DirectoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the directory access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed directly by the project's Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DirectoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, full_name, email, phone, avatar_url, is_active
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// get_roles
    ///
    /// The role column is cast to text so values this build does not know are
    /// dropped row by row instead of failing the decode.
    async fn get_roles(&self, user_id: Uuid) -> Result<Vec<RoleRecord>, DirectoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT role::text AS role, property_id, department_id
            FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(role_records_from_rows(rows))
    }

    async fn get_properties(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PropertyAffiliation>, DirectoryError> {
        let properties = sqlx::query_as::<_, PropertyAffiliation>(
            r#"
            SELECT up.property_id, p.name AS property_name, up.is_primary
            FROM user_properties up
            LEFT JOIN properties p ON p.id = up.property_id
            WHERE up.user_id = $1
            ORDER BY up.is_primary DESC, p.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(properties)
    }

    async fn get_departments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DepartmentAffiliation>, DirectoryError> {
        let departments = sqlx::query_as::<_, DepartmentAffiliation>(
            r#"
            SELECT ud.department_id, d.name AS department_name, d.property_id
            FROM user_departments ud
            LEFT JOIN departments d ON d.id = ud.department_id
            WHERE ud.user_id = $1
            ORDER BY d.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(departments)
    }
}

/// DirectoryEntry
///
/// Everything `StaticDirectory` knows about one user.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    pub profile: Option<Profile>,
    pub roles: Vec<RoleRecord>,
    pub properties: Vec<PropertyAffiliation>,
    pub departments: Vec<DepartmentAffiliation>,
}

/// StaticDirectory
///
/// In-memory directory used with mock authentication (no database needed).
/// Unknown users read as "no rows", never as a failure.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<Uuid, DirectoryEntry>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, user_id: Uuid, entry: DirectoryEntry) -> Self {
        self.entries.insert(user_id, entry);
        self
    }

    /// seeded_for_mock_user
    ///
    /// A directory holding only the synthetic mock-auth user, attached to one demo
    /// property and department, with the given role.
    pub fn seeded_for_mock_user(role: Role) -> Self {
        let property_id = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000000a0001);
        let department_id = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000000b0001);

        let entry = DirectoryEntry {
            profile: Some(Profile::from_identity(&mock_identity())),
            roles: vec![RoleRecord {
                role,
                property_id: Some(property_id),
                department_id: None,
            }],
            properties: vec![PropertyAffiliation {
                property_id,
                property_name: Some("Demo Harbour Hotel".to_string()),
                is_primary: true,
            }],
            departments: vec![DepartmentAffiliation {
                department_id,
                department_name: Some("Front Office".to_string()),
                property_id: Some(property_id),
            }],
        };

        Self::new().with_entry(MOCK_USER_ID, entry)
    }

    fn entry(&self, user_id: Uuid) -> Option<&DirectoryEntry> {
        self.entries.get(&user_id)
    }
}

#[async_trait]
impl Repository for StaticDirectory {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DirectoryError> {
        Ok(self.entry(user_id).and_then(|entry| entry.profile.clone()))
    }

    async fn get_roles(&self, user_id: Uuid) -> Result<Vec<RoleRecord>, DirectoryError> {
        Ok(self
            .entry(user_id)
            .map(|entry| entry.roles.clone())
            .unwrap_or_default())
    }

    async fn get_properties(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PropertyAffiliation>, DirectoryError> {
        Ok(self
            .entry(user_id)
            .map(|entry| entry.properties.clone())
            .unwrap_or_default())
    }

    async fn get_departments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DepartmentAffiliation>, DirectoryError> {
        Ok(self
            .entry(user_id)
            .map(|entry| entry.departments.clone())
            .unwrap_or_default())
    }
}
