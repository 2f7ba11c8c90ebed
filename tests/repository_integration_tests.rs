use hotel_ops_portal::{
    models::Role,
    repository::{PostgresRepository, Repository},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds a single-connection pool so the temporary directory tables created in
/// `setup` stay visible to every query the repository issues.
struct DbTestContext {
    pool: PgPool,
}

const SCHEMA: &[&str] = &[
    "CREATE TEMP TABLE profiles (
        id uuid PRIMARY KEY,
        full_name text,
        email text,
        phone text,
        avatar_url text,
        is_active boolean NOT NULL DEFAULT true
    )",
    "CREATE TEMP TABLE user_roles (
        user_id uuid NOT NULL,
        role text NOT NULL,
        property_id uuid,
        department_id uuid
    )",
    "CREATE TEMP TABLE properties (id uuid PRIMARY KEY, name text NOT NULL)",
    "CREATE TEMP TABLE departments (
        id uuid PRIMARY KEY,
        name text NOT NULL,
        property_id uuid
    )",
    "CREATE TEMP TABLE user_properties (
        user_id uuid NOT NULL,
        property_id uuid NOT NULL,
        is_primary boolean NOT NULL DEFAULT false
    )",
    "CREATE TEMP TABLE user_departments (user_id uuid NOT NULL, department_id uuid NOT NULL)",
];

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&pool)
                .await
                .expect("Failed to create directory tables.");
        }

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    async fn exec(&self, sql: &str, ids: &[Uuid]) {
        let mut query = sqlx::query(sql);
        for id in ids {
            query = query.bind(*id);
        }
        query
            .execute(&self.pool)
            .await
            .expect("Failed to seed test data");
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn test_profile_lookup() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = Uuid::new_v4();

    ctx.exec(
        "INSERT INTO profiles (id, full_name, email) VALUES ($1, 'Kim Park', 'kim@harbour.example')",
        &[user],
    )
    .await;

    let profile = repo.get_profile(user).await.unwrap().expect("profile row");
    assert_eq!(profile.full_name.as_deref(), Some("Kim Park"));
    assert!(profile.is_active);

    assert!(repo.get_profile(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn test_roles_skip_unknown_values() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = Uuid::new_v4();
    let property = Uuid::new_v4();

    ctx.exec(
        "INSERT INTO user_roles (user_id, role, property_id) VALUES
            ($1, 'property_manager', $2),
            ($1, 'night_auditor', NULL),
            ($1, 'staff', $2)",
        &[user, property],
    )
    .await;

    let mut roles: Vec<Role> = repo
        .get_roles(user)
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.role)
        .collect();
    roles.sort_by_key(|role| role.precedence());

    assert_eq!(roles, vec![Role::PropertyManager, Role::Staff]);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn test_affiliations_join_names() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = Uuid::new_v4();
    let harbour = Uuid::new_v4();
    let airport = Uuid::new_v4();
    let front_desk = Uuid::new_v4();

    ctx.exec(
        "INSERT INTO properties (id, name) VALUES ($1, 'Harbour Hotel'), ($2, 'Airport Inn')",
        &[harbour, airport],
    )
    .await;
    ctx.exec(
        "INSERT INTO user_properties (user_id, property_id, is_primary) VALUES
            ($1, $2, false),
            ($1, $3, true)",
        &[user, airport, harbour],
    )
    .await;
    ctx.exec(
        "INSERT INTO departments (id, name, property_id) VALUES ($1, 'Front Desk', $2)",
        &[front_desk, harbour],
    )
    .await;
    ctx.exec(
        "INSERT INTO user_departments (user_id, department_id) VALUES ($1, $2)",
        &[user, front_desk],
    )
    .await;

    // Primary property first.
    let properties = repo.get_properties(user).await.unwrap();
    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].property_id, harbour);
    assert!(properties[0].is_primary);
    assert_eq!(properties[1].property_name.as_deref(), Some("Airport Inn"));

    let departments = repo.get_departments(user).await.unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0].department_name.as_deref(), Some("Front Desk"));
    assert_eq!(departments[0].property_id, Some(harbour));
}
