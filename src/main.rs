use hotel_ops_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    identity::{IdentityState, MockIdentityProvider},
    repository::{PostgresRepository, RepositoryState, StaticDirectory},
    supabase::SupabaseClient,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point of the portal API: configuration, logging, the identity and
/// directory backends, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins over the default filter.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hotel_ops_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Identity and directory backends
    let (identity, repo): (IdentityState, RepositoryState) = if config.mock_auth {
        tracing::warn!(
            role = %config.mock_auth_role,
            "MOCK_AUTH enabled: serving a synthetic user, no identity service or database"
        );
        (
            Arc::new(MockIdentityProvider::new()) as IdentityState,
            Arc::new(StaticDirectory::seeded_for_mock_user(config.mock_auth_role)) as RepositoryState,
        )
    } else {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.db_url)
            .await
            .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

        (
            Arc::new(SupabaseClient::new(
                &config.supabase_url,
                &config.supabase_anon_key,
            )) as IdentityState,
            Arc::new(PostgresRepository::new(pool)) as RepositoryState,
        )
    };

    // 4. State and router
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        identity,
        config,
    };
    let app = create_router(app_state);

    // 5. Server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
