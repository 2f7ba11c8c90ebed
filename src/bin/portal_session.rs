use clap::Parser;
use hotel_ops_portal::{
    config::AppConfig,
    identity::{IdentityState, MockIdentityProvider},
    models::NavSection,
    navigation::menu,
    repository::{RepositoryState, StaticDirectory},
    session::{SessionBootstrapper, SessionSnapshot},
    supabase::SupabaseClient,
};
use std::{process::ExitCode, sync::Arc, time::Duration};

/// Bootstraps a portal session the way the front end does and prints the
/// navigation it unlocks.
#[derive(Parser, Debug)]
#[command(name = "portal-session")]
#[command(about = "Sign in to the hotel operations portal and print the resulting navigation")]
#[command(version)]
struct Cli {
    #[arg(long, env = "PORTAL_EMAIL", help = "Account email for password sign-in")]
    email: Option<String>,

    #[arg(
        long,
        env = "PORTAL_PASSWORD",
        hide_env_values = true,
        help = "Account password for password sign-in"
    )]
    password: Option<String>,

    #[arg(long, help = "Sign out again after printing")]
    sign_out: bool,

    #[arg(long, help = "Output in JSON format")]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load();

    // stdout carries the menu; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_ops_portal=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let (identity, repo): (IdentityState, RepositoryState) = if config.mock_auth {
        (
            Arc::new(MockIdentityProvider::new()) as IdentityState,
            Arc::new(StaticDirectory::seeded_for_mock_user(config.mock_auth_role)) as RepositoryState,
        )
    } else {
        // Directory reads go through PostgREST with the user's own token.
        let client = Arc::new(SupabaseClient::new(
            &config.supabase_url,
            &config.supabase_anon_key,
        ));
        (client.clone() as IdentityState, client as RepositoryState)
    };

    let policy = config.timeout_policy();
    let bootstrapper = SessionBootstrapper::new(identity, repo, policy);
    let mut handle = bootstrapper.handle();

    bootstrapper.start().await;

    if let (Some(email), Some(password)) = (cli.email.as_deref(), cli.password.as_deref()) {
        if let Err(e) = bootstrapper.sign_in(email, password).await {
            eprintln!("Error: sign-in failed ({}): {e}", e.code());
            bootstrapper.shutdown();
            return ExitCode::FAILURE;
        }
    }

    // Give the background load one resource timeout (plus slack) to settle.
    let settle_within = policy.resource_timeout + Duration::from_millis(250);
    let snapshot = match tokio::time::timeout(settle_within, handle.wait_for(is_settled)).await {
        Ok(snapshot) => snapshot,
        Err(_) => handle.snapshot(),
    };

    let role = snapshot.bundle.primary_role();
    let sections = menu::menu_for_role(role);

    if cli.json {
        let output = serde_json::json!({
            "user": snapshot.bundle.profile,
            "primary_role": role,
            "navigation": sections,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: could not encode output: {e}"),
        }
    } else {
        print_text(&snapshot, &sections);
    }

    let mut code = ExitCode::SUCCESS;
    if cli.sign_out {
        if let Err(e) = bootstrapper.sign_out().await {
            eprintln!("Error: remote sign-out failed ({}): {e}", e.code());
            code = ExitCode::FAILURE;
        }
    }

    bootstrapper.shutdown();
    code
}

fn is_settled(snapshot: &SessionSnapshot) -> bool {
    snapshot.bundle.identity.is_none()
        || (!snapshot.profile_loading && snapshot.bundle.profile.is_some())
}

fn print_text(snapshot: &SessionSnapshot, sections: &[NavSection]) {
    let Some(identity) = &snapshot.bundle.identity else {
        println!("Not signed in. Pass --email and --password (or PORTAL_EMAIL / PORTAL_PASSWORD).");
        return;
    };

    let name = snapshot
        .bundle
        .profile
        .as_ref()
        .and_then(|profile| profile.full_name.as_deref())
        .unwrap_or("(unnamed)");
    let role = snapshot
        .bundle
        .primary_role()
        .map(|role| role.to_string())
        .unwrap_or_else(|| "none".to_string());

    println!("{name} <{}>", identity.email.as_deref().unwrap_or("-"));
    println!("primary role: {role}");

    if sections.is_empty() {
        println!("(no navigation available)");
    }
    for section in sections {
        println!();
        println!("[{}]", section.group.label_key);
        for item in &section.items {
            let badge = item
                .badge_key
                .as_deref()
                .map(|key| format!("  ({key})"))
                .unwrap_or_default();
            println!("  {:<28} {}{badge}", item.path, item.label_key);
            for child in &item.children {
                println!("    {:<26} {}", child.path, child.label_key);
            }
        }
    }
}
