use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use hotel_ops_portal::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::{AuthError, DirectoryError},
    handlers,
    identity::{AuthChange, IdentityProvider, MockIdentityProvider},
    models::{
        AuthIdentity, AuthSession, DepartmentAffiliation, Profile, PropertyAffiliation, Role,
        RoleRecord, RouteAccessQuery, SignInRequest,
    },
    repository::Repository,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

/// Directory whose profile row is missing and whose role table is down.
pub struct DegradedDirectory {
    pub properties: Vec<PropertyAffiliation>,
}

#[async_trait]
impl Repository for DegradedDirectory {
    async fn get_profile(&self, _user_id: Uuid) -> Result<Option<Profile>, DirectoryError> {
        Ok(None)
    }
    async fn get_roles(&self, _user_id: Uuid) -> Result<Vec<RoleRecord>, DirectoryError> {
        Err(DirectoryError::Status {
            status: 500,
            body: "role table unavailable".to_string(),
        })
    }
    async fn get_properties(
        &self,
        _user_id: Uuid,
    ) -> Result<Vec<PropertyAffiliation>, DirectoryError> {
        Ok(self.properties.clone())
    }
    async fn get_departments(
        &self,
        _user_id: Uuid,
    ) -> Result<Vec<DepartmentAffiliation>, DirectoryError> {
        Ok(vec![])
    }
}

/// Identity provider that never answers a sign-in.
struct StalledProvider {
    events: broadcast::Sender<AuthChange>,
}

#[async_trait]
impl IdentityProvider for StalledProvider {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(None)
    }
    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthSession, AuthError> {
        std::future::pending().await
    }
    async fn exchange_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthSession, AuthError> {
        std::future::pending().await
    }
    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        Err(AuthError::NoSession)
    }
    async fn get_user(&self) -> Result<Option<AuthIdentity>, AuthError> {
        Ok(None)
    }
    fn auth_sequence(&self) -> u64 {
        0
    }
    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

fn degraded_state() -> AppState {
    AppState {
        repo: Arc::new(DegradedDirectory {
            properties: vec![PropertyAffiliation {
                property_id: Uuid::new_v4(),
                property_name: Some("Harbour Hotel".to_string()),
                is_primary: true,
            }],
        }),
        identity: Arc::new(MockIdentityProvider::signed_out()),
        config: AppConfig::default(),
    }
}

fn caller(role: Option<Role>) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: Some("maria.lopez@harbour.example".to_string()),
        role,
    }
}

// --- TESTS ---

#[tokio::test]
async fn test_get_me_degrades_per_slice() {
    let user = caller(None);
    let user_id = user.id;

    let Json(view) = handlers::get_me(user, State(degraded_state())).await;

    assert!(view.roles.is_empty());
    assert_eq!(view.primary_role, None);
    assert_eq!(view.properties.len(), 1);

    // No profile row: derived from the identity, name from the email local part.
    let profile = view.profile.expect("fallback profile");
    assert_eq!(profile.id, user_id);
    assert_eq!(profile.full_name.as_deref(), Some("maria.lopez"));
    assert!(profile.is_active);
}

#[tokio::test]
async fn test_navigation_handlers_fail_closed_without_role() {
    let Json(sections) = handlers::get_navigation(caller(None)).await;
    assert!(sections.is_empty());

    let Json(flat) = handlers::get_flat_navigation(caller(None)).await;
    assert!(flat.is_empty());

    let Json(quick) = handlers::get_quick_actions(caller(None)).await;
    assert!(quick.is_empty());

    let Json(access) = handlers::check_route_access(
        caller(None),
        Query(RouteAccessQuery {
            path: "/dashboard".to_string(),
        }),
    )
    .await;
    assert!(!access.allowed);
}

#[tokio::test]
async fn test_navigation_for_hr() {
    let Json(sections) = handlers::get_navigation(caller(Some(Role::PropertyHr))).await;
    let hr = sections
        .iter()
        .find(|section| section.group.id == "hr_management")
        .expect("hr group visible");
    let paths: Vec<&str> = hr.items.iter().map(|item| item.path.as_str()).collect();
    assert_eq!(paths, vec!["/hr/staff", "/hr/jobs", "/hr/onboarding"]);

    let dashboard = &sections[0].items[0];
    assert_eq!(dashboard.path, "/hr/dashboard");
}

#[tokio::test]
async fn test_training_children_follow_role() {
    let find_training = |sections: Vec<hotel_ops_portal::models::NavSection>| {
        sections
            .into_iter()
            .flat_map(|section| section.items)
            .find(|item| item.route_path == "/training")
            .expect("training listed")
    };

    let Json(staff) = handlers::get_navigation(caller(Some(Role::Staff))).await;
    assert_eq!(find_training(staff).children.len(), 2);

    let Json(hr) = handlers::get_navigation(caller(Some(Role::RegionalHr))).await;
    assert_eq!(find_training(hr).children.len(), 3);
}

#[tokio::test]
async fn test_preview_navigation_authorization() {
    let forbidden = handlers::preview_navigation(
        caller(Some(Role::PropertyManager)),
        Path("staff".to_string()),
    )
    .await;
    assert_eq!(forbidden.unwrap_err(), StatusCode::FORBIDDEN);

    let unknown = handlers::preview_navigation(
        caller(Some(Role::RegionalAdmin)),
        Path("guest".to_string()),
    )
    .await;
    assert_eq!(unknown.unwrap_err(), StatusCode::NOT_FOUND);

    let Json(preview) = handlers::preview_navigation(
        caller(Some(Role::RegionalAdmin)),
        Path("department_head".to_string()),
    )
    .await
    .expect("admin may preview");
    assert!(preview.iter().any(|section| section.group.id == "operations"));
    assert!(preview.iter().all(|section| section.group.id != "administration"));
}

#[tokio::test]
async fn test_get_group() {
    let Json(group) = handlers::get_group(Path("my_work".to_string()))
        .await
        .expect("known group");
    assert_eq!(group.order, 2.0);
    assert!(group.collapsible);

    let missing = handlers::get_group(Path("lobby".to_string())).await;
    assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sign_in_handler_times_out() {
    let (events, _) = broadcast::channel(4);
    let mut state = degraded_state();
    state.identity = Arc::new(StalledProvider { events });
    state.config.session_timeout = Duration::from_millis(100);

    let result = handlers::sign_in(
        State(state),
        Json(SignInRequest {
            email: "maria.lopez@harbour.example".to_string(),
            password: "pw".to_string(),
        }),
    )
    .await;

    let error = result.expect_err("stalled provider must time out");
    assert!(matches!(error, AuthError::Timeout(100)));
    assert_eq!(error.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_sign_in_handler_leaves_server_session_alone() {
    let provider = Arc::new(MockIdentityProvider::signed_out());
    let mut events = provider.subscribe();
    let mut state = degraded_state();
    state.identity = provider.clone();

    let Json(session) = handlers::sign_in(
        State(state),
        Json(SignInRequest {
            email: "maria.lopez@harbour.example".to_string(),
            password: "pw".to_string(),
        }),
    )
    .await
    .expect("mock exchange succeeds");

    assert_eq!(session.user.email.as_deref(), Some("maria.lopez@harbour.example"));
    assert!(provider.get_session().await.unwrap().is_none());
    assert_eq!(provider.auth_sequence(), 0);
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}
