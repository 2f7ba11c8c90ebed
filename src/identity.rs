use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{AuthIdentity, AuthSession, UserMetadata},
};

/// AuthEvent
///
/// Auth-state changes pushed by the identity provider, in the order it emits them.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    UserUpdated(AuthSession),
    SignedOut,
}

impl AuthEvent {
    /// The session the event leaves behind, if any.
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            AuthEvent::SignedIn(session)
            | AuthEvent::TokenRefreshed(session)
            | AuthEvent::UserUpdated(session) => Some(session),
            AuthEvent::SignedOut => None,
        }
    }
}

/// AuthChange
///
/// An `AuthEvent` stamped with the provider's sequence number. Numbers grow by one
/// per published event, so a consumer can tell which events predate a call it made.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub seq: u64,
    pub event: AuthEvent,
}

/// Capacity of the auth-event channel. Slow listeners past this lag and skip events.
pub const AUTH_EVENT_CAPACITY: usize = 32;

/// IdentityProvider
///
/// The contract the session bootstrapper needs from the hosted identity service.
/// Implemented over HTTP by `SupabaseClient` and in-process by `MockIdentityProvider`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently stored session, if any. `Ok(None)` means signed out.
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Password grant that leaves the stored session and subscribers untouched.
    /// Used where one process signs in on behalf of many callers.
    async fn exchange_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Drops the stored session and publishes `SignedOut` before any remote revoke,
    /// so an abandoned call still leaves the provider signed out.
    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn refresh_session(&self) -> Result<AuthSession, AuthError>;

    /// Re-reads the user record from the provider (bypassing any cached session user).
    async fn get_user(&self) -> Result<Option<AuthIdentity>, AuthError>;

    /// Sequence number of the latest published change; 0 before the first.
    fn auth_sequence(&self) -> u64;

    /// Subscribes to auth-state changes (`onAuthStateChange`).
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// SessionStore
///
/// The session slot and change channel behind both provider implementations.
/// Storing, numbering and sending happen under one lock, so channel order and
/// sequence order agree.
pub struct SessionStore {
    slot: Mutex<(Option<AuthSession>, u64)>,
    events: broadcast::Sender<AuthChange>,
}

impl SessionStore {
    pub fn new(session: Option<AuthSession>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            slot: Mutex::new((session, 0)),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, (Option<AuthSession>, u64)> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.lock().0.clone()
    }

    pub fn sequence(&self) -> u64 {
        self.lock().1
    }

    /// Replaces the stored session without notifying anyone (restoring a cache).
    pub fn seed(&self, session: Option<AuthSession>) {
        self.lock().0 = session;
    }

    /// Stores the session the event leaves behind and broadcasts it. Returns the
    /// session that was stored before.
    pub fn publish(&self, event: AuthEvent) -> Option<AuthSession> {
        let mut slot = self.lock();
        let previous = std::mem::replace(&mut slot.0, event.session().cloned());
        slot.1 += 1;
        // No receivers is fine.
        let _ = self.events.send(AuthChange { seq: slot.1, event });
        previous
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

/// IdentityState
///
/// The concrete type used to share the identity provider across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

/// Fixed id of the synthetic user served when mock authentication is on.
pub const MOCK_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_00000000d3e0);
pub const MOCK_USER_EMAIL: &str = "demo.admin@hotel-ops.local";

/// The synthetic identity used by mock authentication.
pub fn mock_identity() -> AuthIdentity {
    AuthIdentity {
        id: MOCK_USER_ID,
        email: Some(MOCK_USER_EMAIL.to_string()),
        metadata: UserMetadata {
            full_name: Some("Demo User".to_string()),
            phone: None,
            avatar_url: None,
        },
    }
}

fn mock_session(identity: AuthIdentity) -> AuthSession {
    AuthSession {
        access_token: "mock-access-token".to_string(),
        refresh_token: "mock-refresh-token".to_string(),
        expires_at: None,
        user: identity,
    }
}

/// MockIdentityProvider
///
/// In-process stand-in for the identity service, used for local development with
/// `MOCK_AUTH=true` and as a test double. Starts signed in as the synthetic user
/// unless built with [`MockIdentityProvider::signed_out`]; any password is accepted
/// unless `reject_sign_in` is set.
pub struct MockIdentityProvider {
    sessions: SessionStore,
    /// When true, password sign-in reports invalid credentials.
    pub reject_sign_in: bool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::with_session(Some(mock_session(mock_identity())))
    }

    pub fn signed_out() -> Self {
        Self::with_session(None)
    }

    pub fn with_session(session: Option<AuthSession>) -> Self {
        Self {
            sessions: SessionStore::new(session),
            reject_sign_in: false,
        }
    }

    /// Pushes an auth event to subscribers, as the real provider would on a
    /// change made elsewhere (another tab, an admin action).
    pub fn emit(&self, event: AuthEvent) {
        self.sessions.publish(event);
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(self.sessions.current())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let session = self.exchange_password(email, password).await?;
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn exchange_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<AuthSession, AuthError> {
        if self.reject_sign_in {
            return Err(AuthError::InvalidCredentials);
        }

        // The synthetic user keeps its id; only the email follows the form.
        let mut identity = mock_identity();
        identity.email = Some(email.to_string());
        Ok(mock_session(identity))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let session = self.sessions.current().ok_or(AuthError::NoSession)?;
        self.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn get_user(&self) -> Result<Option<AuthIdentity>, AuthError> {
        Ok(self.sessions.current().map(|session| session.user))
    }

    fn auth_sequence(&self) -> u64 {
        self.sessions.sequence()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.sessions.subscribe()
    }
}
