use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{AuthError, DirectoryError},
    identity::{AuthChange, IdentityState},
    models::{
        AuthIdentity, AuthSession, DepartmentAffiliation, Profile, PropertyAffiliation, Role,
        RoleRecord, SessionBundle,
    },
    repository::{Repository, RepositoryState},
};

pub const DEFAULT_SESSION_CEILING: Duration = Duration::from_secs(2);
pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_secs(2);

/// TimeoutPolicy
///
/// `session_ceiling` bounds every identity-provider call, and with it the time
/// until the bootstrapper reports ready. `resource_timeout` bounds each directory
/// fetch on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub session_ceiling: Duration,
    pub resource_timeout: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            session_ceiling: DEFAULT_SESSION_CEILING,
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Loading,
    /// Whether a session exists is known. Profile data may still be loading.
    Ready,
}

/// SessionSnapshot
///
/// What consumers observe. `profile_loading` is a side flag that never gates `Ready`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub profile_loading: bool,
    pub bundle: SessionBundle,
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase != SessionPhase::Ready
    }
}

// --- Settle-all resource loading ---

/// ResourceSlices
///
/// Outcome of one background load. `None` marks a slice whose fetch failed or
/// timed out; it leaves the bundle's current value in place. For the profile,
/// `None` also covers "no row".
#[derive(Debug, Default)]
pub struct ResourceSlices {
    pub profile: Option<Profile>,
    pub roles: Option<Vec<RoleRecord>>,
    pub properties: Option<Vec<PropertyAffiliation>>,
    pub departments: Option<Vec<DepartmentAffiliation>>,
}

impl ResourceSlices {
    /// apply_to
    ///
    /// Successful slices replace the bundle's values; failed ones keep what was
    /// there. A bundle left without any profile gets one derived from its identity.
    pub fn apply_to(self, bundle: &mut SessionBundle) {
        if let Some(roles) = self.roles {
            bundle.roles = roles;
        }
        if let Some(properties) = self.properties {
            bundle.properties = properties;
        }
        if let Some(departments) = self.departments {
            bundle.departments = departments;
        }
        match self.profile {
            Some(profile) => bundle.profile = Some(profile),
            None if bundle.profile.is_none() => {
                bundle.profile = bundle.identity.as_ref().map(Profile::from_identity);
            }
            None => {}
        }
    }
}

async fn settle<T, F>(resource: &'static str, user_id: Uuid, limit: Duration, fetch: F) -> Option<T>
where
    F: Future<Output = Result<T, DirectoryError>>,
{
    match timeout(limit, fetch).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(%user_id, resource, error = %e, "resource load failed");
            None
        }
        Err(_) => {
            tracing::warn!(
                %user_id,
                resource,
                timeout_ms = limit.as_millis() as u64,
                "resource load timed out"
            );
            None
        }
    }
}

/// load_resources
///
/// Fetches profile, roles, properties and departments concurrently and waits for
/// all four to settle. Each fetch has its own timeout and error boundary, so one
/// slow or failing table never holds back or spoils the others.
pub async fn load_resources(repo: &dyn Repository, user_id: Uuid, limit: Duration) -> ResourceSlices {
    let (profile, roles, properties, departments) = tokio::join!(
        settle("profile", user_id, limit, repo.get_profile(user_id)),
        settle("roles", user_id, limit, repo.get_roles(user_id)),
        settle("properties", user_id, limit, repo.get_properties(user_id)),
        settle("departments", user_id, limit, repo.get_departments(user_id)),
    );

    if matches!(profile, Some(None)) {
        tracing::warn!(%user_id, "no profile row; falling back to identity record");
    }

    ResourceSlices {
        profile: profile.flatten(),
        roles,
        properties,
        departments,
    }
}

// --- Bootstrapper ---

/// Generation
///
/// State tied to the current identity, replaced on every reset. `barrier` is the
/// provider sequence at the start of the latest call the bootstrapper settled
/// itself; queued events at or below it are stale.
struct Generation {
    token: CancellationToken,
    loaded_for: Option<Uuid>,
    barrier: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// SessionBootstrapper
///
/// Establishes who is signed in and loads what the rest of the application needs
/// to know about them. It is the only writer of the session bundle; everyone else
/// reads through a [`SessionHandle`].
///
/// Lifecycle:
/// 1. `start()` moves to `Loading`, asks the provider for an existing session and
///    reaches `Ready` as soon as the answer is known, or when the session ceiling
///    elapses, whichever comes first.
/// 2. With a session, profile/roles/properties/departments load in the background.
/// 3. Sign-out, or a switch to a different identity, clears the bundle as a whole
///    and cancels whatever the previous identity still had in flight.
/// 4. `shutdown()` stops all further writes.
pub struct SessionBootstrapper {
    provider: IdentityState,
    repo: RepositoryState,
    policy: TimeoutPolicy,
    state: watch::Sender<SessionSnapshot>,
    root: CancellationToken,
    generation: Mutex<Generation>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionBootstrapper {
    pub fn new(provider: IdentityState, repo: RepositoryState, policy: TimeoutPolicy) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot::default());
        let root = CancellationToken::new();
        let generation = Generation {
            token: root.child_token(),
            loaded_for: None,
            barrier: 0,
        };

        Arc::new(Self {
            provider,
            repo,
            policy,
            state,
            root,
            generation: Mutex::new(generation),
            listener: Mutex::new(None),
        })
    }

    /// A read-only view of the session state.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.state.subscribe(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// start
    ///
    /// Resolves the existing session. Returns once the phase is `Ready`, which is
    /// never later than the session ceiling. Background loading continues after
    /// this returns.
    pub async fn start(self: &Arc<Self>) {
        self.set_phase(SessionPhase::Loading);
        self.listen_for_auth_events();

        let ceiling = self.policy.session_ceiling;
        let since = self.provider.auth_sequence();
        match timeout(ceiling, self.provider.get_session()).await {
            Ok(Ok(Some(session))) => {
                tracing::info!(user_id = %session.user.id, "existing session found");
                self.settle_call(since, Some(session));
            }
            Ok(Ok(None)) => {
                tracing::debug!("no existing session");
                self.settle_call(since, None);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session lookup failed; continuing signed out");
                self.settle_call(since, None);
            }
            Err(_) => {
                // The result, if it ever arrives, is ignored.
                tracing::warn!(
                    ceiling_ms = ceiling.as_millis() as u64,
                    "session lookup exceeded ceiling; continuing without identity"
                );
            }
        }

        self.set_phase(SessionPhase::Ready);
    }

    /// sign_in
    ///
    /// Password sign-in. Provider failures come back as an `AuthError` value for
    /// the login form; on success the session is applied and loading starts in
    /// the background.
    pub async fn sign_in(
        self: &Arc<Self>,
        email: &str,
        password: &str,
    ) -> Result<AuthIdentity, AuthError> {
        let ceiling = self.policy.session_ceiling;
        let since = self.provider.auth_sequence();
        let outcome = timeout(ceiling, self.provider.sign_in_with_password(email, password))
            .await
            .map_err(|_| AuthError::Timeout(ceiling.as_millis()))
            .and_then(|result| result);

        match outcome {
            Ok(session) => {
                let identity = session.user.clone();
                self.settle_call(since, Some(session));
                self.set_phase(SessionPhase::Ready);
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    /// sign_out
    ///
    /// Always leaves a fully cleared bundle behind. A failed remote revoke is
    /// reported but does not keep any local state alive.
    pub async fn sign_out(self: &Arc<Self>) -> Result<(), AuthError> {
        let ceiling = self.policy.session_ceiling;
        let since = self.provider.auth_sequence();
        let outcome = timeout(ceiling, self.provider.sign_out())
            .await
            .map_err(|_| AuthError::Timeout(ceiling.as_millis()))
            .and_then(|result| result);

        self.settle_call(since, None);

        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "remote sign-out failed; local session cleared");
        }
        outcome
    }

    /// Exchanges the refresh token. A different identity coming back resets the bundle.
    pub async fn refresh_session(self: &Arc<Self>) -> Result<AuthIdentity, AuthError> {
        let ceiling = self.policy.session_ceiling;
        let since = self.provider.auth_sequence();
        let session = timeout(ceiling, self.provider.refresh_session())
            .await
            .map_err(|_| AuthError::Timeout(ceiling.as_millis()))??;

        let identity = session.user.clone();
        self.settle_call(since, Some(session));
        Ok(identity)
    }

    /// handle_auth_event
    ///
    /// Reruns the bootstrap sequence for one provider event. Events for the
    /// identity already loaded only refresh the identity record. Events published
    /// before a sign-in, sign-out or refresh that has since been settled are dropped.
    pub fn handle_auth_event(self: &Arc<Self>, change: AuthChange) {
        let session = change.event.session().cloned();
        {
            let mut generation = lock(&self.generation);
            if change.seq <= generation.barrier {
                tracing::debug!(seq = change.seq, "stale auth event dropped");
                return;
            }
            tracing::debug!(
                seq = change.seq,
                user_id = ?session.as_ref().map(|session| session.user.id),
                "auth state changed"
            );
            self.transition(&mut generation, session);
        }
        self.set_phase(SessionPhase::Ready);
    }

    /// load_profile
    ///
    /// Loads the profile, roles, properties and departments for `identity`.
    /// A second request for an identity that is already loaded (or loading) is a
    /// no-op and returns `false`.
    pub async fn load_profile(&self, identity: &AuthIdentity) -> bool {
        let token = self.generation_token();
        self.load_profile_in(identity, token).await
    }

    /// Reloads the current identity's data. Slices that fail keep their cached values.
    pub async fn refresh_profile(&self) -> bool {
        let identity = self.state.borrow().bundle.identity.clone();
        let Some(identity) = identity else {
            return false;
        };
        lock(&self.generation).loaded_for = None;
        self.load_profile(&identity).await
    }

    /// shutdown
    ///
    /// Teardown: nothing still in flight may write to the session afterwards.
    pub fn shutdown(&self) {
        self.root.cancel();
        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }
    }

    fn generation_token(&self) -> CancellationToken {
        lock(&self.generation).token.clone()
    }

    /// Claims the load for `user_id` under `token`. False if the generation is
    /// gone or this identity is already claimed.
    fn claim_load(&self, user_id: Uuid, token: &CancellationToken) -> bool {
        let mut generation = lock(&self.generation);
        if token.is_cancelled() || generation.loaded_for == Some(user_id) {
            return false;
        }
        // Only the identity the bundle belongs to may be loaded.
        if self.state.borrow().bundle.identity_id() != Some(user_id) {
            return false;
        }
        generation.loaded_for = Some(user_id);
        true
    }

    async fn load_profile_in(&self, identity: &AuthIdentity, token: CancellationToken) -> bool {
        let user_id = identity.id;
        if !self.claim_load(user_id, &token) {
            tracing::debug!(%user_id, "profile load skipped");
            return false;
        }

        self.write_for(&token, user_id, |snapshot| {
            snapshot.profile_loading = true;
            true
        });

        let slices = load_resources(self.repo.as_ref(), user_id, self.policy.resource_timeout).await;

        let applied = self.write_for(&token, user_id, |snapshot| {
            slices.apply_to(&mut snapshot.bundle);
            snapshot.profile_loading = false;
            true
        });
        if applied {
            tracing::debug!(%user_id, "session bundle populated");
        } else {
            tracing::debug!(%user_id, "discarding load for superseded session");
        }
        true
    }

    /// Settles the outcome of a provider call that started at sequence `since`.
    /// Events queued before the call can no longer override it.
    fn settle_call(self: &Arc<Self>, since: u64, session: Option<AuthSession>) {
        let mut generation = lock(&self.generation);
        generation.barrier = generation.barrier.max(since);
        self.transition(&mut generation, session);
    }

    /// transition
    ///
    /// Moves the bundle to `session`, or to signed out. Runs with the generation
    /// lock held, so the identity check, the reset and the token the load runs
    /// under cannot interleave with another transition.
    fn transition(self: &Arc<Self>, generation: &mut Generation, session: Option<AuthSession>) {
        let Some(session) = session else {
            self.reset_locked(generation);
            return;
        };

        let identity = session.user;
        let current = self.state.borrow().bundle.identity_id();
        if current != Some(identity.id) {
            self.reset_locked(generation);
        }

        let token = generation.token.clone();
        let stored = identity.clone();
        self.write(&token, move |snapshot| {
            snapshot.bundle.identity = Some(stored);
            true
        });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.load_profile_in(&identity, token).await;
        });
    }

    /// reset_locked
    ///
    /// Clears identity, profile, roles, properties and departments together and
    /// cancels everything the previous generation still has in flight.
    fn reset_locked(&self, generation: &mut Generation) {
        generation.token.cancel();
        generation.token = self.root.child_token();
        generation.loaded_for = None;

        let root = &self.root;
        self.state.send_if_modified(|snapshot| {
            if root.is_cancelled() {
                return false;
            }
            let changed = !snapshot.bundle.is_empty() || snapshot.profile_loading;
            snapshot.bundle = SessionBundle::default();
            snapshot.profile_loading = false;
            changed
        });
    }

    fn set_phase(&self, phase: SessionPhase) {
        let root = &self.root;
        self.state.send_if_modified(|snapshot| {
            if root.is_cancelled() || snapshot.phase == phase {
                return false;
            }
            snapshot.phase = phase;
            true
        });
    }

    fn write<F>(&self, token: &CancellationToken, modify: F) -> bool
    where
        F: FnOnce(&mut SessionSnapshot) -> bool,
    {
        self.state.send_if_modified(|snapshot| {
            if token.is_cancelled() {
                return false;
            }
            modify(snapshot)
        })
    }

    /// Writes only while the bundle still belongs to `user_id`.
    fn write_for<F>(&self, token: &CancellationToken, user_id: Uuid, modify: F) -> bool
    where
        F: FnOnce(&mut SessionSnapshot) -> bool,
    {
        self.write(token, |snapshot| {
            if snapshot.bundle.identity_id() != Some(user_id) {
                return false;
            }
            modify(snapshot)
        })
    }

    fn listen_for_auth_events(self: &Arc<Self>) {
        let mut slot = lock(&self.listener);
        if slot.is_some() {
            return;
        }

        let events = self.provider.subscribe();
        let root = self.root.clone();
        let this = Arc::downgrade(self);
        *slot = Some(tokio::spawn(pump_auth_events(this, events, root)));
    }
}

impl Drop for SessionBootstrapper {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Applies provider events one at a time, in emission order.
async fn pump_auth_events(
    bootstrapper: Weak<SessionBootstrapper>,
    mut events: broadcast::Receiver<AuthChange>,
    root: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = root.cancelled() => break,
            received = events.recv() => received,
        };

        match received {
            Ok(change) => {
                let Some(bootstrapper) = bootstrapper.upgrade() else {
                    break;
                };
                bootstrapper.handle_auth_event(change);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "auth events dropped; listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// SessionHandle
///
/// Read-only access to the session state for the rest of the application.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    pub fn primary_role(&self) -> Option<Role> {
        self.rx.borrow().bundle.primary_role()
    }

    /// Waits until `predicate` holds and returns the snapshot it held for. If the
    /// bootstrapper is gone the last known snapshot is returned.
    pub async fn wait_for<P>(&mut self, predicate: P) -> SessionSnapshot
    where
        P: FnMut(&SessionSnapshot) -> bool,
    {
        let outcome = self.rx.wait_for(predicate).await.map(|snapshot| (*snapshot).clone());
        outcome.unwrap_or_else(|_| self.rx.borrow().clone())
    }

    pub async fn wait_until_ready(&mut self) -> SessionSnapshot {
        self.wait_for(|snapshot| snapshot.phase == SessionPhase::Ready)
            .await
    }

    /// Resolves on the next change. False once the bootstrapper is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
