//! # Auth Resolver — one coherent session across two backends
//!
//! [`AuthResolver`] mediates between a [`RemoteIdentity`] service and the
//! [`LocalBackend`] credential fallback, and owns the single process-wide
//! session. Whether a remote backend exists is decided once at construction
//! ([`AuthResolver::remote_available`]) and never re-evaluated per call.
//!
//! ## Resolution policy
//!
//! | Operation | Remote configured | Remote absent |
//! |-----------|------------------|---------------|
//! | [`login`](AuthResolver::login) | Remote first; on failure fall back to the local credential match. If both fail, the *original remote* error is returned. | Local credential match only. |
//! | [`register`](AuthResolver::register) | Remote account first (its error propagates), then a best-effort local mirror write. | Local only, unique email enforced. |
//! | [`logout`](AuthResolver::logout) | Remote sign-out (failure logged, never blocking), then unconditional clear. | Unconditional clear. |
//! | [`login_with_oauth`](AuthResolver::login_with_oauth) | Delegates the redirect flow; the session arrives later via the event stream. | [`AuthError::BackendUnavailable`]. |
//!
//! ## Session lifecycle
//!
//! `Anonymous → Authenticated` on successful login or a restored/notified
//! session; `Authenticated → Anonymous` on logout or a remote sign-out
//! notification. The session slot carries a generation counter: logout bumps
//! it, and a login that began before the bump refuses to commit, so a stale
//! in-flight login can never resurrect a session the user has since ended.
//!
//! [`subscribe_remote`](AuthResolver::subscribe_remote) spawns the
//! process-lifetime listener for remote auth-change notifications; it is
//! released by [`shutdown`](AuthResolver::shutdown) or drop.

use std::sync::{Arc, Mutex};

use store::KvStore;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::http_remote::HttpRemote;
use crate::local::LocalBackend;
use crate::remote::{AuthEvent, OAuthProvider, RemoteIdentity};
use crate::session::User;
use crate::settings::Settings;

#[derive(Debug, Default)]
struct SessionSlot {
    user: Option<User>,
    generation: u64,
}

/// Unified login/register/logout/OAuth surface over both backends.
pub struct AuthResolver<R: RemoteIdentity, S: KvStore> {
    remote: Option<R>,
    local: LocalBackend<S>,
    redirect: String,
    slot: Arc<Mutex<SessionSlot>>,
    listener: Option<tokio::task::JoinHandle<()>>,
}

/// Boundary check for registration input. Rejected input never reaches a
/// backend.
pub fn validate_registration(email: &str, password: &str, confirm: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(AuthError::Validation("all fields are required".into()));
    }
    if password != confirm {
        return Err(AuthError::Validation("passwords do not match".into()));
    }
    Ok(())
}

impl<S: KvStore> AuthResolver<HttpRemote, S> {
    /// Build a resolver from settings. Remote availability is fixed here:
    /// present iff the remote service is fully configured.
    pub fn from_settings(settings: &Settings, store: S) -> Result<Self, AuthError> {
        let remote = if settings.remote_configured() {
            Some(HttpRemote::new(&settings.remote)?)
        } else {
            None
        };
        Ok(Self::new(
            remote,
            LocalBackend::new(store),
            settings.remote.redirect.clone(),
        ))
    }
}

impl<R: RemoteIdentity, S: KvStore> AuthResolver<R, S> {
    pub fn new(remote: Option<R>, local: LocalBackend<S>, redirect: String) -> Self {
        Self {
            remote,
            local,
            redirect,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
            listener: None,
        }
    }

    /// Whether the remote backend was configured at construction.
    pub fn remote_available(&self) -> bool {
        self.remote.is_some()
    }

    /// The active user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.slot.lock().unwrap().user.clone()
    }

    fn generation(&self) -> u64 {
        self.slot.lock().unwrap().generation
    }

    /// Commit a session if no logout happened since `generation` was
    /// observed. Returns false for a stale completion.
    fn adopt(&self, generation: u64, user: &User) -> bool {
        let mut slot = self.slot.lock().unwrap();
        if slot.generation != generation {
            info!(email = %user.email, "discarding stale login completion");
            return false;
        }
        slot.user = Some(user.clone());
        true
    }

    /// Adopt and persist the session marker.
    fn establish(&self, generation: u64, user: &User) -> Result<(), AuthError> {
        if self.adopt(generation, user) {
            info!(email = %user.email, "session established");
            self.local.save_session(user)?;
        }
        Ok(())
    }

    /// Validate credentials against the remote backend, falling back to the
    /// local credential store. When both backends reject, the remote
    /// failure is the one reported.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let generation = self.generation();
        let Some(remote) = &self.remote else {
            let user = self.local.login(email, password)?;
            self.establish(generation, &user)?;
            return Ok(user);
        };

        match remote.sign_in_with_password(email, password).await {
            Ok(session) => {
                let user = User::remote(&session.email, &session.user_id);
                self.establish(generation, &user)?;
                Ok(user)
            }
            Err(remote_err) => match self.local.login(email, password) {
                Ok(user) => {
                    self.establish(generation, &user)?;
                    Ok(user)
                }
                // Propagate the original remote failure, not the local one
                Err(_) => Err(remote_err),
            },
        }
    }

    /// Create an account. With a remote backend the remote account is
    /// authoritative; the local write is a durable mirror, and a
    /// pre-existing local credential is tolerated (logged, not failed)
    /// because the authoritative registration succeeded.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let Some(remote) = &self.remote else {
            return self.local.register(email, password);
        };

        remote.sign_up(email, password).await?;
        match self.local.register(email, password) {
            Ok(()) => Ok(()),
            Err(AuthError::EmailAlreadyRegistered) => {
                warn!(email, "local mirror already holds this email; remote registration stands");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// End the session. The remote sign-out is attempted when available but
    /// the in-memory session and persisted marker are cleared regardless.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.sign_out().await {
                warn!(error = %e, "remote sign-out failed, clearing session anyway");
            }
        }
        {
            let mut slot = self.slot.lock().unwrap();
            slot.user = None;
            slot.generation += 1;
        }
        info!("session cleared");
        self.local.clear_session()?;
        Ok(())
    }

    /// Delegate a third-party sign-in to the remote backend. Returns once
    /// the delegation is dispatched; the session itself arrives through the
    /// auth-change subscription.
    pub async fn login_with_oauth(&self, provider: OAuthProvider) -> Result<(), AuthError> {
        let remote = self.remote.as_ref().ok_or(AuthError::BackendUnavailable)?;
        remote.sign_in_with_oauth(provider, &self.redirect).await
    }

    /// Startup restoration: adopt an active remote session if one exists,
    /// otherwise fall back to the persisted local marker.
    pub async fn restore_session(&self) -> Option<User> {
        let generation = self.generation();
        if let Some(remote) = &self.remote {
            if let Some(session) = remote.get_session().await {
                let user = User::remote(&session.email, &session.user_id);
                if let Err(e) = self.establish(generation, &user) {
                    warn!(error = %e, "failed to persist restored session marker");
                }
                return Some(user);
            }
        }
        let user = self.local.load_session()?;
        self.adopt(generation, &user);
        Some(user)
    }
}

impl<R: RemoteIdentity, S: KvStore + Clone + Send + 'static> AuthResolver<R, S> {
    /// Subscribe to the remote backend's auth-change notifications for the
    /// rest of the process lifetime. Handlers are idempotent with respect
    /// to redundant notifications of the same state.
    pub fn subscribe_remote(&mut self) {
        let Some(remote) = &self.remote else {
            return;
        };
        let mut events = remote.subscribe();
        let slot = Arc::clone(&self.slot);
        let local = self.local.clone();

        self.listener = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn(session)) => {
                        let user = User::remote(&session.email, &session.user_id);
                        let adopted = {
                            let mut slot = slot.lock().unwrap();
                            if slot.user.as_ref() == Some(&user) {
                                false
                            } else {
                                slot.user = Some(user.clone());
                                true
                            }
                        };
                        if adopted {
                            info!(email = %user.email, "adopted remote session");
                            if let Err(e) = local.save_session(&user) {
                                warn!(error = %e, "failed to persist session marker");
                            }
                        }
                    }
                    Ok(AuthEvent::SignedOut) => {
                        let cleared = {
                            let mut slot = slot.lock().unwrap();
                            if slot.user.take().is_some() {
                                slot.generation += 1;
                                true
                            } else {
                                false
                            }
                        };
                        if cleared {
                            info!("remote session invalidated");
                        }
                        if let Err(e) = local.clear_session() {
                            warn!(error = %e, "failed to remove session marker");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Release the auth-change subscription.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl<R: RemoteIdentity, S: KvStore> Drop for AuthResolver<R, S> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteSession;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use store::{MemoryStore, StoreError};
    use tokio::sync::Notify;

    /// Scripted stand-in for the remote identity service.
    struct FakeRemote {
        // email/password pair the service accepts, and the session it hands out
        accepts: Option<(String, String, RemoteSession)>,
        duplicate_sign_up: bool,
        reject_oauth: bool,
        // parks sign_in_with_password until notified
        gate: Option<Arc<Notify>>,
        session: Mutex<Option<RemoteSession>>,
        sign_outs: AtomicUsize,
        events: broadcast::Sender<AuthEvent>,
    }

    impl FakeRemote {
        fn new() -> Self {
            let (events, _) = broadcast::channel(16);
            Self {
                accepts: None,
                duplicate_sign_up: false,
                reject_oauth: false,
                gate: None,
                session: Mutex::new(None),
                sign_outs: AtomicUsize::new(0),
                events,
            }
        }

        fn accepting(email: &str, password: &str) -> Self {
            let mut fake = Self::new();
            fake.accepts = Some((
                email.to_string(),
                password.to_string(),
                RemoteSession {
                    user_id: "uid-1".into(),
                    email: email.to_string(),
                    access_token: "tok".into(),
                },
            ));
            fake
        }
    }

    impl RemoteIdentity for FakeRemote {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<RemoteSession, AuthError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.accepts {
                Some((e, p, session)) if e == email && p == password => {
                    *self.session.lock().unwrap() = Some(session.clone());
                    Ok(session.clone())
                }
                _ => Err(AuthError::Remote("invalid login credentials".into())),
            }
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), AuthError> {
            if self.duplicate_sign_up {
                Err(AuthError::EmailAlreadyRegistered)
            } else {
                Ok(())
            }
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            *self.session.lock().unwrap() = None;
            Ok(())
        }

        async fn get_session(&self) -> Option<RemoteSession> {
            self.session.lock().unwrap().clone()
        }

        async fn sign_in_with_oauth(
            &self,
            provider: OAuthProvider,
            _redirect_to: &str,
        ) -> Result<(), AuthError> {
            if self.reject_oauth {
                Err(AuthError::Remote(format!(
                    "provider {} is not enabled",
                    provider.as_str()
                )))
            } else {
                Ok(())
            }
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }

    fn local_only(store: MemoryStore) -> AuthResolver<FakeRemote, MemoryStore> {
        AuthResolver::new(None, LocalBackend::new(store), String::new())
    }

    fn with_remote(
        remote: FakeRemote,
        store: MemoryStore,
    ) -> AuthResolver<FakeRemote, MemoryStore> {
        AuthResolver::new(
            Some(remote),
            LocalBackend::new(store),
            "http://localhost:8080/todos".into(),
        )
    }

    async fn eventually(check: impl Fn() -> bool) -> bool {
        for _ in 0..50 {
            if check() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        check()
    }

    #[tokio::test]
    async fn test_local_login_success_sets_session_and_marker() {
        let kv = MemoryStore::new();
        let resolver = local_only(kv.clone());
        resolver.register("a@x.com", "p").await.unwrap();

        let user = resolver.login("a@x.com", "p").await.unwrap();
        assert_eq!(user, User::local("a@x.com"));
        assert_eq!(resolver.current_user(), Some(user.clone()));
        assert_eq!(LocalBackend::new(kv).load_session(), Some(user));
    }

    #[tokio::test]
    async fn test_local_login_failure_leaves_session_anonymous() {
        let resolver = local_only(MemoryStore::new());
        resolver.register("a@x.com", "p").await.unwrap();

        let err = resolver.login("a@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(resolver.current_user().is_none());
    }

    #[tokio::test]
    async fn test_remote_login_success() {
        let resolver = with_remote(FakeRemote::accepting("a@x.com", "p"), MemoryStore::new());
        assert!(resolver.remote_available());

        let user = resolver.login("a@x.com", "p").await.unwrap();
        assert_eq!(user.id.as_deref(), Some("uid-1"));
        assert_eq!(resolver.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let kv = MemoryStore::new();
        LocalBackend::new(kv.clone()).register("a@x.com", "p").unwrap();

        // Remote rejects everything
        let resolver = with_remote(FakeRemote::new(), kv);
        let user = resolver.login("a@x.com", "p").await.unwrap();
        assert!(user.id.is_none());
        assert_eq!(resolver.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_both_backends_failing_reports_the_remote_error() {
        let resolver = with_remote(FakeRemote::new(), MemoryStore::new());

        let err = resolver.login("a@x.com", "p").await.unwrap_err();
        assert!(matches!(err, AuthError::Remote(m) if m == "invalid login credentials"));
        assert!(resolver.current_user().is_none());
    }

    #[tokio::test]
    async fn test_register_local_duplicate() {
        let resolver = local_only(MemoryStore::new());
        resolver.register("a@x.com", "p").await.unwrap();

        let err = resolver.register("a@x.com", "p2").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn test_register_remote_rejection_propagates() {
        let mut remote = FakeRemote::new();
        remote.duplicate_sign_up = true;
        let kv = MemoryStore::new();
        let resolver = with_remote(remote, kv.clone());

        let err = resolver.register("a@x.com", "p").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyRegistered));
        // The local mirror was never written
        assert!(LocalBackend::new(kv).login("a@x.com", "p").is_err());
    }

    #[tokio::test]
    async fn test_register_mirror_conflict_is_best_effort() {
        let kv = MemoryStore::new();
        LocalBackend::new(kv.clone()).register("a@x.com", "old").unwrap();

        let resolver = with_remote(FakeRemote::new(), kv.clone());
        // Remote accepts the registration; the stale local mirror is tolerated
        resolver.register("a@x.com", "new").await.unwrap();
        assert!(LocalBackend::new(kv).login("a@x.com", "old").is_ok());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let kv = MemoryStore::new();
        let resolver = with_remote(FakeRemote::accepting("a@x.com", "p"), kv.clone());
        resolver.login("a@x.com", "p").await.unwrap();

        resolver.logout().await.unwrap();
        assert!(resolver.current_user().is_none());
        assert!(LocalBackend::new(kv).load_session().is_none());
        assert_eq!(
            resolver.remote.as_ref().unwrap().sign_outs.load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_oauth_requires_remote() {
        let resolver = local_only(MemoryStore::new());
        let err = resolver
            .login_with_oauth(OAuthProvider::Google)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BackendUnavailable));
    }

    #[tokio::test]
    async fn test_oauth_provider_rejection_is_a_normal_failure() {
        let mut remote = FakeRemote::new();
        remote.reject_oauth = true;
        let resolver = with_remote(remote, MemoryStore::new());

        let err = resolver
            .login_with_oauth(OAuthProvider::Naver)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Remote(m) if m.contains("naver")));
    }

    #[tokio::test]
    async fn test_restore_prefers_remote_session() {
        let remote = FakeRemote::accepting("a@x.com", "p");
        *remote.session.lock().unwrap() = Some(RemoteSession {
            user_id: "uid-1".into(),
            email: "a@x.com".into(),
            access_token: "tok".into(),
        });
        let kv = MemoryStore::new();
        LocalBackend::new(kv.clone())
            .save_session(&User::local("stale@x.com"))
            .unwrap();

        let resolver = with_remote(remote, kv);
        let user = resolver.restore_session().await.unwrap();
        assert_eq!(user, User::remote("a@x.com", "uid-1"));
        assert_eq!(resolver.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_restore_falls_back_to_local_marker() {
        let kv = MemoryStore::new();
        LocalBackend::new(kv.clone())
            .save_session(&User::local("a@x.com"))
            .unwrap();

        let resolver = with_remote(FakeRemote::new(), kv);
        let user = resolver.restore_session().await.unwrap();
        assert_eq!(user, User::local("a@x.com"));
        assert_eq!(resolver.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_restore_with_nothing_stays_anonymous() {
        let resolver = local_only(MemoryStore::new());
        assert!(resolver.restore_session().await.is_none());
        assert!(resolver.current_user().is_none());
    }

    #[tokio::test]
    async fn test_subscription_adopts_and_invalidates() {
        let remote = FakeRemote::new();
        let events = remote.events.clone();
        let kv = MemoryStore::new();
        let mut resolver = with_remote(remote, kv.clone());
        resolver.subscribe_remote();

        events
            .send(AuthEvent::SignedIn(RemoteSession {
                user_id: "uid-1".into(),
                email: "a@x.com".into(),
                access_token: "tok".into(),
            }))
            .unwrap();
        assert!(eventually(|| resolver.current_user().is_some()).await);
        assert_eq!(
            LocalBackend::new(kv.clone()).load_session(),
            Some(User::remote("a@x.com", "uid-1"))
        );

        // Redundant notification of the same session is harmless
        events
            .send(AuthEvent::SignedIn(RemoteSession {
                user_id: "uid-1".into(),
                email: "a@x.com".into(),
                access_token: "tok".into(),
            }))
            .unwrap();

        events.send(AuthEvent::SignedOut).unwrap();
        assert!(eventually(|| resolver.current_user().is_none()).await);
        assert!(LocalBackend::new(kv).load_session().is_none());

        resolver.shutdown();
    }

    #[tokio::test]
    async fn test_stale_login_cannot_overwrite_logout() {
        let gate = Arc::new(Notify::new());
        let mut remote = FakeRemote::accepting("a@x.com", "p");
        remote.gate = Some(Arc::clone(&gate));
        let resolver = with_remote(remote, MemoryStore::new());

        let (login_result, ()) = tokio::join!(resolver.login("a@x.com", "p"), async {
            // Let the login start and park on the gate, then log out
            tokio::task::yield_now().await;
            resolver.logout().await.unwrap();
            gate.notify_one();
        });

        // The remote accepted the credentials, but the completion was stale
        login_result.unwrap();
        assert!(resolver.current_user().is_none());
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration("a@x.com", "p", "p").is_ok());
        assert!(matches!(
            validate_registration("", "p", "p"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            validate_registration("a@x.com", "p", "q"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            validate_registration("a@x.com", "", ""),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_persistence_error_converts() {
        let err: AuthError = StoreError::Serialize {
            key: "users".into(),
            source: serde_json::from_str::<()>("x").unwrap_err(),
        }
        .into();
        assert!(matches!(err, AuthError::Persistence(_)));
    }
}
