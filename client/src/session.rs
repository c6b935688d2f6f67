//! Signed-in user tracking. Authentication is simulated: every login succeeds.

use crate::config::AppConfig;
use crate::storage::{self, SharedStore, SESSION_USER_KEY};
use parley_messaging::{name_from_email, User};
use tokio::sync::watch;
use tracing::{info, warn};

/// What dependents observe about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

pub struct SessionStore {
    storage: SharedStore,
    config: AppConfig,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Rehydrate the stored user, if any. The store reports loading until
    /// [`SessionStore::ready`] completes.
    pub fn new(storage: SharedStore, config: AppConfig) -> Self {
        let user = match storage::load_json::<User>(storage.as_ref(), SESSION_USER_KEY) {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "discarding unreadable session record");
                None
            }
        };
        if let Some(user) = &user {
            info!(user_id = %user.id, "restored session");
        }

        let (state, _) = watch::channel(SessionState {
            user,
            is_loading: true,
        });
        Self {
            storage,
            config,
            state,
        }
    }

    /// Hold the loading state for the configured minimum, then release it.
    pub async fn ready(&self) {
        tokio::time::sleep(self.config.restore_delay).await;
        self.state.send_modify(|s| s.is_loading = false);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Sign in as `email`. The password is not checked.
    pub async fn login(&self, email: &str, _password: &str) -> User {
        let user = self.sign_in(User::new(name_from_email(email), email)).await;
        info!(user_id = %user.id, "logged in");
        user
    }

    /// Create an account named `name`. The password is not checked.
    pub async fn signup(&self, name: &str, email: &str, _password: &str) -> User {
        let user = self.sign_in(User::new(name, email)).await;
        info!(user_id = %user.id, "signed up");
        user
    }

    pub fn logout(&self) {
        storage::remove_or_warn(self.storage.as_ref(), SESSION_USER_KEY);
        let previous = self.state.send_replace(SessionState::default());
        if let Some(user) = previous.user {
            info!(user_id = %user.id, "logged out");
        }
    }

    async fn sign_in(&self, user: User) -> User {
        self.state.send_modify(|s| s.is_loading = true);
        tokio::time::sleep(self.config.login_delay).await;

        storage::save_or_warn(self.storage.as_ref(), SESSION_USER_KEY, &user);
        self.state.send_replace(SessionState {
            user: Some(user.clone()),
            is_loading: false,
        });
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn memory() -> (Arc<MemoryStore>, SharedStore) {
        let backend = Arc::new(MemoryStore::new());
        let shared: SharedStore = backend.clone();
        (backend, shared)
    }

    #[tokio::test(start_paused = true)]
    async fn restore_reports_loading_for_minimum_delay() {
        let (_, storage) = memory();
        let session = SessionStore::new(storage, AppConfig::default());
        assert!(session.is_loading());
        assert!(!session.is_authenticated());

        let started = Instant::now();
        session.ready().await;
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn login_fabricates_and_persists_user() {
        let (backend, storage) = memory();
        let session = SessionStore::new(storage.clone(), AppConfig::default());
        session.ready().await;

        let started = Instant::now();
        let user = session.login("robin@example.com", "anything").await;
        assert!(started.elapsed() >= Duration::from_millis(1000));

        assert_eq!(user.name, "robin");
        assert_eq!(user.email, "robin@example.com");
        assert!(user.is_online);
        assert!(user.id.as_str().starts_with("usr_"));
        assert_eq!(session.user(), Some(user.clone()));
        assert!(backend.get(SESSION_USER_KEY).unwrap().is_some());

        let restored = SessionStore::new(storage, AppConfig::default());
        assert_eq!(restored.user(), Some(user));
    }

    #[tokio::test(start_paused = true)]
    async fn login_is_observable_as_loading() {
        let (_, storage) = memory();
        let session = Arc::new(SessionStore::new(storage, AppConfig::default()));
        session.ready().await;
        let watcher = session.subscribe();

        let pending = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.signup("Robin Hood", "robin@example.com", "pw").await }
        });
        tokio::task::yield_now().await;
        assert!(watcher.borrow().is_loading);

        let user = pending.await.unwrap();
        assert_eq!(user.name, "Robin Hood");
        assert!(!watcher.borrow().is_loading);
        assert!(watcher.borrow().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_clears_memory_and_storage() {
        let (backend, storage) = memory();
        let session = SessionStore::new(storage, AppConfig::default());
        session.login("a@example.com", "pw").await;

        session.logout();
        assert!(session.user().is_none());
        assert_eq!(backend.get(SESSION_USER_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_session_record_is_ignored() {
        let (backend, storage) = memory();
        backend.set(SESSION_USER_KEY, "{not json").unwrap();
        let session = SessionStore::new(storage, AppConfig::default());
        assert!(session.user().is_none());
    }
}
