use crate::chat::ChatStore;
use crate::config::AppConfig;
use crate::preferences::PreferencesStore;
use crate::session::SessionStore;
use crate::storage::{self, SharedStore};
use parley_messaging::User;

/// Everything the presentation layer talks to, with an explicit session lifecycle.
///
/// The conversation store exists exactly while a user is signed in.
pub struct AppState {
    config: AppConfig,
    storage: SharedStore,
    session: SessionStore,
    chat: Option<ChatStore>,
    preferences: PreferencesStore,
}

impl AppState {
    /// Open the configured backend and restore any previous session.
    pub async fn start(config: AppConfig) -> anyhow::Result<Self> {
        let storage = storage::open(&config)?;
        Ok(Self::with_storage(config, storage).await)
    }

    pub async fn with_storage(config: AppConfig, storage: SharedStore) -> Self {
        let session = SessionStore::new(storage.clone(), config.clone());
        let mut state = Self {
            preferences: PreferencesStore::new(storage.clone()),
            chat: None,
            session,
            storage,
            config,
        };
        if let Some(user) = state.session.user() {
            state.open_chat(user);
        }
        state.session.ready().await;
        state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The conversation store, present while signed in.
    pub fn chat(&self) -> Option<&ChatStore> {
        self.chat.as_ref()
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    pub async fn login(&mut self, email: &str, password: &str) -> User {
        let user = self.session.login(email, password).await;
        self.open_chat(user.clone());
        user
    }

    pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> User {
        let user = self.session.signup(name, email, password).await;
        self.open_chat(user.clone());
        user
    }

    pub fn logout(&mut self) {
        if let Some(chat) = self.chat.take() {
            chat.close();
        }
        self.session.logout();
    }

    fn open_chat(&mut self, user: User) {
        if let Some(previous) = self.chat.take() {
            previous.close();
        }
        self.chat = Some(ChatStore::open(user, self.storage.clone(), self.config.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn chat_store_follows_session_lifecycle() {
        let storage: SharedStore = Arc::new(MemoryStore::new());
        let mut app = AppState::with_storage(AppConfig::default(), storage.clone()).await;
        assert!(!app.session().is_loading());
        assert!(app.chat().is_none());

        let user = app.login("kim@example.com", "pw").await;
        let chat = app.chat().unwrap();
        assert_eq!(chat.user(), &user);
        assert_eq!(chat.contacts().await.len(), 3);

        app.logout();
        assert!(app.chat().is_none());
        assert!(!app.session().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_restores_session_and_added_contacts() {
        let storage: SharedStore = Arc::new(MemoryStore::new());
        {
            let mut app = AppState::with_storage(AppConfig::default(), storage.clone()).await;
            app.signup("Kim", "kim@example.com", "pw").await;
            app.chat().unwrap().add_contact("friend@example.com").await.unwrap();
        }

        let app = AppState::with_storage(AppConfig::default(), storage).await;
        let chat = app.chat().unwrap();
        assert_eq!(chat.user().name, "Kim");
        assert_eq!(chat.contacts().await.len(), 4);
    }
}
