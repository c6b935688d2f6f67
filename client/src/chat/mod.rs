//! Conversation state for the signed-in user: roster, active chat and its messages.

mod replies;

pub use replies::ReplyScheduler;

use crate::config::{AppConfig, ReplyPolicy};
use crate::storage::{self, KeyValueStore, SharedStore, ADDED_CONTACTS_KEY};
use parley_messaging::seed::{pick_reply, seed_contacts, seed_conversation};
use parley_messaging::{filter_contacts, now_ms, Contact, ConversationKey, Message, User, UserId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Contact already exists: {email}")]
    DuplicateContact { email: String },
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// Read-only copy of the state handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub contacts: Vec<Contact>,
    pub messages: Vec<Message>,
    pub active_chat: Option<Contact>,
}

#[derive(Debug, Default)]
struct ChatState {
    contacts: Vec<Contact>,
    /// Messages of the active conversation only.
    messages: Vec<Message>,
    active_chat: Option<UserId>,
    /// Bumped whenever `messages` stops describing the view a pending reply was sent from.
    view_epoch: u64,
}

impl ChatState {
    fn contact(&self, id: &UserId) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    fn contact_mut(&mut self, id: &UserId) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| &c.id == id)
    }

    fn is_active(&self, id: &UserId) -> bool {
        self.active_chat.as_ref() == Some(id)
    }

    fn reset_view(&mut self) {
        self.messages.clear();
        self.view_epoch += 1;
    }
}

/// Owns the roster and the active conversation for one signed-in user.
///
/// Created when a user becomes available and dropped (or [`closed`](Self::close))
/// at logout, which also aborts pending synthetic replies.
pub struct ChatStore {
    user: User,
    storage: SharedStore,
    config: AppConfig,
    state: Arc<RwLock<ChatState>>,
    replies: ReplyScheduler,
}

impl ChatStore {
    /// Load the seed roster followed by the contacts the user added.
    ///
    /// Stored contacts are not deduplicated against the seed set.
    pub fn open(user: User, storage: SharedStore, config: AppConfig) -> Self {
        let mut contacts = seed_contacts(now_ms());
        let added: Vec<Contact> = storage::load_or_default(storage.as_ref(), ADDED_CONTACTS_KEY);
        contacts.extend(added);
        debug!(user_id = %user.id, contacts = contacts.len(), "conversation store opened");

        Self {
            user,
            storage,
            config,
            state: Arc::new(RwLock::new(ChatState {
                contacts,
                ..ChatState::default()
            })),
            replies: ReplyScheduler::new(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.read().await;
        ChatSnapshot {
            contacts: state.contacts.clone(),
            messages: state.messages.clone(),
            active_chat: state.active_chat.as_ref().and_then(|id| state.contact(id)).cloned(),
        }
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        self.state.read().await.contacts.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    pub async fn active_chat(&self) -> Option<Contact> {
        let state = self.state.read().await;
        state.active_chat.as_ref().and_then(|id| state.contact(id)).cloned()
    }

    pub async fn contact(&self, id: &UserId) -> Option<Contact> {
        self.state.read().await.contact(id).cloned()
    }

    /// Roster entries whose name or email contains `query`, ignoring case.
    pub async fn search_contacts(&self, query: &str) -> Vec<Contact> {
        let state = self.state.read().await;
        filter_contacts(&state.contacts, query).into_iter().cloned().collect()
    }

    /// Synthetic replies still waiting to fire for the conversation with `contact_id`.
    pub fn pending_replies(&self, contact_id: &UserId) -> usize {
        self.replies.pending(&self.conversation(contact_id))
    }

    /// Switch the visible conversation and reload its messages: the seed
    /// exchange followed by the stored log. `None` shows nothing.
    pub async fn set_active_chat(&self, contact: Option<&Contact>) {
        let mut state = self.state.write().await;
        let next = contact.map(|c| c.id.clone());
        if let Some(id) = &next {
            if state.contact(id).is_none() {
                warn!(contact_id = %id, "ignoring selection of a contact not in the roster");
                return;
            }
        }

        let previous = std::mem::replace(&mut state.active_chat, next.clone());
        if previous != next {
            state.view_epoch += 1;
            if let (Some(left), ReplyPolicy::CancelOnLeave) = (&previous, self.config.reply_policy) {
                self.replies.cancel(&self.conversation(left));
            }
        }

        state.messages = match &next {
            Some(id) => self.rehydrate(id),
            None => Vec::new(),
        };
    }

    /// Send `text` to the active contact and schedule the simulated answer.
    ///
    /// Blank text or no active chat is a no-op returning `None`.
    pub async fn send_message(&self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut state = self.state.write().await;
        let contact_id = state.active_chat.clone()?;
        let key = self.conversation(&contact_id);

        let message = Message::new(self.user.id.clone(), contact_id.clone(), text);
        state.messages.push(message.clone());
        if let Some(contact) = state.contact_mut(&contact_id) {
            contact.last_message = Some(message.text.clone());
            contact.last_message_time = Some(message.timestamp);
        }
        append_to_log(self.storage.as_ref(), &key, &message);
        debug!(conversation = %key, message_id = %message.id, "message sent");

        let delivery = deliver_reply(
            Arc::clone(&self.state),
            Arc::clone(&self.storage),
            key.clone(),
            state.view_epoch,
        );
        self.replies.schedule(key, self.config.reply_delay, delivery);

        Some(message)
    }

    /// Add a contact by email. Fails if any roster entry already has that
    /// exact (case-sensitive) address.
    pub async fn add_contact(&self, email: &str) -> Result<Contact> {
        let mut state = self.state.write().await;
        if state.contacts.iter().any(|c| c.email == email) {
            return Err(ChatError::DuplicateContact {
                email: email.to_owned(),
            });
        }

        let contact = Contact::from_email(email, rand::random::<bool>());
        state.contacts.push(contact.clone());

        let mut added: Vec<Contact> = storage::load_or_default(self.storage.as_ref(), ADDED_CONTACTS_KEY);
        added.push(contact.clone());
        storage::save_or_warn(self.storage.as_ref(), ADDED_CONTACTS_KEY, &added);

        info!(contact_id = %contact.id, "contact added");
        Ok(contact)
    }

    /// Remove a contact together with its conversation log.
    pub async fn delete_contact(&self, contact_id: &UserId) {
        let mut state = self.state.write().await;
        state.contacts.retain(|c| &c.id != contact_id);
        if state.is_active(contact_id) {
            state.active_chat = None;
            state.reset_view();
        }

        self.update_added_contacts(|added| {
            let before = added.len();
            added.retain(|c| &c.id != contact_id);
            added.len() != before
        });

        let key = self.conversation(contact_id);
        if self.config.reply_policy == ReplyPolicy::CancelOnLeave {
            self.replies.cancel(&key);
        }
        storage::remove_or_warn(self.storage.as_ref(), &key.storage_key());
        info!(contact_id = %contact_id, "contact deleted");
    }

    /// Flag a contact as blocked. Sending to it is still allowed.
    pub async fn block_contact(&self, contact_id: &UserId) {
        let mut state = self.state.write().await;
        if let Some(contact) = state.contact_mut(contact_id) {
            contact.is_blocked = Some(true);
        }

        self.update_added_contacts(|added| match added.iter_mut().find(|c| &c.id == contact_id) {
            Some(contact) => {
                contact.is_blocked = Some(true);
                true
            }
            None => false,
        });
        info!(contact_id = %contact_id, "contact blocked");
    }

    /// Drop the stored log for a conversation and its roster preview.
    pub async fn clear_chat_history(&self, contact_id: &UserId) {
        let mut state = self.state.write().await;
        if state.is_active(contact_id) {
            state.reset_view();
        }
        if let Some(contact) = state.contact_mut(contact_id) {
            contact.clear_summary();
        }

        let key = self.conversation(contact_id);
        if self.config.reply_policy == ReplyPolicy::CancelOnLeave {
            self.replies.cancel(&key);
        }
        storage::remove_or_warn(self.storage.as_ref(), &key.storage_key());
        info!(contact_id = %contact_id, "chat history cleared");
    }

    /// Abort every pending synthetic reply. Called at logout.
    pub fn close(&self) {
        let aborted = self.replies.cancel_all();
        debug!(user_id = %self.user.id, aborted, "conversation store closed");
    }

    fn conversation(&self, contact_id: &UserId) -> ConversationKey {
        ConversationKey::new(self.user.id.clone(), contact_id.clone())
    }

    fn rehydrate(&self, contact_id: &UserId) -> Vec<Message> {
        let key = self.conversation(contact_id);
        let mut messages = seed_conversation(&self.user.id, contact_id, now_ms());
        let stored: Vec<Message> = storage::load_or_default(self.storage.as_ref(), &key.storage_key());
        messages.extend(stored);
        messages
    }

    /// Rewrite the stored user-added roster when `edit` reports a change.
    fn update_added_contacts(&self, edit: impl FnOnce(&mut Vec<Contact>) -> bool) {
        let store = self.storage.as_ref();
        let mut added: Vec<Contact> = match storage::load_json(store, ADDED_CONTACTS_KEY) {
            Ok(Some(added)) => added,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "leaving unreadable contact list untouched");
                return;
            }
        };
        if edit(&mut added) {
            storage::save_or_warn(store, ADDED_CONTACTS_KEY, &added);
        }
    }
}

impl Drop for ChatStore {
    fn drop(&mut self) {
        self.replies.cancel_all();
    }
}

fn append_to_log(store: &dyn KeyValueStore, key: &ConversationKey, message: &Message) {
    let storage_key = key.storage_key();
    let mut log: Vec<Message> = storage::load_or_default(store, &storage_key);
    log.push(message.clone());
    storage::save_or_warn(store, &storage_key, &log);
}

/// The simulated contact's answer. Always lands in the stored log; shows up in
/// the visible list only if the view is the one it was sent from.
async fn deliver_reply(state: Arc<RwLock<ChatState>>, storage: SharedStore, key: ConversationKey, epoch: u64) {
    let text = pick_reply(&mut rand::thread_rng());
    let reply = Message::new(key.contact_id.clone(), key.user_id.clone(), text);

    let mut state = state.write().await;
    let visible = state.view_epoch == epoch && state.is_active(&key.contact_id);
    if visible {
        state.messages.push(reply.clone());
    }
    append_to_log(storage.as_ref(), &key, &reply);
    debug!(conversation = %key, message_id = %reply.id, visible, "reply delivered");
}
