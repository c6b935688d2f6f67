//! Conversation models shared by the Parley stores and presentation layers.

pub mod contacts;
pub mod seed;

pub use contacts::{activity_label, filter_contacts, Contact};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identifier of a user or a contact.
///
/// Both sides of a conversation share this type because a message's sender
/// may be either the signed-in user or the contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(format!("usr_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Unique identifier for a single message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(format!("msg_{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in user. Fabricated locally at login or signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_online: bool,
}

impl User {
    /// Build a freshly identified, online user with the avatar derived from `email`.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: UserId::generate(),
            name: name.into(),
            avatar: Some(avatar_url(&email)),
            email,
            is_online: true,
        }
    }
}

/// One entry of a conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub is_read: bool,
}

impl Message {
    /// New unread message stamped with the current time.
    pub fn new(sender_id: UserId, receiver_id: UserId, text: impl Into<String>) -> Self {
        Self::at(sender_id, receiver_id, text, now_ms())
    }

    pub fn at(sender_id: UserId, receiver_id: UserId, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id,
            receiver_id,
            text: text.into(),
            timestamp,
            is_read: false,
        }
    }

    /// True when this message travels between `a` and `b`, in either direction.
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (&self.sender_id == a && &self.receiver_id == b)
            || (&self.sender_id == b && &self.receiver_id == a)
    }
}

/// Identity of a conversation log: the signed-in user paired with one contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub user_id: UserId,
    pub contact_id: UserId,
}

impl ConversationKey {
    pub fn new(user_id: UserId, contact_id: UserId) -> Self {
        Self { user_id, contact_id }
    }

    /// Flat storage key of the persisted log.
    pub fn storage_key(&self) -> String {
        format!("conversation:{}:{}", self.user_id, self.contact_id)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.user_id, self.contact_id)
    }
}

/// Wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Display name fallback: the local part of an email address.
pub fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_owned()
}

/// Deterministic avatar image for a seed string.
pub fn avatar_url(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}
