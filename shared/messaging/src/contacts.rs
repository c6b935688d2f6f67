//! Contact roster entries and the read-side helpers the roster view needs.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{avatar_url, name_from_email, UserId};

/// Someone the signed-in user can chat with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: UserId,

    pub name: String,

    /// Unique within the roster
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Preview of the latest message sent to this contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,

    /// Unix milliseconds of `last_message`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<i64>,

    pub unread_count: u32,

    pub is_online: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,
}

impl Contact {
    /// Create a contact added by address, named after the email's local part.
    pub fn from_email(email: &str, is_online: bool) -> Self {
        Self {
            id: UserId::generate(),
            name: name_from_email(email),
            email: email.to_owned(),
            avatar: Some(avatar_url(email)),
            last_message: None,
            last_message_time: None,
            unread_count: 0,
            is_online,
            is_blocked: None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.is_blocked.unwrap_or(false)
    }

    pub fn clear_summary(&mut self) {
        self.last_message = None;
        self.last_message_time = None;
    }
}

/// Contacts whose name or email contains `query`, ignoring case.
pub fn filter_contacts<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.to_lowercase();
    contacts
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle) || c.email.to_lowercase().contains(&needle))
        .collect()
}

/// Short label for a roster row's last activity, relative to `now`.
///
/// Same day shows the time, the past week shows the weekday, anything older
/// shows month and day.
pub fn activity_label<Tz>(timestamp_ms: Option<i64>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let Some(at) = timestamp_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) else {
        return String::new();
    };
    let at = at.with_timezone(&now.timezone());

    if at.date_naive() == now.date_naive() {
        return at.format("%H:%M").to_string();
    }

    let days = now.clone().signed_duration_since(at.clone()).num_days();
    if days < 7 {
        at.format("%a").to_string()
    } else {
        at.format("%b %-d").to_string()
    }
}
