//! Fixed demo fixtures regenerated at every session start. Never persisted.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{avatar_url, Contact, Message, UserId};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Replies the simulated remote participant picks from.
pub const CANNED_REPLIES: [&str; 5] = [
    "That's interesting!",
    "I see what you mean",
    "Thanks for letting me know",
    "I'll get back to you on that",
    "Sounds good to me",
];

/// The three roster entries every session starts with.
pub fn seed_contacts(now: i64) -> Vec<Contact> {
    let seed = |id: &str, name: &str, email: &str, avatar: &str, last: &str, ago: i64, unread: u32, online: bool| Contact {
        id: UserId::from(id),
        name: name.to_owned(),
        email: email.to_owned(),
        avatar: Some(avatar_url(avatar)),
        last_message: Some(last.to_owned()),
        last_message_time: Some(now - ago),
        unread_count: unread,
        is_online: online,
        is_blocked: None,
    };

    vec![
        seed(
            "usr_123456789",
            "Alex Johnson",
            "alex@example.com",
            "Alex",
            "Hey, how's it going?",
            HOUR_MS,
            1,
            true,
        ),
        seed(
            "usr_987654321",
            "Taylor Smith",
            "taylor@example.com",
            "Taylor",
            "Can we schedule a meeting tomorrow?",
            24 * HOUR_MS,
            0,
            false,
        ),
        seed(
            "usr_456789123",
            "Jamie Parker",
            "jamie@example.com",
            "Jamie",
            "I sent you the document.",
            48 * HOUR_MS,
            0,
            true,
        ),
    ]
}

/// Four read messages opening every conversation, the last one 57 minutes before `now`.
pub fn seed_conversation(user: &UserId, contact: &UserId, now: i64) -> Vec<Message> {
    let lines = [
        (true, "Hey there!", 60),
        (false, "Hi! How are you?", 59),
        (true, "I'm good, thanks for asking. How about you?", 58),
        (false, "Doing well! Just finishing up some work.", 57),
    ];

    lines
        .into_iter()
        .map(|(from_user, text, minutes_ago)| {
            let (sender, receiver) = if from_user {
                (user.clone(), contact.clone())
            } else {
                (contact.clone(), user.clone())
            };
            let mut message = Message::at(sender, receiver, text, now - minutes_ago * MINUTE_MS);
            message.is_read = true;
            message
        })
        .collect()
}

pub fn pick_reply<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CANNED_REPLIES.choose(rng).copied().unwrap_or(CANNED_REPLIES[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn seed_roster_is_unique_and_fixed() {
        let now = 1_700_000_000_000;
        let contacts = seed_contacts(now);
        assert_eq!(contacts.len(), 3);

        let ids: HashSet<_> = contacts.iter().map(|c| c.id.clone()).collect();
        let emails: HashSet<_> = contacts.iter().map(|c| c.email.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(emails.len(), 3);

        assert_eq!(contacts[0].unread_count, 1);
        assert_eq!(contacts[0].last_message_time, Some(now - HOUR_MS));
        assert!(!contacts[1].is_online);
        assert_eq!(contacts[2].last_message.as_deref(), Some("I sent you the document."));
    }

    #[test]
    fn seed_conversation_alternates_and_ascends() {
        let me = UserId::from("usr_me");
        let alex = UserId::from("usr_123456789");
        let now = 1_700_000_000_000;
        let log = seed_conversation(&me, &alex, now);

        assert_eq!(log.len(), 4);
        assert_eq!(log[0].sender_id, me);
        assert_eq!(log[1].sender_id, alex);
        assert!(log.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(log[3].timestamp, now - 57 * MINUTE_MS);
        assert!(log.iter().all(|m| m.is_read && m.is_between(&me, &alex)));
    }

    #[test]
    fn picked_reply_is_canned() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(CANNED_REPLIES.contains(&pick_reply(&mut rng)));
        }
    }
}
