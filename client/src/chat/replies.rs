//! Deferred delivery tasks keyed by conversation.

use parley_messaging::ConversationKey;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Holds the pending deferred tasks so they can be aborted per conversation.
#[derive(Default)]
pub struct ReplyScheduler {
    pending: Mutex<HashMap<ConversationKey, Vec<JoinHandle<()>>>>,
}

impl ReplyScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `deliver` after `delay` on the current runtime.
    pub fn schedule<F>(&self, key: ConversationKey, delay: Duration, deliver: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            deliver.await;
        });

        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        let handles = pending.entry(key.clone()).or_default();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        debug!(conversation = %key, delay_ms = delay.as_millis() as u64, "reply scheduled");
    }

    /// Abort everything pending for `key`. Returns how many tasks were still running.
    pub fn cancel(&self, key: &ConversationKey) -> usize {
        let handles = match self.pending.lock() {
            Ok(mut pending) => pending.remove(key).unwrap_or_default(),
            Err(_) => return 0,
        };
        let aborted = abort_all(handles);
        if aborted > 0 {
            debug!(conversation = %key, aborted, "pending replies cancelled");
        }
        aborted
    }

    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = match self.pending.lock() {
            Ok(mut pending) => pending.drain().flat_map(|(_, handles)| handles).collect(),
            Err(_) => return 0,
        };
        abort_all(drained)
    }

    /// Number of tasks for `key` that have not finished yet.
    pub fn pending(&self, key: &ConversationKey) -> usize {
        self.pending
            .lock()
            .map(|pending| {
                pending
                    .get(key)
                    .map(|handles| handles.iter().filter(|h| !h.is_finished()).count())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

fn abort_all(handles: Vec<JoinHandle<()>>) -> usize {
    let mut aborted = 0;
    for handle in handles {
        if !handle.is_finished() {
            handle.abort();
            aborted += 1;
        }
    }
    aborted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(contact: &str) -> ConversationKey {
        ConversationKey::new("usr_me".into(), contact.into())
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let scheduler = ReplyScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(key("a"), Duration::from_millis(2000), counting(&fired));
        assert_eq!(scheduler.pending(&key("a")), 1);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(&key("a")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_scoped_to_conversation() {
        let scheduler = ReplyScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(key("a"), Duration::from_millis(2000), counting(&fired));
        scheduler.schedule(key("a"), Duration::from_millis(2000), counting(&fired));
        scheduler.schedule(key("b"), Duration::from_millis(2000), counting(&fired));

        assert_eq!(scheduler.cancel(&key("a")), 2);
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.cancel(&key("a")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_everything() {
        let scheduler = ReplyScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(key("a"), Duration::from_millis(10), counting(&fired));
        scheduler.schedule(key("b"), Duration::from_millis(10), counting(&fired));
        assert_eq!(scheduler.cancel_all(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
