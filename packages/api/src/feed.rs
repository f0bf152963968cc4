//! # Change feed — the server side of dashboard realtime
//!
//! Every mutating server function records a [`ChangeNotice`] here; clients
//! long-poll [`poll_changes`](crate::poll_changes) with the highest sequence
//! number they have seen. The notices carry no row data — the dashboard
//! reconciles by refetching the affected collection, so the feed only has to
//! say *that* something changed, not *what*.
//!
//! The log is deliberately lossy: a bounded replay buffer plus a broadcast
//! wakeup. A cursor that has fallen behind the buffer still receives the
//! retained tail, which over-delivers rather than under-delivers; the feed is
//! at-least-once and an extra notice costs the client one redundant reload.

use serde::{Deserialize, Serialize};
use store::ChangeKind;

/// Identifies one of the two synchronized tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    Notes,
    Reminders,
}

/// One entry in the server's change log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Monotone position in the log; client cursors compare against it.
    pub seq: u64,
    pub collection: CollectionKind,
    pub kind: ChangeKind,
}

/// Notices retained for cursors that lag behind.
#[cfg(feature = "server")]
const REPLAY_CAPACITY: usize = 256;

/// How long a poll waits for news before returning empty-handed.
#[cfg(feature = "server")]
const POLL_WINDOW: std::time::Duration = std::time::Duration::from_secs(25);

#[cfg(feature = "server")]
struct LogState {
    next_seq: u64,
    entries: std::collections::VecDeque<ChangeNotice>,
}

/// Process-wide log of recent changes, long-polled by clients.
#[cfg(feature = "server")]
pub struct ChangeLog {
    state: std::sync::Mutex<LogState>,
    wake: tokio::sync::broadcast::Sender<()>,
}

#[cfg(feature = "server")]
impl ChangeLog {
    pub fn new() -> Self {
        let (wake, _) = tokio::sync::broadcast::channel(16);
        Self {
            state: std::sync::Mutex::new(LogState {
                next_seq: 1,
                entries: std::collections::VecDeque::new(),
            }),
            wake,
        }
    }

    /// The shared instance every server function records into.
    pub fn global() -> &'static ChangeLog {
        static LOG: std::sync::OnceLock<ChangeLog> = std::sync::OnceLock::new();
        LOG.get_or_init(ChangeLog::new)
    }

    /// Record a change and wake pending polls.
    pub fn record(&self, collection: CollectionKind, kind: ChangeKind) {
        let mut state = self.state.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push_back(ChangeNotice {
            seq,
            collection,
            kind,
        });
        if state.entries.len() > REPLAY_CAPACITY {
            state.entries.pop_front();
        }
        drop(state);
        // Zero receivers just means nobody is polling right now.
        let _ = self.wake.send(());
    }

    fn after(&self, cursor: u64) -> Vec<ChangeNotice> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|n| n.seq > cursor)
            .copied()
            .collect()
    }

    /// Return the notices newer than `cursor`, waiting up to the poll window
    /// when there are none yet. An empty result is a keep-alive: the client
    /// re-polls with the same cursor.
    pub async fn poll(&self, cursor: u64) -> Vec<ChangeNotice> {
        // Subscribe before checking so a record between the two cannot be
        // missed.
        let mut wake = self.wake.subscribe();
        let pending = self.after(cursor);
        if !pending.is_empty() {
            return pending;
        }
        let _ = tokio::time::timeout(POLL_WINDOW, wake.recv()).await;
        self.after(cursor)
    }
}

#[cfg(feature = "server")]
impl Default for ChangeLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poll_returns_notices_past_the_cursor() {
        let log = ChangeLog::new();
        log.record(CollectionKind::Notes, ChangeKind::Insert);
        log.record(CollectionKind::Reminders, ChangeKind::Delete);

        let all = log.poll(0).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].seq, 1);
        assert_eq!(all[1].collection, CollectionKind::Reminders);

        let tail = log.poll(1).await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].seq, 2);
    }

    #[tokio::test]
    async fn poll_wakes_on_a_new_record() {
        let log = ChangeLog::new();
        let (notices, _) = tokio::join!(log.poll(0), async {
            tokio::task::yield_now().await;
            log.record(CollectionKind::Notes, ChangeKind::Update);
        });
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn replay_buffer_is_bounded() {
        let log = ChangeLog::new();
        for _ in 0..(REPLAY_CAPACITY + 10) {
            log.record(CollectionKind::Notes, ChangeKind::Insert);
        }
        let replay = log.poll(0).await;
        assert_eq!(replay.len(), REPLAY_CAPACITY);
        // The oldest entries were dropped; the tail is still contiguous.
        assert_eq!(replay.first().unwrap().seq, 11);
        assert_eq!(replay.last().unwrap().seq, (REPLAY_CAPACITY + 10) as u64);
    }
}
