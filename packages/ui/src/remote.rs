//! Remote collections backed by the `api` server functions.
//!
//! The server exposes plain CRUD plus a long-polled change feed keyed by a
//! monotone sequence number. [`ChangeFeedPump`] owns the client-side cursor
//! and fans incoming notices out to one broadcast channel per collection;
//! [`RemoteNotes`] and [`RemoteReminders`] implement [`store::Collection`]
//! over the server functions and hand out subscriptions to those channels.
//!
//! The pump never inspects notice payloads beyond routing them: the
//! synchronizers reconcile by refetching, so delivery is all that matters.

use std::time::Duration;

use api::CollectionKind;
use dioxus::prelude::ServerFnError;
use store::{
    ChangeEvent, ChangeFeed, Collection, Note, NoteDraft, Reminder, ReminderDraft, ReminderPatch,
    RemoteError,
};
use tokio::sync::broadcast;

/// How long to back off after a failed poll before trying again.
const POLL_RETRY_PAUSE: Duration = Duration::from_secs(5);

fn remote_error(err: ServerFnError) -> RemoteError {
    RemoteError(err.to_string())
}

/// Client half of the dashboard's change feed, plus the collection handles.
///
/// One pump serves both collections; run it once for the lifetime of the
/// dashboard and hand [`notes`](ChangeFeedPump::notes) /
/// [`reminders`](ChangeFeedPump::reminders) to the synchronizers.
#[derive(Clone)]
pub struct ChangeFeedPump {
    notes_tx: broadcast::Sender<ChangeEvent>,
    reminders_tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeedPump {
    pub fn new() -> Self {
        let (notes_tx, _) = broadcast::channel(64);
        let (reminders_tx, _) = broadcast::channel(64);
        Self {
            notes_tx,
            reminders_tx,
        }
    }

    /// Handle for the notes collection.
    pub fn notes(&self) -> RemoteNotes {
        RemoteNotes {
            changes: self.notes_tx.clone(),
        }
    }

    /// Handle for the reminders collection.
    pub fn reminders(&self) -> RemoteReminders {
        RemoteReminders {
            changes: self.reminders_tx.clone(),
        }
    }

    /// Long-poll the server and fan notices out to the per-collection
    /// channels. Runs until the owning scope is dropped; poll failures are
    /// logged and retried after a pause.
    pub async fn run(&self) {
        let mut cursor = 0u64;
        loop {
            match api::poll_changes(cursor).await {
                Ok(notices) => {
                    for notice in notices {
                        cursor = cursor.max(notice.seq);
                        let event = ChangeEvent { kind: notice.kind };
                        let _ = match notice.collection {
                            CollectionKind::Notes => self.notes_tx.send(event),
                            CollectionKind::Reminders => self.reminders_tx.send(event),
                        };
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to poll change feed: {}", e);
                    sleep(POLL_RETRY_PAUSE).await;
                }
            }
        }
    }
}

impl Default for ChangeFeedPump {
    fn default() -> Self {
        Self::new()
    }
}

async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}

/// The `notes` collection as served by the backend.
#[derive(Clone)]
pub struct RemoteNotes {
    changes: broadcast::Sender<ChangeEvent>,
}

impl Collection for RemoteNotes {
    type Item = Note;
    type Draft = NoteDraft;
    type Patch = ();

    async fn fetch_all(&self) -> Result<Vec<Note>, RemoteError> {
        api::list_notes().await.map_err(remote_error)
    }

    async fn insert(&self, draft: NoteDraft) -> Result<Note, RemoteError> {
        api::create_note(draft).await.map_err(remote_error)
    }

    async fn update(&self, id: &str, _patch: ()) -> Result<Note, RemoteError> {
        Err(RemoteError(format!("notes have no update operation: {id}")))
    }

    async fn remove(&self, id: &str) -> Result<(), RemoteError> {
        api::delete_note(id.to_string()).await.map_err(remote_error)
    }

    fn subscribe(&self) -> ChangeFeed {
        ChangeFeed::new(self.changes.subscribe())
    }
}

/// The `reminders` collection as served by the backend.
#[derive(Clone)]
pub struct RemoteReminders {
    changes: broadcast::Sender<ChangeEvent>,
}

impl Collection for RemoteReminders {
    type Item = Reminder;
    type Draft = ReminderDraft;
    type Patch = ReminderPatch;

    async fn fetch_all(&self) -> Result<Vec<Reminder>, RemoteError> {
        api::list_reminders().await.map_err(remote_error)
    }

    async fn insert(&self, draft: ReminderDraft) -> Result<Reminder, RemoteError> {
        api::create_reminder(draft).await.map_err(remote_error)
    }

    async fn update(&self, id: &str, patch: ReminderPatch) -> Result<Reminder, RemoteError> {
        api::set_reminder_completed(id.to_string(), patch)
            .await
            .map_err(remote_error)
    }

    async fn remove(&self, id: &str) -> Result<(), RemoteError> {
        api::delete_reminder(id.to_string())
            .await
            .map_err(remote_error)
    }

    fn subscribe(&self) -> ChangeFeed {
        ChangeFeed::new(self.changes.subscribe())
    }
}
