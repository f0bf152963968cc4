use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{self, Note, NoteDraft, Reminder, ReminderDraft, ReminderPatch};
use crate::sync::{ChangeEvent, ChangeFeed, ChangeKind, Collection, RemoteError};

/// In-memory remote store for testing and demos.
///
/// Behaves like the hosted backend from the synchronizer's point of view:
/// it assigns identifiers and creation timestamps on insert, returns fetches
/// in the fixed presentation order, and fans a change event out to every
/// subscriber after each mutation.
#[derive(Clone)]
pub struct MemoryBackend {
    notes: Arc<Mutex<Vec<Note>>>,
    reminders: Arc<Mutex<Vec<Reminder>>>,
    notes_tx: broadcast::Sender<ChangeEvent>,
    reminders_tx: broadcast::Sender<ChangeEvent>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (notes_tx, _) = broadcast::channel(64);
        let (reminders_tx, _) = broadcast::channel(64);
        Self {
            notes: Arc::default(),
            reminders: Arc::default(),
            notes_tx,
            reminders_tx,
        }
    }

    /// Handle implementing [`Collection`] over the notes table.
    pub fn notes(&self) -> MemoryNotes {
        MemoryNotes {
            backend: self.clone(),
        }
    }

    /// Handle implementing [`Collection`] over the reminders table.
    pub fn reminders(&self) -> MemoryReminders {
        MemoryReminders {
            backend: self.clone(),
        }
    }

    /// Insert a fully-formed note without emitting a change event. Fixture
    /// helper: lets tests pick identifiers and timestamps.
    pub fn seed_note(&self, note: Note) {
        self.notes.lock().unwrap().push(note);
    }

    /// Insert a fully-formed reminder without emitting a change event.
    pub fn seed_reminder(&self, reminder: Reminder) {
        self.reminders.lock().unwrap().push(reminder);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Notes table of a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryNotes {
    backend: MemoryBackend,
}

impl Collection for MemoryNotes {
    type Item = Note;
    type Draft = NoteDraft;
    type Patch = ();

    async fn fetch_all(&self) -> Result<Vec<Note>, RemoteError> {
        let mut rows = self.backend.notes.lock().unwrap().clone();
        rows.sort_by(models::newest_first);
        Ok(rows)
    }

    async fn insert(&self, draft: NoteDraft) -> Result<Note, RemoteError> {
        let row = Note {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            content: draft.content,
            created_at: Utc::now(),
        };
        self.backend.notes.lock().unwrap().push(row.clone());
        let _ = self.backend.notes_tx.send(ChangeEvent {
            kind: ChangeKind::Insert,
        });
        Ok(row)
    }

    async fn update(&self, id: &str, _patch: ()) -> Result<Note, RemoteError> {
        Err(RemoteError(format!("notes have no update operation: {id}")))
    }

    async fn remove(&self, id: &str) -> Result<(), RemoteError> {
        let mut rows = self.backend.notes.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| n.id != id);
        if rows.len() != before {
            let _ = self.backend.notes_tx.send(ChangeEvent {
                kind: ChangeKind::Delete,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> ChangeFeed {
        ChangeFeed::new(self.backend.notes_tx.subscribe())
    }
}

/// Reminders table of a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryReminders {
    backend: MemoryBackend,
}

impl Collection for MemoryReminders {
    type Item = Reminder;
    type Draft = ReminderDraft;
    type Patch = ReminderPatch;

    async fn fetch_all(&self) -> Result<Vec<Reminder>, RemoteError> {
        let mut rows = self.backend.reminders.lock().unwrap().clone();
        rows.sort_by(models::agenda_order);
        Ok(rows)
    }

    async fn insert(&self, draft: ReminderDraft) -> Result<Reminder, RemoteError> {
        let row = Reminder {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            due_date: draft.due_date,
            is_completed: false,
            created_at: Utc::now(),
        };
        self.backend.reminders.lock().unwrap().push(row.clone());
        let _ = self.backend.reminders_tx.send(ChangeEvent {
            kind: ChangeKind::Insert,
        });
        Ok(row)
    }

    async fn update(&self, id: &str, patch: ReminderPatch) -> Result<Reminder, RemoteError> {
        let updated = {
            let mut rows = self.backend.reminders.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RemoteError(format!("no such row: {id}")))?;
            row.is_completed = patch.is_completed;
            row.clone()
        };
        let _ = self.backend.reminders_tx.send(ChangeEvent {
            kind: ChangeKind::Update,
        });
        Ok(updated)
    }

    async fn remove(&self, id: &str) -> Result<(), RemoteError> {
        let mut rows = self.backend.reminders.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() != before {
            let _ = self.backend.reminders_tx.send(ChangeEvent {
                kind: ChangeKind::Delete,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> ChangeFeed {
        ChangeFeed::new(self.backend.reminders_tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::sync::Synchronizer;

    fn note(id: &str, title: &str, secs: i64) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: String::new(),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn reminder(id: &str, due: Option<(i32, u32, u32)>, is_completed: bool) -> Reminder {
        Reminder {
            id: id.to_string(),
            title: id.to_string(),
            due_date: due.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            is_completed,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn notes_fetch_newest_first() {
        let backend = MemoryBackend::new();
        backend.seed_note(note("beta", "Beta", 100));
        backend.seed_note(note("alpha", "Alpha", 200));

        let rows = backend.notes().fetch_all().await.unwrap();
        let titles: Vec<&str> = rows.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "Beta"]);

        for pair in rows.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn reminders_fetch_incomplete_first_then_soonest_due() {
        let backend = MemoryBackend::new();
        backend.seed_reminder(reminder("done-early", Some((2024, 1, 1)), true));
        backend.seed_reminder(reminder("open-late", Some((2024, 3, 1)), false));
        backend.seed_reminder(reminder("open-undated", None, false));
        backend.seed_reminder(reminder("open-early", Some((2024, 1, 1)), false));
        backend.seed_reminder(reminder("done-undated", None, true));

        let rows = backend.reminders().fetch_all().await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "open-early",
                "open-late",
                "open-undated",
                "done-early",
                "done-undated"
            ]
        );
    }

    #[tokio::test]
    async fn undated_reminder_sorts_after_a_dated_one() {
        let backend = MemoryBackend::new();
        backend.seed_reminder(reminder("undated", None, false));
        backend.seed_reminder(reminder("dated", Some((2024, 1, 1)), false));

        let rows = backend.reminders().fetch_all().await.unwrap();
        assert_eq!(rows[0].id, "dated");
        assert_eq!(rows[1].id, "undated");
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let backend = MemoryBackend::new();
        let created = backend
            .notes()
            .insert(NoteDraft {
                title: "X".to_string(),
                content: String::new(),
            })
            .await
            .unwrap();

        assert!(!created.id.is_empty());
        let rows = backend.notes().fetch_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, created.id);
    }

    #[tokio::test]
    async fn mutations_fan_out_change_events() {
        let backend = MemoryBackend::new();
        let reminders = backend.reminders();
        let mut feed = reminders.subscribe();

        let created = reminders
            .insert(ReminderDraft {
                title: "Call the bank".to_string(),
                due_date: None,
            })
            .await
            .unwrap();
        assert_eq!(feed.next().await.unwrap().kind, ChangeKind::Insert);

        reminders
            .update(&created.id, created.toggle_completion())
            .await
            .unwrap();
        assert_eq!(feed.next().await.unwrap().kind, ChangeKind::Update);

        reminders.remove(&created.id).await.unwrap();
        assert_eq!(feed.next().await.unwrap().kind, ChangeKind::Delete);

        // Deleting a row that is already gone is not a change.
        reminders.remove(&created.id).await.unwrap();
        assert!(backend.reminders().fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn synchronizer_mirrors_a_toggled_reminder() {
        let backend = MemoryBackend::new();
        let sync = Synchronizer::new(backend.reminders());
        sync.update_draft(|d| d.title = "Water plants".to_string());
        sync.create().await;
        sync.reload().await;

        let cached = sync.snapshot().items[0].clone();
        sync.update(&cached.id, cached.toggle_completion()).await;
        sync.reload().await;

        assert!(sync.snapshot().items[0].is_completed);
    }
}
