//! Database rows for the two synchronized tables and their projections into
//! the client-safe `store` types. Server only: the rows carry `Uuid` and
//! native timestamp columns that never cross the wire.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use store::{Note, Reminder};
use uuid::Uuid;

/// Full note row from the `notes` table.
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NoteRow {
    /// Convert to the client-safe store type.
    pub fn into_note(self) -> Note {
        Note {
            id: self.id.to_string(),
            title: self.title,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

/// Full reminder row from the `reminders` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReminderRow {
    pub id: Uuid,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl ReminderRow {
    /// Convert to the client-safe store type.
    pub fn into_reminder(self) -> Reminder {
        Reminder {
            id: self.id.to_string(),
            title: self.title,
            due_date: self.due_date,
            is_completed: self.is_completed,
            created_at: self.created_at,
        }
    }
}
