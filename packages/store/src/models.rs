//! # Domain models for the dashboard
//!
//! Defines the two record kinds the dashboard mirrors from the remote store,
//! their creation drafts, and the fixed presentation orderings. These types are
//! `Serialize + Deserialize` so they can cross the server/client boundary via
//! Dioxus server functions.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`Note`] | A free-form note. Title and content may both be empty on the server; the client-side [`Draft`](crate::sync::Draft) guard only blocks creating new ones with no text at all. |
//! | [`Reminder`] | A to-do with an optional due day and a completion flag. |
//! | [`NoteDraft`] / [`ReminderDraft`] | In-progress creation forms, empty by default. |
//! | [`ReminderPatch`] | The field subset an update may change on a reminder. |
//!
//! `id` and `created_at` are assigned by the remote store and never by the
//! client; rows constructed locally exist only inside test backends.
//!
//! ## Ordering
//!
//! Presentation order is a property of the fetch, not of the cache, so the
//! comparators live here where every backend can share them:
//! [`newest_first`] for notes and [`agenda_order`] for reminders.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::Draft;

/// A free-form note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Server-assigned identifier.
    pub id: String,
    pub title: String,
    pub content: String,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// A reminder with completion state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Server-assigned identifier.
    pub id: String,
    pub title: String,
    /// Day the reminder is due, if any. No time component.
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Patch that flips the completion flag relative to the value this cached
    /// row holds right now.
    pub fn toggle_completion(&self) -> ReminderPatch {
        ReminderPatch {
            is_completed: !self.is_completed,
        }
    }
}

/// Creation form for a note.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

/// Creation form for a reminder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub title: String,
    pub due_date: Option<NaiveDate>,
}

/// Field subset accepted when updating a reminder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPatch {
    pub is_completed: bool,
}

impl Draft for NoteDraft {
    /// A note needs text in at least one of title and content.
    fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty() || !self.content.trim().is_empty()
    }
}

impl Draft for ReminderDraft {
    fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Notes are presented newest-created-first.
pub fn newest_first(a: &Note, b: &Note) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

/// Reminders are presented incomplete-before-complete and soonest-due-first
/// within each group. Rows without a due date sort after dated ones in their
/// group.
pub fn agenda_order(a: &Reminder, b: &Reminder) -> Ordering {
    a.is_completed
        .cmp(&b.is_completed)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
