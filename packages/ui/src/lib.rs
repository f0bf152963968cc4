//! This crate contains all shared UI for the workspace.

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_regular_icons::FaCircle as FaRegCircle;
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

mod auth;
pub use auth::{use_auth, AuthProvider, AuthState, LogoutButton};

mod remote;
pub use remote::{ChangeFeedPump, RemoteNotes, RemoteReminders};

mod live;
pub use live::use_collection_sync;

mod notes_panel;
pub use notes_panel::NotesPanel;

mod reminders_panel;
pub use reminders_panel::RemindersPanel;
