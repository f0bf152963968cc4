pub mod models;
pub mod sync;

mod memory;
pub use memory::{MemoryBackend, MemoryNotes, MemoryReminders};

pub use models::{Note, NoteDraft, Reminder, ReminderDraft, ReminderPatch};
pub use sync::{
    ChangeEvent, ChangeFeed, ChangeKind, Collection, Draft, LoadPhase, RemoteError, SyncState,
    Synchronizer,
};
