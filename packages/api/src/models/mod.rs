//! Data models for the application.

#[cfg(feature = "server")]
mod row;
mod user;

#[cfg(feature = "server")]
pub use row::{NoteRow, ReminderRow};
#[cfg(feature = "server")]
pub use user::User;
pub use user::UserInfo;
