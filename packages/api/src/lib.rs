//! # API crate — shared fullstack server functions for Daydesk
//!
//! Defines every Dioxus server function the web frontend calls, along with the
//! supporting modules they depend on.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | `server` | Password hashing (Argon2id) and the session key |
//! | [`db`] | `server` | PostgreSQL connection pool (lazy `OnceCell` singleton) |
//! | [`feed`] | shared types, log is `server` | Change log behind the realtime feed |
//! | [`models`] | — | Database rows and their client-safe projections |
//!
//! ## Server functions exposed here
//!
//! Every public `async fn` in this file is a Dioxus server function, annotated
//! with `#[get(...)]` or `#[post(...)]` and compiled twice: once with full
//! server logic (behind `#[cfg(feature = "server")]`) and once as a thin
//! client stub.
//!
//! - **Authentication**: `get_current_user`, `register`, `login_password`, `logout`
//! - **Notes**: `list_notes`, `create_note`, `delete_note`
//! - **Reminders**: `list_reminders`, `create_reminder`, `set_reminder_completed`, `delete_reminder`
//! - **Realtime**: `poll_changes`
//!
//! All of the data endpoints require an authenticated session; mutations
//! record a [`feed::ChangeNotice`] so every connected dashboard reconciles.

use dioxus::prelude::*;

pub mod auth;
pub mod db;
pub mod feed;
pub mod models;

pub use feed::{ChangeNotice, CollectionKind};
pub use models::UserInfo;
pub use store::{Note, NoteDraft, Reminder, ReminderDraft, ReminderPatch};

#[cfg(feature = "server")]
use feed::ChangeLog;
#[cfg(feature = "server")]
use models::{NoteRow, ReminderRow};
#[cfg(feature = "server")]
use store::ChangeKind;

/// Resolve the session to an authenticated user id.
#[cfg(feature = "server")]
async fn require_user(session: &tower_sessions::Session) -> Result<uuid::Uuid, ServerFnError> {
    let user_id: Option<String> = session
        .get(auth::SESSION_USER_ID_KEY)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let Some(user_id) = user_id else {
        return Err(ServerFnError::new("Not authenticated"));
    };

    uuid::Uuid::parse_str(&user_id).map_err(|e| ServerFnError::new(e.to_string()))
}

/// Get the current authenticated user from the session.
#[cfg(feature = "server")]
#[get("/api/auth/me", session: tower_sessions::Session)]
pub async fn get_current_user() -> Result<Option<UserInfo>, ServerFnError> {
    use crate::db::get_pool;
    use crate::models::User;

    let user_id: Option<String> = session
        .get(auth::SESSION_USER_ID_KEY)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let user_uuid = uuid::Uuid::parse_str(&user_id)
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_uuid)
        .fetch_optional(pool)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    Ok(user.map(|u| u.to_info()))
}

#[cfg(not(feature = "server"))]
#[get("/api/auth/me")]
pub async fn get_current_user() -> Result<Option<UserInfo>, ServerFnError> {
    Ok(None)
}

/// Register a new user with email and password.
#[cfg(feature = "server")]
#[post("/api/auth/register", session: tower_sessions::Session)]
pub async fn register(
    email: String,
    password: String,
    name: String,
) -> Result<UserInfo, ServerFnError> {
    use crate::db::get_pool;

    let email = email.trim().to_lowercase();
    let name = name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(ServerFnError::new("Invalid email address"));
    }
    if password.len() < 8 {
        return Err(ServerFnError::new(
            "Password must be at least 8 characters",
        ));
    }

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let existing: Option<(i64,)> = sqlx::query_as("SELECT 1 as n FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    if existing.is_some() {
        return Err(ServerFnError::new("An account with this email already exists"));
    }

    let password_hash = auth::hash_password(&password)
        .map_err(|e| ServerFnError::new(e))?;

    let name = if name.is_empty() { None } else { Some(name) };

    let user: models::User = sqlx::query_as(
        "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| ServerFnError::new(e.to_string()))?;

    session
        .insert(auth::SESSION_USER_ID_KEY, user.id.to_string())
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    Ok(user.to_info())
}

#[cfg(not(feature = "server"))]
#[post("/api/auth/register")]
pub async fn register(
    email: String,
    password: String,
    name: String,
) -> Result<UserInfo, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Log in with email and password.
#[cfg(feature = "server")]
#[post("/api/auth/login", session: tower_sessions::Session)]
pub async fn login_password(email: String, password: String) -> Result<UserInfo, ServerFnError> {
    use crate::db::get_pool;

    let email = email.trim().to_lowercase();

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let user: Option<models::User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let Some(user) = user else {
        return Err(ServerFnError::new("Invalid email or password"));
    };

    let valid = auth::verify_password(&password, &user.password_hash)
        .map_err(|e| ServerFnError::new(e))?;

    if !valid {
        return Err(ServerFnError::new("Invalid email or password"));
    }

    session
        .insert(auth::SESSION_USER_ID_KEY, user.id.to_string())
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    Ok(user.to_info())
}

#[cfg(not(feature = "server"))]
#[post("/api/auth/login")]
pub async fn login_password(email: String, password: String) -> Result<UserInfo, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Log out the current user by clearing the session.
#[cfg(feature = "server")]
#[post("/api/auth/logout", session: tower_sessions::Session)]
pub async fn logout() -> Result<(), ServerFnError> {
    session
        .flush()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    Ok(())
}

#[cfg(not(feature = "server"))]
#[post("/api/auth/logout")]
pub async fn logout() -> Result<(), ServerFnError> {
    Ok(())
}

/// All notes, newest first.
#[cfg(feature = "server")]
#[get("/api/notes", session: tower_sessions::Session)]
pub async fn list_notes() -> Result<Vec<Note>, ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let rows: Vec<NoteRow> = sqlx::query_as("SELECT * FROM notes ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    Ok(rows.into_iter().map(NoteRow::into_note).collect())
}

#[cfg(not(feature = "server"))]
#[get("/api/notes")]
pub async fn list_notes() -> Result<Vec<Note>, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Insert one note. The database assigns the id and creation timestamp.
#[cfg(feature = "server")]
#[post("/api/notes", session: tower_sessions::Session)]
pub async fn create_note(draft: NoteDraft) -> Result<Note, ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let row: NoteRow =
        sqlx::query_as("INSERT INTO notes (title, content) VALUES ($1, $2) RETURNING *")
            .bind(&draft.title)
            .bind(&draft.content)
            .fetch_one(pool)
            .await
            .map_err(|e| ServerFnError::new(e.to_string()))?;

    ChangeLog::global().record(CollectionKind::Notes, ChangeKind::Insert);

    Ok(row.into_note())
}

#[cfg(not(feature = "server"))]
#[post("/api/notes")]
pub async fn create_note(draft: NoteDraft) -> Result<Note, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Delete one note by id.
#[cfg(feature = "server")]
#[post("/api/notes/delete", session: tower_sessions::Session)]
pub async fn delete_note(id: String) -> Result<(), ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let note_id = uuid::Uuid::parse_str(&id).map_err(|e| ServerFnError::new(e.to_string()))?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let result = sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(note_id)
        .execute(pool)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    if result.rows_affected() > 0 {
        ChangeLog::global().record(CollectionKind::Notes, ChangeKind::Delete);
    }

    Ok(())
}

#[cfg(not(feature = "server"))]
#[post("/api/notes/delete")]
pub async fn delete_note(id: String) -> Result<(), ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// All reminders: incomplete before complete, soonest due first, undated rows
/// last within their group.
#[cfg(feature = "server")]
#[get("/api/reminders", session: tower_sessions::Session)]
pub async fn list_reminders() -> Result<Vec<Reminder>, ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let rows: Vec<ReminderRow> = sqlx::query_as(
        "SELECT * FROM reminders ORDER BY is_completed ASC, due_date ASC NULLS LAST",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| ServerFnError::new(e.to_string()))?;

    Ok(rows.into_iter().map(ReminderRow::into_reminder).collect())
}

#[cfg(not(feature = "server"))]
#[get("/api/reminders")]
pub async fn list_reminders() -> Result<Vec<Reminder>, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Insert one reminder. `is_completed` defaults to false in the schema.
#[cfg(feature = "server")]
#[post("/api/reminders", session: tower_sessions::Session)]
pub async fn create_reminder(draft: ReminderDraft) -> Result<Reminder, ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let row: ReminderRow =
        sqlx::query_as("INSERT INTO reminders (title, due_date) VALUES ($1, $2) RETURNING *")
            .bind(&draft.title)
            .bind(draft.due_date)
            .fetch_one(pool)
            .await
            .map_err(|e| ServerFnError::new(e.to_string()))?;

    ChangeLog::global().record(CollectionKind::Reminders, ChangeKind::Insert);

    Ok(row.into_reminder())
}

#[cfg(not(feature = "server"))]
#[post("/api/reminders")]
pub async fn create_reminder(draft: ReminderDraft) -> Result<Reminder, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Set the completion flag on one reminder.
#[cfg(feature = "server")]
#[post("/api/reminders/complete", session: tower_sessions::Session)]
pub async fn set_reminder_completed(
    id: String,
    patch: ReminderPatch,
) -> Result<Reminder, ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let reminder_id = uuid::Uuid::parse_str(&id).map_err(|e| ServerFnError::new(e.to_string()))?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let row: ReminderRow =
        sqlx::query_as("UPDATE reminders SET is_completed = $2 WHERE id = $1 RETURNING *")
            .bind(reminder_id)
            .bind(patch.is_completed)
            .fetch_one(pool)
            .await
            .map_err(|e| ServerFnError::new(e.to_string()))?;

    ChangeLog::global().record(CollectionKind::Reminders, ChangeKind::Update);

    Ok(row.into_reminder())
}

#[cfg(not(feature = "server"))]
#[post("/api/reminders/complete")]
pub async fn set_reminder_completed(
    id: String,
    patch: ReminderPatch,
) -> Result<Reminder, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Delete one reminder by id.
#[cfg(feature = "server")]
#[post("/api/reminders/delete", session: tower_sessions::Session)]
pub async fn delete_reminder(id: String) -> Result<(), ServerFnError> {
    use crate::db::get_pool;

    require_user(&session).await?;

    let reminder_id = uuid::Uuid::parse_str(&id).map_err(|e| ServerFnError::new(e.to_string()))?;

    let pool = get_pool()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
        .bind(reminder_id)
        .execute(pool)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    if result.rows_affected() > 0 {
        ChangeLog::global().record(CollectionKind::Reminders, ChangeKind::Delete);
    }

    Ok(())
}

#[cfg(not(feature = "server"))]
#[post("/api/reminders/delete")]
pub async fn delete_reminder(id: String) -> Result<(), ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Long-poll for change notices past the given cursor.
///
/// Returns within the server's poll window either way; an empty batch is a
/// keep-alive and the client re-polls with the same cursor.
#[cfg(feature = "server")]
#[get("/api/changes", session: tower_sessions::Session)]
pub async fn poll_changes(cursor: u64) -> Result<Vec<ChangeNotice>, ServerFnError> {
    require_user(&session).await?;

    Ok(ChangeLog::global().poll(cursor).await)
}

#[cfg(not(feature = "server"))]
#[get("/api/changes")]
pub async fn poll_changes(cursor: u64) -> Result<Vec<ChangeNotice>, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}
