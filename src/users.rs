//! Page authors.

use rusqlite::{Connection, OptionalExtension};

use crate::db::WikiError;
use crate::models::User;
use crate::validation::{validate_email, validate_name};

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Returns the user registered under `email`, creating one if none exists.
///
/// An existing user keeps their stored name.
pub fn find_or_create_user(conn: &Connection, name: &str, email: &str) -> Result<User, WikiError> {
    validate_name(name)?;
    validate_email(email)?;

    let existing = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE email = ?1",
            [email],
            row_to_user,
        )
        .optional()?;
    if let Some(user) = existing {
        return Ok(user);
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    conn.execute(
        "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user.id, user.name, user.email, user.created_at],
    )?;

    tracing::info!(id = %user.id, "Created user");
    Ok(user)
}

pub fn get_user(conn: &Connection, id: &str) -> Result<User, WikiError> {
    conn.query_row(
        "SELECT id, name, email, created_at FROM users WHERE id = ?1",
        [id],
        row_to_user,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            WikiError::NotFound(format!("User with ID '{}' not found", id))
        }
        _ => WikiError::Db(e),
    })
}
