//! Page store: all SQL for page CRUD.
//!
//! Plain functions over an explicit `&Connection`, each returning
//! `Result<T, WikiError>`. Listing functions return pages in insertion order.

use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::db::WikiError;
use crate::models::{Page, PageStatus};
use crate::slug::derive_slug;
use crate::validation::{normalize_tags, parse_status, validate_content, validate_title, NewPage};

const PAGE_COLUMNS: &str =
    "p.id, p.title, p.url_title, p.content, p.status, p.author_id, p.created_at, p.updated_at";

/// Filters for listing pages. Unset filters are ignored.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub tag: Option<String>,
    pub status: Option<PageStatus>,
    pub author_id: Option<String>,
}

/// Partial update. `None` leaves a field unchanged; `tags` replaces the whole set.
#[derive(Debug, Clone, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

/// Map a row to a Page with an empty tag set.
/// Expects columns in `PAGE_COLUMNS` order.
fn row_to_page(row: &rusqlite::Row) -> Result<Page, rusqlite::Error> {
    let status_str: String = row.get(4)?;
    let status = PageStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(4, "status".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(Page {
        id: row.get(0)?,
        title: row.get(1)?,
        url_title: row.get(2)?,
        content: row.get(3)?,
        status,
        tags: BTreeSet::new(),
        author_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn with_tags(conn: &Connection, pages: Vec<Page>) -> Result<Vec<Page>, WikiError> {
    pages
        .into_iter()
        .map(|page| -> Result<Page, WikiError> {
            let tags = get_tags(conn, &page.id)?;
            Ok(Page { tags, ..page })
        })
        .collect()
}

/// Runs `read` inside one transaction so all of its statements see the same
/// snapshot. Already inside a transaction, `read` just joins it.
pub(crate) fn read_snapshot<T>(
    conn: &Connection,
    read: impl FnOnce(&Connection) -> Result<T, WikiError>,
) -> Result<T, WikiError> {
    if !conn.is_autocommit() {
        return read(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let result = read(&tx)?;
    tx.commit()?;
    Ok(result)
}

fn not_found(id: &str) -> WikiError {
    WikiError::NotFound(format!("Page with ID '{}' not found", id))
}

/// Inserts a validated page and its tags in one transaction.
pub fn create_page(conn: &Connection, new_page: &NewPage) -> Result<Page, WikiError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO pages (id, title, url_title, content, status, author_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id,
            new_page.title(),
            new_page.url_title(),
            new_page.content(),
            new_page.status().as_str(),
            new_page.author_id(),
            now,
            now,
        ],
    )?;

    for tag in new_page.tags() {
        tx.execute(
            "INSERT INTO tags (page_id, tag) VALUES (?1, ?2)",
            rusqlite::params![id, tag],
        )?;
    }

    tx.commit()?;

    tracing::info!(id = %id, url_title = new_page.url_title(), "Created page");

    Ok(Page {
        id,
        title: new_page.title().to_string(),
        url_title: new_page.url_title().to_string(),
        content: new_page.content().to_string(),
        status: new_page.status(),
        tags: new_page.tags().clone(),
        author_id: new_page.author_id().map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Retrieves a page by ID, tags populated.
///
/// # Errors
/// Returns `WikiError::NotFound` if no page with the given ID exists.
pub fn get_page(conn: &Connection, id: &str) -> Result<Page, WikiError> {
    read_snapshot(conn, |conn| {
        let page = conn
            .query_row(
                &format!("SELECT {PAGE_COLUMNS} FROM pages p WHERE p.id = ?1"),
                [id],
                row_to_page,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => not_found(id),
                _ => WikiError::Db(e),
            })?;

        let tags = get_tags(conn, id)?;
        Ok(Page { tags, ..page })
    })
}

/// Retrieves the earliest-created page with the given slug.
///
/// Titles are not unique, and titles differing only in punctuation or
/// spacing share a slug. A later page with a shared slug is therefore not
/// reachable through this lookup; use [`get_page`] with its ID.
pub fn get_page_by_url_title(conn: &Connection, url_title: &str) -> Result<Page, WikiError> {
    read_snapshot(conn, |conn| {
        let page = conn
            .query_row(
                &format!(
                    "SELECT {PAGE_COLUMNS} FROM pages p WHERE p.url_title = ?1 ORDER BY p.rowid LIMIT 1"
                ),
                [url_title],
                row_to_page,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    WikiError::NotFound(format!("Page '/wiki/{}' not found", url_title))
                }
                _ => WikiError::Db(e),
            })?;

        let tags = get_tags(conn, &page.id)?;
        Ok(Page { tags, ..page })
    })
}

/// Returns true if a page with this ID is stored.
pub fn page_exists(conn: &Connection, id: &str) -> Result<bool, WikiError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pages WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Lists pages matching every provided filter, in insertion order.
pub fn list_pages(conn: &Connection, filter: &PageFilter) -> Result<Vec<Page>, WikiError> {
    let mut sql = format!("SELECT {PAGE_COLUMNS} FROM pages p");

    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if filter.tag.is_some() {
        sql.push_str(" INNER JOIN tags t ON p.id = t.page_id");
    }

    if let Some(ref tag) = filter.tag {
        conditions.push("t.tag = ?");
        params.push(Box::new(tag.clone()));
    }

    if let Some(status) = filter.status {
        conditions.push("p.status = ?");
        params.push(Box::new(status.as_str()));
    }

    if let Some(ref author_id) = filter.author_id {
        conditions.push("p.author_id = ?");
        params.push(Box::new(author_id.clone()));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY p.rowid");

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    read_snapshot(conn, |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let pages = stmt
            .query_map(&param_refs[..], row_to_page)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = pages.len(), ?filter, "Listed pages");

        with_tags(conn, pages)
    })
}

/// Applies a partial update, re-deriving `url_title` when the title changes.
///
/// Every provided field goes through the same checks as [`PageDraft::validate`](crate::validation::PageDraft::validate).
///
/// # Errors
/// Returns `WikiError::Validation` for rejected fields and
/// `WikiError::NotFound` if the page doesn't exist.
pub fn update_page(conn: &Connection, id: &str, update: &PageUpdate) -> Result<Page, WikiError> {
    if let Some(ref title) = update.title {
        validate_title(title)?;
    }
    if let Some(ref content) = update.content {
        validate_content(content)?;
    }
    let tags = update.tags.as_deref().map(normalize_tags).transpose()?;
    let status = update
        .status
        .as_deref()
        .map(|s| parse_status(Some(s)))
        .transpose()?;
    let url_title = update.title.as_deref().map(derive_slug);

    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;

    let rows_affected = tx.execute(
        "UPDATE pages
         SET title = COALESCE(?1, title),
             url_title = COALESCE(?2, url_title),
             content = COALESCE(?3, content),
             status = COALESCE(?4, status),
             updated_at = ?5
         WHERE id = ?6",
        rusqlite::params![
            update.title,
            url_title,
            update.content,
            status.map(|s| s.as_str()),
            now,
            id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(not_found(id));
    }

    if let Some(ref tags) = tags {
        tx.execute("DELETE FROM tags WHERE page_id = ?1", [id])?;
        for tag in tags {
            tx.execute(
                "INSERT INTO tags (page_id, tag) VALUES (?1, ?2)",
                rusqlite::params![id, tag],
            )?;
        }
    }

    tx.commit()?;

    tracing::info!(id, "Updated page");

    get_page(conn, id)
}

/// Deletes a page; its tags go with it (ON DELETE CASCADE).
pub fn delete_page(conn: &Connection, id: &str) -> Result<(), WikiError> {
    let rows_affected = conn.execute("DELETE FROM pages WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(not_found(id));
    }

    tracing::info!(id, "Deleted page");
    Ok(())
}

/// Removes every page and tag row. Returns the number of pages removed.
pub fn truncate_pages(conn: &Connection) -> Result<usize, WikiError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM tags", [])?;
    let removed = tx.execute("DELETE FROM pages", [])?;
    tx.commit()?;

    tracing::info!(removed, "Truncated pages");
    Ok(removed)
}

/// Tags of one page, alphabetical.
pub fn get_tags(conn: &Connection, page_id: &str) -> Result<BTreeSet<String>, WikiError> {
    let mut stmt = conn.prepare("SELECT tag FROM tags WHERE page_id = ?1")?;

    let tags = stmt
        .query_map([page_id], |row| row.get(0))?
        .collect::<Result<BTreeSet<String>, _>>()?;

    Ok(tags)
}
