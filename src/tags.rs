//! Tag relevance queries.
//!
//! Two questions are answered here: which pages carry a given tag, and which
//! pages share at least one tag with a given page. Each has a store-backed
//! form and an in-memory form over an already loaded slice of pages; both
//! select and order the same way.
//!
//! Similar pages are ranked by the number of shared tags, highest first. Ties
//! keep insertion order. A page never appears among its own similar pages.

use rusqlite::Connection;

use crate::db::WikiError;
use crate::models::Page;
use crate::repo::{get_page, list_pages, page_exists, read_snapshot, PageFilter};

/// Every page whose tag set contains `tag` exactly, in input order.
pub fn pages_with_tag<'a>(pages: &'a [Page], tag: &str) -> Vec<&'a Page> {
    pages.iter().filter(|p| p.has_tag(tag)).collect()
}

/// Pages other than `page` sharing at least one tag with it.
///
/// `pages` is assumed to be in insertion order.
pub fn similar_pages<'a>(pages: &'a [Page], page: &Page) -> Vec<&'a Page> {
    let mut ranked: Vec<(usize, &Page)> = pages
        .iter()
        .filter(|candidate| candidate.id != page.id)
        .map(|candidate| (candidate.shared_tag_count(page), candidate))
        .filter(|(shared, _)| *shared > 0)
        .collect();

    // Stable: equal counts stay in insertion order.
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, p)| p).collect()
}

/// Stored pages tagged with `tag`, in insertion order.
pub fn find_by_tag(conn: &Connection, tag: &str) -> Result<Vec<Page>, WikiError> {
    list_pages(
        conn,
        &PageFilter {
            tag: Some(tag.to_string()),
            ..Default::default()
        },
    )
}

/// Stored pages sharing at least one of `page`'s tags, excluding `page`.
///
/// The overlap is computed against `page.tags` as held by the caller.
///
/// # Errors
///
/// Returns `WikiError::NotFound` if `page` is not in the store.
pub fn find_similar(conn: &Connection, page: &Page) -> Result<Vec<Page>, WikiError> {
    read_snapshot(conn, |conn| {
        if !page_exists(conn, &page.id)? {
            return Err(WikiError::NotFound(format!(
                "Page with ID '{}' not found",
                page.id
            )));
        }
        if page.tags.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; page.tags.len()].join(", ");
        let sql = format!(
            "SELECT t.page_id
             FROM tags t
             JOIN pages p ON p.id = t.page_id
             WHERE t.page_id != ? AND t.tag IN ({placeholders})
             GROUP BY t.page_id
             ORDER BY COUNT(*) DESC, MIN(p.rowid)"
        );

        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(page.tags.len() + 1);
        params.push(&page.id);
        for tag in &page.tags {
            params.push(tag);
        }

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(&params[..], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(id = %page.id, count = ids.len(), "Found similar pages");

        ids.iter().map(|id| get_page(conn, id)).collect()
    })
}

/// Every distinct tag with the number of pages carrying it, alphabetical.
pub fn tag_counts(conn: &Connection) -> Result<Vec<(String, usize)>, WikiError> {
    let mut stmt = conn.prepare("SELECT tag, COUNT(*) FROM tags GROUP BY tag ORDER BY tag")?;
    let counts = stmt
        .query_map([], |row| {
            let tag: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let count = usize::try_from(count)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(1, count))?;
            Ok((tag, count))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(counts)
}
