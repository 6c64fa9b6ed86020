//! Core data structures for the wiki.
//!
//! These are plain records as they come back from the store. The only logic
//! here is the derived, non-persisted views: a page's route and its rendered
//! HTML.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::render::markdown_to_html;

/// A persisted wiki page.
///
/// `url_title` is filled in from `title` when the page is built or updated
/// (see [`crate::validation::PageDraft`]) and is never set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub url_title: String,
    pub content: String,
    pub status: PageStatus,
    /// Labels attached to this page (stored in the `tags` table, populated on read).
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Page {
    /// Public path of the page: `/wiki/<url_title>`.
    ///
    /// Not unique: titles that differ only in punctuation or whitespace
    /// ("Same Title", "Same  Title") share a slug, and the route resolves to
    /// the oldest of them (see [`crate::repo::get_page_by_url_title`]).
    pub fn route(&self) -> String {
        format!("/wiki/{}", self.url_title)
    }

    /// Page content converted to HTML. Recomputed on every call.
    pub fn rendered_content(&self) -> String {
        markdown_to_html(&self.content)
    }

    /// Whether `tag` is one of this page's tags (exact, case-sensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Number of tags this page shares with `other`.
    pub fn shared_tag_count(&self, other: &Page) -> usize {
        self.tags.intersection(&other.tags).count()
    }
}

/// Editorial state of a page. Anything outside this set is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Open,
    Closed,
}

impl PageStatus {
    /// Parse the stored/caller form. Returns None for unrecognized values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// The string stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl User {
    pub fn route(&self) -> String {
        format!("/users/{}", self.id)
    }
}
