//! Field validation and page construction.
//!
//! Callers never hand the store a half-checked page. They fill in a
//! [`PageDraft`] with raw fields, and [`PageDraft::validate`] checks them,
//! derives the slug, and produces a [`NewPage`] ready for insertion.

use std::collections::BTreeSet;

use crate::db::WikiError;
use crate::models::PageStatus;
use crate::slug::derive_slug;

pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_CONTENT_LEN: usize = 10_000_000; // 10 MB
pub const MAX_TAG_LEN: usize = 100;
pub const MAX_TAGS_COUNT: usize = 50;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_EMAIL_LEN: usize = 320;

pub fn validate_title(title: &str) -> Result<(), WikiError> {
    if title.trim().is_empty() {
        return Err(WikiError::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(WikiError::Validation(format!(
            "Title too long (max {} characters)",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), WikiError> {
    if content.is_empty() {
        return Err(WikiError::Validation("Content must not be empty".to_string()));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(WikiError::Validation(format!(
            "Content too long (max {} bytes)",
            MAX_CONTENT_LEN
        )));
    }
    Ok(())
}

/// Checks every tag and collapses duplicates.
pub fn normalize_tags(tags: &[String]) -> Result<BTreeSet<String>, WikiError> {
    let set: BTreeSet<String> = tags.iter().cloned().collect();
    if set.len() > MAX_TAGS_COUNT {
        return Err(WikiError::Validation(format!(
            "Too many tags (max {})",
            MAX_TAGS_COUNT
        )));
    }
    for tag in &set {
        if tag.is_empty() {
            return Err(WikiError::Validation("Tags must not be empty".to_string()));
        }
        if tag.contains(char::is_whitespace) {
            return Err(WikiError::Validation(format!(
                "Tag '{}' must not contain whitespace",
                tag
            )));
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(WikiError::Validation(format!(
                "Tag '{}' too long (max {} characters)",
                tag, MAX_TAG_LEN
            )));
        }
    }
    Ok(set)
}

/// `None` means "use the default" ([`PageStatus::Open`]).
pub fn parse_status(status: Option<&str>) -> Result<PageStatus, WikiError> {
    match status {
        None => Ok(PageStatus::default()),
        Some(s) => PageStatus::from_str(s).ok_or_else(|| {
            WikiError::Validation(format!(
                "Invalid status '{}'. Valid statuses: open, closed",
                s
            ))
        }),
    }
}

pub fn validate_name(name: &str) -> Result<(), WikiError> {
    if name.trim().is_empty() {
        return Err(WikiError::Validation("Name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(WikiError::Validation(format!(
            "Name too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), WikiError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(WikiError::Validation(format!(
            "Email too long (max {} characters)",
            MAX_EMAIL_LEN
        )));
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(WikiError::Validation(format!("Invalid email '{}'", email)));
    }
    Ok(())
}

/// Raw, unchecked page fields as a caller supplies them.
#[derive(Debug, Clone, Default)]
pub struct PageDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: Option<String>,
    pub author_id: Option<String>,
}

impl PageDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    /// Validate every field and derive the slug.
    ///
    /// # Errors
    ///
    /// Returns `WikiError::Validation` for an empty title or content, an
    /// unknown status, or malformed tags.
    pub fn validate(self) -> Result<NewPage, WikiError> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        let tags = normalize_tags(&self.tags)?;
        let status = parse_status(self.status.as_deref())?;
        let url_title = derive_slug(&self.title);

        Ok(NewPage {
            title: self.title,
            url_title,
            content: self.content,
            status,
            tags,
            author_id: self.author_id,
        })
    }
}

/// A validated page that has not been persisted yet.
///
/// Only [`PageDraft::validate`] can build one, so `url_title` always matches
/// `title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    title: String,
    url_title: String,
    content: String,
    status: PageStatus,
    tags: BTreeSet<String>,
    author_id: Option<String>,
}

impl NewPage {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url_title(&self) -> &str {
        &self.url_title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> PageStatus {
        self.status
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn author_id(&self) -> Option<&str> {
        self.author_id.as_deref()
    }
}
