//! Title to URL slug derivation.
//!
//! Slugs keep the title's case and word boundaries: whitespace runs become a
//! single `_`, and anything that is not an ASCII letter, digit, `_` or `-` is
//! dropped.

use std::fmt::Write as _;

/// Prefix used when a title contains no word characters at all.
const FALLBACK_PREFIX: &str = "page_";

/// Derive the `url_title` for a page title.
///
/// Deterministic and pure. The result is always a single non-empty path
/// segment: when stripping leaves nothing (e.g. `"???"`), the title's UTF-8
/// bytes are hex-encoded behind a `page_` prefix instead.
pub fn derive_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.trim().chars() {
        if c.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        }
    }

    if slug.is_empty() {
        tracing::warn!(title, "Title has no word characters, using hex slug");
        return hex_slug(title);
    }

    slug
}

fn hex_slug(title: &str) -> String {
    let mut slug = String::with_capacity(FALLBACK_PREFIX.len() + title.len() * 2);
    slug.push_str(FALLBACK_PREFIX);
    for byte in title.as_bytes() {
        // Writing to a String cannot fail.
        let _ = write!(slug, "{byte:02x}");
    }
    slug
}
