//! Wiki page model: titled, tagged markdown pages stored in SQLite.
//!
//! Pages are built from a [`PageDraft`], which validates the raw fields and
//! derives the URL slug before anything reaches the store. Reads come back
//! as [`Page`] records exposing a `/wiki/...` route and rendered HTML. The
//! [`tags`] module answers tag lookups and shared-tag similarity.
//!
//! ```no_run
//! use tagwiki::{db, repo, tags, PageDraft};
//!
//! let conn = db::open_connection()?;
//! let page = repo::create_page(&conn, &PageDraft::new("Dog", "Woof").tags(["mammal"]).validate()?)?;
//! let similar = tags::find_similar(&conn, &page)?;
//! # Ok::<(), tagwiki::WikiError>(())
//! ```

pub mod db;
pub mod models;
pub mod render;
pub mod repo;
pub mod slug;
pub mod tags;
pub mod users;
pub mod validation;

pub use db::{SyncOptions, WikiError};
pub use models::{Page, PageStatus, User};
pub use repo::{PageFilter, PageUpdate};
pub use validation::{NewPage, PageDraft};
