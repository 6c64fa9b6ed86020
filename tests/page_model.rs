//! End-to-end behaviour of the page model against an on-disk database.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use rusqlite::Connection;
use tagwiki::db::{open_connection_at, sync};
use tagwiki::repo::{create_page, delete_page, list_pages};
use tagwiki::tags::{find_by_tag, find_similar};
use tagwiki::{Page, PageDraft, PageFilter, PageStatus, SyncOptions, WikiError};

/// Fresh, empty database in its own directory, dropped with the test.
struct TestDb {
    conn: Connection,
    path: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestDb {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("wiki.db");
        let mut conn = open_connection_at(&path).expect("Failed to open db");
        sync(&mut conn, SyncOptions { force: true }).expect("Failed to sync schema");
        Self { conn, path, _dir: dir }
    }

    fn create(&self, title: &str, content: &str, tags: &[&str]) -> Page {
        let draft = PageDraft::new(title, content).tags(tags.iter().copied());
        create_page(&self.conn, &draft.validate().expect("valid draft")).expect("Failed to create page")
    }
}

fn titles(pages: &[Page]) -> Vec<&str> {
    pages.iter().map(|p| p.title.as_str()).collect()
}

#[test]
fn route_is_wiki_prefix_plus_url_title() {
    let db = TestDb::new();
    let page = db.create("some title", "x", &[]);
    assert_eq!(page.url_title, "some_title");
    assert_eq!(page.route(), "/wiki/some_title");
}

#[test]
fn rendered_content_is_html() {
    let db = TestDb::new();
    let page = db.create("greeting", "# Hello", &[]);
    assert_eq!(page.rendered_content().trim(), r#"<h1 id="hello">Hello</h1>"#);
}

#[test]
fn find_by_tag_returns_only_tagged_pages() {
    let db = TestDb::new();
    db.create("foo", "bar", &["foo", "bar"]);

    let pages = find_by_tag(&db.conn, "foo").unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].title, "foo");
    assert_ne!(pages[0].title, "bar");

    assert_eq!(find_by_tag(&db.conn, "foo").unwrap(), pages);
}

#[test]
fn find_similar_returns_other_pages_sharing_a_tag() {
    let db = TestDb::new();
    let dog = db.create("dog", "dog", &["mammal"]);
    db.create("cat", "cat", &["mammal"]);
    db.create("lizard", "lizard", &["reptile"]);

    let similar = find_similar(&db.conn, &dog).unwrap();
    assert_eq!(titles(&similar), vec!["cat"]);
    assert_eq!(find_similar(&db.conn, &dog).unwrap(), similar);
}

#[test]
fn untagged_page_has_no_similar_pages() {
    let db = TestDb::new();
    for i in 0..5 {
        db.create(&format!("page {i}"), "x", &["common"]);
    }
    let loner = db.create("loner", "x", &[]);

    assert!(find_similar(&db.conn, &loner).unwrap().is_empty());
}

#[test]
fn invalid_fields_never_reach_the_store() {
    let db = TestDb::new();

    let bad = [
        PageDraft::new("", "content"),
        PageDraft::new("title", ""),
        PageDraft::new("title", "content").status("pending"),
    ];
    for draft in bad {
        assert!(matches!(draft.validate(), Err(WikiError::Validation(_))));
    }

    let page = db.create("ok", "content", &[]);
    assert_eq!(page.status, PageStatus::Open);
    assert_eq!(list_pages(&db.conn, &PageFilter::default()).unwrap().len(), 1);
}

#[test]
fn forced_sync_resets_the_store() {
    let mut db = TestDb::new();
    db.create("a", "a", &["t"]);

    sync(&mut db.conn, SyncOptions { force: true }).unwrap();

    assert!(list_pages(&db.conn, &PageFilter::default()).unwrap().is_empty());
    assert!(find_by_tag(&db.conn, "t").unwrap().is_empty());
}

#[test]
fn queries_see_one_snapshot_while_another_connection_writes() {
    let db = TestDb::new();
    let dog = db.create("dog", "dog", &["mammal"]);
    db.create("cat", "cat", &["mammal"]);

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let stop = Arc::clone(&stop);
        let path = db.path.clone();
        thread::spawn(move || -> Result<usize, WikiError> {
            let conn = open_connection_at(&path)?;
            let mut rounds = 0;
            while !stop.load(Ordering::Relaxed) {
                let draft = PageDraft::new(format!("pup {rounds}"), "pup").tags(["mammal"]);
                let pup = create_page(&conn, &draft.validate()?)?;
                delete_page(&conn, &pup.id)?;
                rounds += 1;
            }
            Ok(rounds)
        })
    };

    let mut failures = Vec::new();
    for _ in 0..500 {
        match find_similar(&db.conn, &dog) {
            Ok(similar) => {
                assert!(similar.iter().all(|p| p.id != dog.id && p.has_tag("mammal")));
                assert!(similar.iter().any(|p| p.title == "cat"));
            }
            Err(e) => failures.push(e.to_string()),
        }
        match find_by_tag(&db.conn, "mammal") {
            Ok(pages) => assert!(pages.iter().all(|p| p.has_tag("mammal"))),
            Err(e) => failures.push(e.to_string()),
        }
    }

    stop.store(true, Ordering::Relaxed);
    writer.join().expect("writer thread panicked").expect("writer failed");
    assert_eq!(failures, Vec::<String>::new());
}
