//! Competing writers on one database file

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::*;
use folio_core::errors::ExErrorKind;
use folio_core::patch::PatchRequest;
use folio_engine::{apply_block_patch, get_document};
use folio_store::db::{self, StoreConfig};
use tempfile::TempDir;

#[test]
fn test_concurrent_patches_on_same_base_version() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("folio.db");
    let config = StoreConfig::default();

    let setup = db::open_with(&path, &config).unwrap();
    create_object(&setup, "O1", "Doc");
    drop(setup);

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["left", "right"]
        .into_iter()
        .map(|block_id| {
            let mut conn = db::open_with(&path, &config).unwrap();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let request =
                    PatchRequest::new("O1", vec![insert(block_id, None, paragraph(vec![]))])
                        .with_base_doc_version(0);
                apply_block_patch(&mut conn, request)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one writer must win");
    let conflict = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .unwrap();
    assert_eq!(conflict.kind(), ExErrorKind::ConflictVersion);

    let conn = db::open_with(&path, &config).unwrap();
    assert_eq!(doc_version(&conn, "O1"), 1);
    assert_eq!(get_document(&conn, "O1").unwrap().block_ids().len(), 1);
}

#[test]
fn test_sequential_writers_see_each_other() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("folio.db");
    let config = StoreConfig::default();

    let mut first = db::open_with(&path, &config).unwrap();
    let mut second = db::open_with(&path, &config).unwrap();
    create_object(&first, "O1", "Doc");

    apply(&mut first, "O1", vec![insert("a", None, paragraph(vec![]))]);
    let result = apply_block_patch(
        &mut second,
        PatchRequest::new("O1", vec![insert("b", Some("a"), paragraph(vec![]))])
            .with_base_doc_version(1),
    )
    .unwrap();

    assert_eq!(result.new_doc_version, 2);
    assert_eq!(
        get_document(&first, "O1").unwrap().block_ids(),
        vec!["a", "b"]
    );
}
