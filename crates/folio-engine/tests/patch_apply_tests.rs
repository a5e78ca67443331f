//! Insert/update semantics, atomicity and derived-row maintenance

mod common;

use common::*;
use folio_core::errors::ExErrorKind;
use folio_core::extract::extract_references;
use folio_core::model::{BlockContent, BlockMeta, BlockType};
use folio_core::patch::{BlockOp, BlockPatch, PatchRequest, Place, REF_TARGET_MISSING};
use folio_engine::{apply_block_patch, get_backlinks};
use folio_store::repo::BlockRepo;
use serde_json::json;

#[test]
fn test_insert_with_ref_creates_backlink() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Source");
    create_object(&conn, "T", "Target");

    let request = PatchRequest::new(
        "O1",
        vec![insert("B1", None, paragraph(vec![text("see "), object_ref("T")]))],
    )
    .with_base_doc_version(0);
    let result = apply_block_patch(&mut conn, request).unwrap();

    assert_eq!(result.api_version, "v1");
    assert_eq!(result.object_id, "O1");
    assert_eq!(result.previous_doc_version, 0);
    assert_eq!(result.new_doc_version, 1);
    assert_eq!(result.applied.inserted_block_ids, vec!["B1"]);
    assert!(result.warnings.is_empty());

    let refs = folio_store::repo::RefRepo::refs_for_block(&conn, "B1").unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].source_object_id, "O1");
    assert_eq!(refs[0].target_object_id, "T");
    assert_eq!(refs[0].target_block_id, None);

    let backlinks = get_backlinks(&conn, "T").unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].source_block_id, "B1");
    assert_eq!(backlinks[0].source_object_title, "Source");
    assert_eq!(fts_text(&conn, "B1").as_deref(), Some("see"));
}

#[test]
fn test_sequential_end_inserts_increase() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    apply(&mut conn, "O1", vec![insert("P", None, paragraph(vec![]))]);

    apply(&mut conn, "O1", vec![insert("k1", Some("P"), paragraph(vec![]))]);
    apply(&mut conn, "O1", vec![insert("k2", Some("P"), paragraph(vec![]))]);

    assert!(order_key(&conn, "k1") < order_key(&conn, "k2"));
}

#[test]
fn test_version_bumps_once_per_patch() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");

    let result = apply(
        &mut conn,
        "O1",
        vec![
            insert("a", None, paragraph(vec![])),
            insert("b", None, paragraph(vec![])),
            insert("c", Some("a"), paragraph(vec![])),
        ],
    );
    assert_eq!(result.new_doc_version, 1);
    assert_eq!(doc_version(&conn, "O1"), 1);

    apply(&mut conn, "O1", vec![delete("b", false)]);
    assert_eq!(doc_version(&conn, "O1"), 2);
}

#[test]
fn test_later_ops_see_earlier_ops() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");

    let result = apply(
        &mut conn,
        "O1",
        vec![
            insert("parent", None, paragraph(vec![])),
            insert("child", Some("parent"), paragraph(vec![])),
            insert_at(
                "first",
                Some("parent"),
                Place::Before {
                    sibling_block_id: "child".to_string(),
                },
            ),
        ],
    );

    assert_eq!(result.applied.inserted_block_ids.len(), 3);
    assert!(order_key(&conn, "first") < order_key(&conn, "child"));
}

#[test]
fn test_failing_op_rolls_back_whole_patch() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    create_object(&conn, "T", "Target");

    let request = PatchRequest::new(
        "O1",
        vec![
            insert("B1", None, paragraph(vec![object_ref("T")])),
            insert("B2", Some("missing-parent"), paragraph(vec![])),
        ],
    );
    let err = apply_block_patch(&mut conn, request).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFoundBlock);
    assert_eq!(err.op_index(), Some(1));
    assert_eq!(doc_version(&conn, "O1"), 0);
    assert!(BlockRepo::get_block(&conn, "B1").unwrap().is_none());
    assert_eq!(count_rows(&conn, "refs"), 0);
    assert_eq!(count_rows(&conn, "block_fts"), 0);
}

#[test]
fn test_insert_validation_errors() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    apply(&mut conn, "O1", vec![insert_with_key("B1", None, "V")]);

    // Reused id, even after deletion
    apply(&mut conn, "O1", vec![delete("B1", false)]);
    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("O1", vec![insert("B1", None, paragraph(vec![]))]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);

    // Content that does not fit the block type
    let bad_content = BlockOp::Insert {
        block_id: "B2".to_string(),
        parent_block_id: None,
        order_key: None,
        place: None,
        block_type: BlockType::Heading,
        content: json!({"level": 9, "inline": []}),
        meta: None,
    };
    let err = apply_block_patch(&mut conn, PatchRequest::new("O1", vec![bad_content])).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert_eq!(err.op_index(), Some(0));
    assert_eq!(err.op(), Some("block.insert"));

    // Explicit key already used by a live sibling
    apply(&mut conn, "O1", vec![insert_with_key("B3", None, "V")]);
    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("O1", vec![insert_with_key("B4", None, "V")]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert_eq!(err.details().unwrap()["orderKey"], json!("V"));
    assert_eq!(err.op(), Some("block.insert"));

    // Malformed explicit key
    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("O1", vec![insert_with_key("B5", None, "V0")]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);
}

#[test]
fn test_parent_in_other_object_is_not_found() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "One");
    create_object(&conn, "O2", "Two");
    apply(&mut conn, "O2", vec![insert("foreign", None, paragraph(vec![]))]);

    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("O1", vec![insert("B1", Some("foreign"), paragraph(vec![]))]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFoundBlock);
    assert_eq!(err.block_id(), Some("foreign"));
}

#[test]
fn test_missing_and_deleted_objects() {
    let mut conn = setup_db();
    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("nope", vec![insert("B1", None, paragraph(vec![]))]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFoundObject);

    create_object(&conn, "O1", "Doc");
    folio_store::repo::ObjectRepo::soft_delete_object(&conn, "O1", 1).unwrap();
    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("O1", vec![insert("B1", None, paragraph(vec![]))]),
    )
    .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND_OBJECT");
}

#[test]
fn test_envelope_errors_are_validation() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");

    let mut request = PatchRequest::new("O1", vec![insert("B1", None, paragraph(vec![]))]);
    request.api_version = "v0".to_string();
    let err = apply_block_patch(&mut conn, request).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);

    let err = apply_block_patch(&mut conn, PatchRequest::new("O1", vec![])).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);

    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("O1", vec![insert("has space", None, paragraph(vec![]))]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert_eq!(err.op_index(), Some(0));
    assert!(err.request_id().is_some());
}

#[test]
fn test_missing_ref_target_warns() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    create_object(&conn, "T", "Target");

    let result = apply(
        &mut conn,
        "O1",
        vec![insert(
            "B1",
            None,
            paragraph(vec![
                object_ref("ghost"),
                object_ref("ghost"),
                block_ref("T", "no-such-block"),
                object_ref("T"),
            ]),
        )],
    );

    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().all(|w| w.code == REF_TARGET_MISSING));
    assert_eq!(
        result.warnings[0].details,
        Some(json!({"blockId": "B1", "targetObjectId": "ghost"}))
    );
    assert_eq!(
        result.warnings[1].details,
        Some(json!({"blockId": "B1", "targetObjectId": "T", "targetBlockId": "no-such-block"}))
    );
    // Refs are stored regardless of the warning
    assert_eq!(stored_ref_targets(&conn, "B1").len(), 4);
}

#[test]
fn test_update_recomputes_refs_and_text() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    create_object(&conn, "A", "Alpha");
    create_object(&conn, "B", "Beta");
    apply(
        &mut conn,
        "O1",
        vec![insert("B1", None, paragraph(vec![text("old"), object_ref("A")]))],
    );

    let new_content = paragraph(vec![
        text("new"),
        object_ref("B"),
        block_ref("A", "B1"),
        object_ref("B"),
    ]);
    let result = apply(
        &mut conn,
        "O1",
        vec![BlockOp::Update {
            block_id: "B1".to_string(),
            patch: BlockPatch {
                content: Some(new_content.clone()),
                ..Default::default()
            },
        }],
    );
    assert_eq!(result.applied.updated_block_ids, vec!["B1"]);

    let parsed = BlockContent::parse(BlockType::Paragraph, &new_content).unwrap();
    let mut expected: Vec<(String, Option<String>)> = extract_references(&parsed)
        .into_iter()
        .map(|t| (t.object_id().to_string(), t.block_id().map(str::to_string)))
        .collect();
    expected.sort();
    assert_eq!(stored_ref_targets(&conn, "B1"), expected);
    assert_eq!(fts_text(&conn, "B1").as_deref(), Some("new"));
    assert!(get_backlinks(&conn, "B").unwrap().len() == 1);
}

#[test]
fn test_update_type_change_revalidates_current_content() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    apply(&mut conn, "O1", vec![insert("B1", None, paragraph(vec![text("x")]))]);

    // paragraph -> list_item keeps {inline} valid
    apply(
        &mut conn,
        "O1",
        vec![BlockOp::Update {
            block_id: "B1".to_string(),
            patch: BlockPatch {
                block_type: Some(BlockType::ListItem),
                ..Default::default()
            },
        }],
    );
    let block = BlockRepo::get_block(&conn, "B1").unwrap().unwrap();
    assert_eq!(block.block_type, BlockType::ListItem);

    // list_item -> code_block without new content does not fit
    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new(
            "O1",
            vec![BlockOp::Update {
                block_id: "B1".to_string(),
                patch: BlockPatch {
                    block_type: Some(BlockType::CodeBlock),
                    ..Default::default()
                },
            }],
        ),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Validation);
}

#[test]
fn test_update_meta_replace_and_clear() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    apply(&mut conn, "O1", vec![insert("B1", None, paragraph(vec![]))]);

    let set_meta = |meta: Option<BlockMeta>| BlockOp::Update {
        block_id: "B1".to_string(),
        patch: BlockPatch {
            meta: Some(meta),
            ..Default::default()
        },
    };

    apply(
        &mut conn,
        "O1",
        vec![set_meta(Some(BlockMeta {
            collapsed: Some(true),
        }))],
    );
    let block = BlockRepo::get_block(&conn, "B1").unwrap().unwrap();
    assert_eq!(block.meta.unwrap().collapsed, Some(true));

    apply(&mut conn, "O1", vec![set_meta(None)]);
    let block = BlockRepo::get_block(&conn, "B1").unwrap().unwrap();
    assert!(block.meta.is_none());
}

#[test]
fn test_update_deleted_block_is_not_found() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    apply(&mut conn, "O1", vec![insert("B1", None, paragraph(vec![]))]);
    apply(&mut conn, "O1", vec![delete("B1", false)]);

    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new(
            "O1",
            vec![BlockOp::Update {
                block_id: "B1".to_string(),
                patch: BlockPatch {
                    content: Some(paragraph(vec![])),
                    ..Default::default()
                },
            }],
        ),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFoundBlock);
}

#[test]
fn test_applied_lists_are_deduplicated() {
    let mut conn = setup_db();
    create_object(&conn, "O1", "Doc");
    apply(&mut conn, "O1", vec![insert("B1", None, paragraph(vec![]))]);

    let update = |s: &str| BlockOp::Update {
        block_id: "B1".to_string(),
        patch: BlockPatch {
            content: Some(paragraph(vec![text(s)])),
            ..Default::default()
        },
    };
    let result = apply(&mut conn, "O1", vec![update("one"), update("two")]);
    assert_eq!(result.applied.updated_block_ids, vec!["B1"]);
    assert_eq!(fts_text(&conn, "B1").as_deref(), Some("two"));
}
