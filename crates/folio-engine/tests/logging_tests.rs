//! Lifecycle events emitted by engine operations

mod common;

use common::*;
use folio_core::logging_facility::test_capture::init_test_capture;
use folio_core::patch::PatchRequest;
use folio_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_ERR_CODE,
    FIELD_NEW_DOC_VERSION, FIELD_OBJECT_ID, FIELD_OP_COUNT, FIELD_PREVIOUS_DOC_VERSION,
    FIELD_REPLAYED, FIELD_REQUEST_ID,
};
use folio_engine::{apply_block_patch, get_backlinks};

// The capture is process-global; each test uses object ids no other test
// in this binary touches and matches events by request id.

fn start_request_id(
    capture: &folio_core::logging_facility::test_capture::TestCapture,
    op: &str,
    object_id: &str,
) -> String {
    let starts: Vec<_> = capture
        .find(op, EVENT_START)
        .into_iter()
        .filter(|e| e.field(FIELD_OBJECT_ID) == Some(object_id))
        .collect();
    assert_eq!(starts.len(), 1, "one start event for {}", object_id);
    starts[0].field(FIELD_REQUEST_ID).unwrap().to_string()
}

#[test]
fn test_patch_emits_start_and_end() {
    let capture = init_test_capture();
    let mut conn = setup_db();
    create_object(&conn, "log-ok", "Doc");

    apply_block_patch(
        &mut conn,
        PatchRequest::new(
            "log-ok",
            vec![
                insert("a", None, paragraph(vec![])),
                insert("b", None, paragraph(vec![])),
            ],
        ),
    )
    .unwrap();

    let request_id = start_request_id(&capture, "block_patch_apply", "log-ok");
    let start = capture
        .find("block_patch_apply", EVENT_START)
        .into_iter()
        .find(|e| e.field(FIELD_REQUEST_ID) == Some(request_id.as_str()))
        .unwrap();
    assert_eq!(start.field(FIELD_OP_COUNT), Some("2"));

    let ends: Vec<_> = capture
        .find("block_patch_apply", EVENT_END)
        .into_iter()
        .filter(|e| e.field(FIELD_REQUEST_ID) == Some(request_id.as_str()))
        .collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].field(FIELD_PREVIOUS_DOC_VERSION), Some("0"));
    assert_eq!(ends[0].field(FIELD_NEW_DOC_VERSION), Some("1"));
    assert_eq!(ends[0].field(FIELD_REPLAYED), Some("false"));
    assert!(ends[0].field(FIELD_DURATION_MS).is_some());
    assert_eq!(
        ends[0].component.as_deref(),
        Some("folio_engine::commands::patch")
    );
}

#[test]
fn test_failed_patch_emits_end_error_with_code() {
    let capture = init_test_capture();
    let mut conn = setup_db();
    create_object(&conn, "log-err", "Doc");

    let err = apply_block_patch(
        &mut conn,
        PatchRequest::new("log-err", vec![insert("a", Some("ghost"), paragraph(vec![]))]),
    )
    .unwrap_err();

    let request_id = start_request_id(&capture, "block_patch_apply", "log-err");
    assert_eq!(err.request_id().map(|r| r.as_str()), Some(request_id.as_str()));

    let errors: Vec<_> = capture
        .find("block_patch_apply", EVENT_END_ERROR)
        .into_iter()
        .filter(|e| e.field(FIELD_REQUEST_ID) == Some(request_id.as_str()))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field(FIELD_ERR_CODE), Some("NOT_FOUND_BLOCK"));
    assert_eq!(errors[0].level, tracing::Level::ERROR);

    let ends = capture
        .find("block_patch_apply", EVENT_END)
        .into_iter()
        .filter(|e| e.field(FIELD_REQUEST_ID) == Some(request_id.as_str()))
        .count();
    assert_eq!(ends, 0);
}

#[test]
fn test_query_emits_lifecycle_events() {
    let capture = init_test_capture();
    let conn = setup_db();
    create_object(&conn, "log-query", "Doc");

    get_backlinks(&conn, "log-query").unwrap();

    let request_id = start_request_id(&capture, "backlinks_get", "log-query");
    let ends = capture
        .find("backlinks_get", EVENT_END)
        .into_iter()
        .filter(|e| e.field(FIELD_REQUEST_ID) == Some(request_id.as_str()))
        .count();
    assert_eq!(ends, 1);
}
