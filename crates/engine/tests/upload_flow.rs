//! Chunked upload flow tests: receipts, idempotent re-delivery, total
//! agreement, completeness reporting, and ordered assembly.

mod common;

use assert_matches::assert_matches;
use common::{chunk, create_input, customer_rows, test_engine, TENANT, USER};
use serde_json::json;
use sqlx::PgPool;
use stevedore_core::error::CoreError;
use stevedore_db::repositories::{ChunkRepo, RawRowRepo, UploadRepo};
use stevedore_engine::EngineError;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_receipts_count_distinct_indexes(pool: PgPool) {
    let h = test_engine(pool);
    let session = h
        .engine
        .create_session(TENANT, USER, &create_input("erp.csv", &["customer"]))
        .await
        .unwrap();

    let receipt = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 3, customer_rows(0, 2)))
        .await
        .unwrap();
    assert_eq!(receipt.received, 1);
    assert_eq!(receipt.total_expected, 3);

    // First chunk moves the session out of `created`.
    let session_now = h.engine.get_session(TENANT, session.id).await.unwrap();
    assert_eq!(session_now.status, "uploading");

    let receipt = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 2, 3, customer_rows(4, 2)))
        .await
        .unwrap();
    assert_eq!(receipt.received, 2);

    // Re-delivery of an already-received index does not inflate the count.
    let receipt = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 3, customer_rows(0, 2)))
        .await
        .unwrap();
    assert_eq!(receipt.received, 2);

    let receipt = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 1, 3, customer_rows(2, 2)))
        .await
        .unwrap();
    assert_eq!(receipt.received, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_put_chunk_rejects_bad_coordinates(pool: PgPool) {
    let h = test_engine(pool);
    let session = h
        .engine
        .create_session(TENANT, USER, &create_input("erp.csv", &["customer"]))
        .await
        .unwrap();

    // Entity type the session never declared.
    let err = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "product", 0, 1, customer_rows(0, 1)))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(msg)) if msg.contains("product"));

    // Index out of range.
    let err = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 3, 3, customer_rows(0, 1)))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));

    // Payload must be an array of objects.
    let err = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 1, json!({"rows": []})))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));

    let err = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 1, json!([{"a": 1}, 7])))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_chunk_total_is_authoritative(pool: PgPool) {
    let h = test_engine(pool);
    let session = h
        .engine
        .create_session(TENANT, USER, &create_input("erp.csv", &["customer"]))
        .await
        .unwrap();

    h.engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 2, customer_rows(0, 2)))
        .await
        .unwrap();

    let err = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 1, 3, customer_rows(2, 2)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        EngineError::Core(CoreError::ChunkTotalMismatch {
            declared: 2,
            reported: 3,
            ..
        })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_complete_upload_names_incomplete_entity_types(pool: PgPool) {
    let h = test_engine(pool);
    let session = h
        .engine
        .create_session(TENANT, USER, &create_input("erp.csv", &["customer", "product"]))
        .await
        .unwrap();

    // Customer is complete; product is missing chunk 1 of 2.
    h.engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 1, customer_rows(0, 2)))
        .await
        .unwrap();
    h.engine
        .put_chunk(
            TENANT,
            &chunk(session.id, "product", 0, 2, json!([{"Item Code": "P-1", "Name": "Bolt", "Unit": "pcs"}])),
        )
        .await
        .unwrap();

    let err = h.engine.complete_upload(TENANT, session.id).await.unwrap_err();
    assert_matches!(
        err,
        EngineError::Core(CoreError::IncompleteUpload { entity_types })
            if entity_types == vec!["product".to_string()]
    );

    // Nothing was assembled and the session can keep uploading.
    let session_now = h.engine.get_session(TENANT, session.id).await.unwrap();
    assert_eq!(session_now.status, "uploading");
    assert_eq!(RawRowRepo::count(h.engine.pool(), session.id, "customer").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_complete_upload_assembles_in_chunk_order(pool: PgPool) {
    let h = test_engine(pool.clone());
    let session = h
        .engine
        .create_session(TENANT, USER, &create_input("erp.csv", &["customer"]))
        .await
        .unwrap();

    // Chunks arrive out of order; assembly follows chunk order anyway.
    h.engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 1, 2, customer_rows(2, 1)))
        .await
        .unwrap();
    h.engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 2, customer_rows(0, 2)))
        .await
        .unwrap();

    let completed = h.engine.complete_upload(TENANT, session.id).await.unwrap();
    assert_eq!(completed.status, "upload_complete");

    let rows = RawRowRepo::list_page(&pool, session.id, "customer", 10, 0)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.row_index, i as i64);
        assert_eq!(row.data["Account Code"], json!(format!("C-{i:04}")));
    }

    // Headers and row count are stamped; chunks are consumed.
    let upload = UploadRepo::find(&pool, session.id, "customer")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(upload.source_headers, vec!["Account Code", "Full Name", "E-Mail"]);
    assert_eq!(upload.row_count, 3);
    assert_eq!(
        ChunkRepo::count_received(&pool, session.id, "customer").await.unwrap(),
        0
    );

    // The upload window is closed now.
    let err = h
        .engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 2, customer_rows(0, 1)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        EngineError::Core(CoreError::InvalidSessionState {
            required: "created or uploading",
            ..
        })
    );
}
