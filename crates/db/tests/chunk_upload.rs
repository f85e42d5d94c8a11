//! Integration tests for chunked upload storage and assembly into raw
//! rows.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use stevedore_db::models::chunk::{AssembledDataset, PutChunk};
use stevedore_db::models::session::CreateMigrationSession;
use stevedore_db::repositories::{ChunkRepo, RawRowRepo, SessionRepo, UploadRepo};

const TENANT: i64 = 3;

async fn uploading_session(pool: &PgPool, entities: &[&str]) -> i64 {
    let session = SessionRepo::create(
        pool,
        TENANT,
        1,
        &CreateMigrationSession {
            source_type: "spreadsheet".to_string(),
            source_name: "upload.xlsx".to_string(),
            entities: entities.iter().map(|e| e.to_string()).collect(),
        },
        Utc::now() + Duration::hours(72),
    )
    .await
    .unwrap();
    SessionRepo::transition(pool, TENANT, session.id, "created", "uploading")
        .await
        .unwrap()
        .unwrap();
    session.id
}

fn chunk(session_id: i64, index: i32, total: i32, rows: serde_json::Value) -> PutChunk {
    PutChunk {
        session_id,
        entity_type: "customer".to_string(),
        chunk_index: index,
        total_chunks: total,
        payload: rows,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_chunk_redelivery_overwrites(pool: PgPool) {
    let session_id = uploading_session(&pool, &["customer"]).await;

    let first = serde_json::json!([{ "Code": "C1" }]);
    let second = serde_json::json!([{ "Code": "C1-fixed" }]);
    ChunkRepo::upsert(&pool, &chunk(session_id, 0, 2, first))
        .await
        .unwrap();
    let stored = ChunkRepo::upsert(&pool, &chunk(session_id, 0, 2, second.clone()))
        .await
        .unwrap();

    assert_eq!(stored.payload, second);
    assert_eq!(
        ChunkRepo::count_received(&pool, session_id, "customer")
            .await
            .unwrap(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_claim_total_first_writer_wins(pool: PgPool) {
    let session_id = uploading_session(&pool, &["customer"]).await;

    let first = UploadRepo::claim_total(&pool, session_id, "customer", 3)
        .await
        .unwrap();
    assert_eq!(first.total_chunks, 3);

    // A later writer declaring a different total gets the pinned value
    // back, so the caller can detect the mismatch.
    let second = UploadRepo::claim_total(&pool, session_id, "customer", 5)
        .await
        .unwrap();
    assert_eq!(second.total_chunks, 3);
    assert_eq!(second.id, first.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_received_indexes_reveal_gaps(pool: PgPool) {
    let session_id = uploading_session(&pool, &["customer"]).await;

    for index in [2, 0] {
        ChunkRepo::upsert(&pool, &chunk(session_id, index, 3, serde_json::json!([])))
            .await
            .unwrap();
    }

    let received = ChunkRepo::received_indexes(&pool, session_id, "customer")
        .await
        .unwrap();
    assert_eq!(received, vec![0, 2]);
    assert_eq!(stevedore_core::chunk::missing_indexes(3, &received), vec![1]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_persist_assembly(pool: PgPool) {
    let session_id = uploading_session(&pool, &["customer"]).await;
    UploadRepo::claim_total(&pool, session_id, "customer", 2)
        .await
        .unwrap();
    for index in 0..2 {
        ChunkRepo::upsert(&pool, &chunk(session_id, index, 2, serde_json::json!([])))
            .await
            .unwrap();
    }

    let datasets = vec![AssembledDataset {
        entity_type: "customer".to_string(),
        source_headers: vec!["Code".to_string(), "Name".to_string()],
        rows: vec![
            serde_json::json!({ "Code": "C1", "Name": "Acme" }),
            serde_json::json!({ "Code": "C2", "Name": "Globex" }),
            serde_json::json!({ "Code": "C3", "Name": "Initech" }),
        ],
    }];
    let swapped = RawRowRepo::persist_assembly(&pool, TENANT, session_id, &datasets)
        .await
        .unwrap();
    assert!(swapped);

    let session = SessionRepo::find_by_id(&pool, TENANT, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, "upload_complete");

    assert_eq!(
        RawRowRepo::count(&pool, session_id, "customer").await.unwrap(),
        3
    );
    let rows = RawRowRepo::list_page(&pool, session_id, "customer", 10, 0)
        .await
        .unwrap();
    assert_eq!(rows[0].row_index, 0);
    assert_eq!(rows[2].data["Code"], serde_json::json!("C3"));

    let upload = UploadRepo::find(&pool, session_id, "customer")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(upload.row_count, 3);
    assert_eq!(upload.source_headers, vec!["Code", "Name"]);

    // The transient chunks were consumed.
    assert_eq!(
        ChunkRepo::count_received(&pool, session_id, "customer")
            .await
            .unwrap(),
        0
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_persist_assembly_requires_uploading(pool: PgPool) {
    let session_id = uploading_session(&pool, &["customer"]).await;
    SessionRepo::transition(&pool, TENANT, session_id, "uploading", "cancelled")
        .await
        .unwrap()
        .unwrap();

    let datasets = vec![AssembledDataset {
        entity_type: "customer".to_string(),
        source_headers: vec!["Code".to_string()],
        rows: vec![serde_json::json!({ "Code": "C1" })],
    }];
    let swapped = RawRowRepo::persist_assembly(&pool, TENANT, session_id, &datasets)
        .await
        .unwrap();
    assert!(!swapped);

    // The guard failing rolls everything back.
    assert_eq!(
        RawRowRepo::count(&pool, session_id, "customer").await.unwrap(),
        0
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reassembly_replaces_prior_rows(pool: PgPool) {
    let session_id = uploading_session(&pool, &["customer"]).await;
    UploadRepo::claim_total(&pool, session_id, "customer", 1)
        .await
        .unwrap();

    let first = vec![AssembledDataset {
        entity_type: "customer".to_string(),
        source_headers: vec!["Code".to_string()],
        rows: vec![
            serde_json::json!({ "Code": "OLD-1" }),
            serde_json::json!({ "Code": "OLD-2" }),
        ],
    }];
    assert!(RawRowRepo::persist_assembly(&pool, TENANT, session_id, &first)
        .await
        .unwrap());

    // Roll back to uploading and assemble a smaller replacement upload.
    SessionRepo::transition(&pool, TENANT, session_id, "upload_complete", "uploading")
        .await
        .unwrap()
        .unwrap();
    let second = vec![AssembledDataset {
        entity_type: "customer".to_string(),
        source_headers: vec!["Code".to_string()],
        rows: vec![serde_json::json!({ "Code": "NEW-1" })],
    }];
    assert!(RawRowRepo::persist_assembly(&pool, TENANT, session_id, &second)
        .await
        .unwrap());

    let rows = RawRowRepo::list_page(&pool, session_id, "customer", 10, 0)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].data["Code"], serde_json::json!("NEW-1"));
}
