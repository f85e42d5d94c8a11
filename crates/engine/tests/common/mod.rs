//! Shared harness for engine integration tests: a `MigrationEngine`
//! wired to scripted collaborators, plus helpers that walk a session
//! through the pipeline.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;
use stevedore_core::mapping::FieldMapping;
use stevedore_core::types::{DbId, TenantId};
use stevedore_core::SessionStatus;
use stevedore_db::models::chunk::PutChunk;
use stevedore_db::models::session::{CreateMigrationSession, MigrationSession};
use stevedore_engine::catalog::StaticSchemaCatalog;
use stevedore_engine::collab::{EntityWriter, ExistenceReader, WriteOutcome};
use stevedore_engine::{EngineConfig, MigrationEngine};

pub const TENANT: TenantId = 9;
pub const USER: DbId = 31;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// Entity writer that records every successful write and fails on
/// scripted `code` values. An optional per-write delay feeds the batch
/// timeout tests.
#[derive(Default)]
pub struct RecordingWriter {
    written: Mutex<Vec<(String, Value)>>,
    fail_codes: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingWriter {
    /// Make every write whose payload `code` equals `code` fail.
    pub fn fail_on(&self, code: &str) {
        self.fail_codes.lock().unwrap().insert(code.to_string());
    }

    /// Slow every write down.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn written(&self) -> Vec<(String, Value)> {
        self.written.lock().unwrap().clone()
    }

    /// `code` values of successfully written payloads, in write order.
    pub fn written_codes(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, payload)| {
                payload.get("code").and_then(Value::as_str).map(String::from)
            })
            .collect()
    }
}

#[async_trait]
impl EntityWriter for RecordingWriter {
    async fn write(&self, _tenant_id: TenantId, entity_type: &str, record: &Value) -> WriteOutcome {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let code = record
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if self.fail_codes.lock().unwrap().contains(&code) {
            return WriteOutcome::Failure(format!("store rejected '{code}'"));
        }
        self.written
            .lock()
            .unwrap()
            .push((entity_type.to_string(), record.clone()));
        WriteOutcome::Success
    }
}

/// Existence reader backed by a seeded (entity type, key) set.
#[derive(Default)]
pub struct SeededReader {
    existing: Mutex<HashSet<(String, String)>>,
}

impl SeededReader {
    pub fn seed(&self, entity_type: &str, key: &str) {
        self.existing
            .lock()
            .unwrap()
            .insert((entity_type.to_string(), key.to_string()));
    }
}

#[async_trait]
impl ExistenceReader for SeededReader {
    async fn exists(&self, _tenant_id: TenantId, entity_type: &str, key: &str) -> bool {
        self.existing
            .lock()
            .unwrap()
            .contains(&(entity_type.to_string(), key.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestEngine {
    pub engine: MigrationEngine,
    pub writer: Arc<RecordingWriter>,
    pub reader: Arc<SeededReader>,
}

pub fn test_engine(pool: PgPool) -> TestEngine {
    test_engine_with_config(pool, EngineConfig::default())
}

pub fn test_engine_with_config(pool: PgPool, config: EngineConfig) -> TestEngine {
    init_tracing();
    let writer = Arc::new(RecordingWriter::default());
    let reader = Arc::new(SeededReader::default());
    let engine = MigrationEngine::new(
        pool,
        config,
        writer.clone(),
        reader.clone(),
        Arc::new(StaticSchemaCatalog::new()),
    );
    TestEngine {
        engine,
        writer,
        reader,
    }
}

// ---------------------------------------------------------------------------
// Pipeline helpers
// ---------------------------------------------------------------------------

pub fn create_input(name: &str, entities: &[&str]) -> CreateMigrationSession {
    CreateMigrationSession {
        source_type: "legacy_erp".to_string(),
        source_name: name.to_string(),
        entities: entities.iter().map(|e| e.to_string()).collect(),
    }
}

pub fn chunk(session_id: DbId, entity_type: &str, index: i32, total: i32, payload: Value) -> PutChunk {
    PutChunk {
        session_id,
        entity_type: entity_type.to_string(),
        chunk_index: index,
        total_chunks: total,
        payload,
    }
}

/// Customer rows as they would arrive from a legacy export, with
/// source-side column names.
pub fn customer_rows(start: usize, count: usize) -> Value {
    let rows: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "Account Code": format!("C-{i:04}"),
                "Full Name": format!("Customer {i}"),
                "E-Mail": format!("c{i}@example.test"),
            })
        })
        .collect();
    Value::Array(rows)
}

pub fn pair(source: &str, target: &str) -> FieldMapping {
    FieldMapping {
        source_field: source.to_string(),
        target_field: target.to_string(),
        transform: None,
    }
}

pub fn customer_mapping() -> Vec<FieldMapping> {
    vec![
        pair("Account Code", "code"),
        pair("Full Name", "name"),
        pair("E-Mail", "email"),
    ]
}

/// Create a single-entity customer session, upload `rows` as one chunk,
/// assemble, map, and validate. Leaves the session in `ready_to_commit`.
pub async fn ready_customer_session(h: &TestEngine, rows: Value) -> DbId {
    let session = h
        .engine
        .create_session(TENANT, USER, &create_input("legacy-export.xlsx", &["customer"]))
        .await
        .unwrap();
    h.engine
        .put_chunk(TENANT, &chunk(session.id, "customer", 0, 1, rows))
        .await
        .unwrap();
    h.engine.complete_upload(TENANT, session.id).await.unwrap();
    h.engine
        .set_mapping(TENANT, session.id, "customer", &customer_mapping())
        .await
        .unwrap();
    h.engine.start_validation(TENANT, session.id).await.unwrap();
    session.id
}

/// Poll until the session reaches a terminal state.
pub async fn wait_terminal(h: &TestEngine, session_id: DbId) -> MigrationSession {
    for _ in 0..400 {
        let session = h.engine.get_session(TENANT, session_id).await.unwrap();
        let status = SessionStatus::from_str(&session.status).unwrap();
        if status.is_terminal() {
            return session;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("session {session_id} did not reach a terminal state in time");
}
