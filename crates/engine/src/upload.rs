//! Chunked upload intake and dataset assembly.

use serde_json::Value;
use stevedore_core::chunk::{
    check_chunk_bounds, check_chunk_total, missing_indexes, parse_chunk_rows, source_headers,
};
use stevedore_core::error::CoreError;
use stevedore_core::types::{DbId, TenantId};
use stevedore_core::SessionStatus;
use stevedore_db::models::chunk::{AssembledDataset, ChunkReceipt, PutChunk};
use stevedore_db::models::session::MigrationSession;
use stevedore_db::repositories::chunk_repo::{ChunkRepo, RawRowRepo, UploadRepo};
use stevedore_db::repositories::session_repo::SessionRepo;

use crate::sessions::parse_status;
use crate::{EngineResult, MigrationEngine};

impl MigrationEngine {
    /// Store one uploaded chunk.
    ///
    /// Deliberately takes no session lease: clients upload chunks in
    /// parallel, and the chunk upsert plus the first-writer-wins total
    /// claim make concurrent delivery safe. Re-delivery of an index
    /// overwrites the prior payload and the receipt counts it once.
    pub async fn put_chunk(
        &self,
        tenant_id: TenantId,
        input: &PutChunk,
    ) -> EngineResult<ChunkReceipt> {
        let session = self.get_session(tenant_id, input.session_id).await?;
        let current = parse_status(&session)?;
        current.require_one_of(
            &[SessionStatus::Created, SessionStatus::Uploading],
            "created or uploading",
        )?;
        if !session.entities.contains(&input.entity_type) {
            return Err(CoreError::Validation(format!(
                "entity type '{}' is not part of this session",
                input.entity_type
            ))
            .into());
        }
        check_chunk_bounds(&input.entity_type, input.chunk_index, input.total_chunks)?;
        parse_chunk_rows(&input.payload)?;

        let upload = UploadRepo::claim_total(
            &self.pool,
            input.session_id,
            &input.entity_type,
            input.total_chunks,
        )
        .await?;
        check_chunk_total(&input.entity_type, upload.total_chunks, input.total_chunks)?;

        ChunkRepo::upsert(&self.pool, input).await?;
        if current == SessionStatus::Created {
            // Racing first chunks both reach here; the loser's failed
            // guard is harmless.
            let _ = SessionRepo::transition(
                &self.pool,
                tenant_id,
                input.session_id,
                SessionStatus::Created.as_str(),
                SessionStatus::Uploading.as_str(),
            )
            .await?;
        }

        let received =
            ChunkRepo::count_received(&self.pool, input.session_id, &input.entity_type).await?;
        tracing::debug!(
            session_id = input.session_id,
            entity_type = %input.entity_type,
            chunk_index = input.chunk_index,
            received,
            "Chunk stored"
        );
        Ok(ChunkReceipt {
            received,
            total_expected: upload.total_chunks,
        })
    }

    /// Declare the upload finished, assemble every entity type's chunks
    /// into ordered raw rows, and move the session to `upload_complete`.
    ///
    /// Fails with [`CoreError::IncompleteUpload`] naming every entity
    /// type that is still missing chunks; nothing is assembled in that
    /// case.
    pub async fn complete_upload(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
    ) -> EngineResult<MigrationSession> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        parse_status(&session)?.require_one_of(&[SessionStatus::Uploading], "uploading")?;

        let mut missing = Vec::new();
        let mut complete = Vec::new();
        for entity_type in &session.entities {
            let Some(upload) = UploadRepo::find(&self.pool, session_id, entity_type).await? else {
                missing.push(entity_type.clone());
                continue;
            };
            let received = ChunkRepo::received_indexes(&self.pool, session_id, entity_type).await?;
            if missing_indexes(upload.total_chunks, &received).is_empty() {
                complete.push(upload);
            } else {
                missing.push(entity_type.clone());
            }
        }
        if !missing.is_empty() {
            return Err(CoreError::IncompleteUpload {
                entity_types: missing,
            }
            .into());
        }

        let mut datasets = Vec::with_capacity(complete.len());
        let mut total_rows = 0usize;
        for upload in &complete {
            let chunks =
                ChunkRepo::list_for_assembly(&self.pool, session_id, &upload.entity_type).await?;
            let mut rows = Vec::new();
            for chunk in &chunks {
                rows.extend(parse_chunk_rows(&chunk.payload)?);
            }
            let headers = source_headers(&rows);
            total_rows += rows.len();
            datasets.push(AssembledDataset {
                entity_type: upload.entity_type.clone(),
                source_headers: headers,
                rows: rows.into_iter().map(Value::Object).collect(),
            });
        }

        let swapped = RawRowRepo::persist_assembly(&self.pool, tenant_id, session_id, &datasets)
            .await?;
        if !swapped {
            // A concurrent transition (e.g. cancel) beat the assembly.
            let fresh = self.get_session(tenant_id, session_id).await?;
            return Err(CoreError::InvalidSessionState {
                current: parse_status(&fresh)?,
                required: "uploading",
            }
            .into());
        }

        tracing::info!(
            session_id,
            entity_types = complete.len(),
            total_rows,
            "Upload assembled"
        );
        self.get_session(tenant_id, session_id).await
    }
}
