use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{Artifact, ArtifactError, ArtifactStore};
use crate::models::artifact::ArtifactRow;

/// Bytes in S3, version ledger in Postgres.
///
/// CRITICAL: append-only. A new version is a new object key and a new ledger row;
/// existing rows and objects are never updated.
#[derive(Clone)]
pub struct S3ArtifactStore {
    pool: PgPool,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(pool: PgPool, s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { pool, s3, bucket }
    }
}

pub fn object_key(session_id: Uuid, filename: &str, version: u32) -> String {
    format!("artifacts/{session_id}/{filename}/v{version}")
}

fn db_error(e: sqlx::Error) -> ArtifactError {
    ArtifactError::Unexpected(format!("artifact ledger: {e}"))
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<u32, ArtifactError> {
        // 1. Determine next version
        let current_max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version) FROM artifacts WHERE session_id = $1 AND filename = $2",
        )
        .bind(session_id)
        .bind(filename)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        let version = u32::try_from(current_max.unwrap_or(0) + 1)
            .map_err(|e| ArtifactError::Unexpected(format!("bad version in ledger: {e}")))?;

        // 2. Upload bytes under a version-specific key
        let key = object_key(session_id, filename, version);
        let size_bytes = data.len() as i64;
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| ArtifactError::Unexpected(format!("S3 upload failed: {e}")))?;

        info!("Uploaded artifact to s3://{}/{}", self.bucket, key);

        // 3. Record the version; the unique index rejects a concurrent writer
        sqlx::query(
            r#"
            INSERT INTO artifacts
                (id, session_id, filename, version, s3_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(filename)
        .bind(version as i32)
        .bind(&key)
        .bind(content_type)
        .bind(size_bytes)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(version)
    }

    async fn latest(
        &self,
        session_id: Uuid,
        filename: &str,
    ) -> Result<Option<Artifact>, ArtifactError> {
        let row: Option<ArtifactRow> = sqlx::query_as(
            r#"
            SELECT * FROM artifacts
            WHERE session_id = $1 AND filename = $2
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let object = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(&row.s3_key)
            .send()
            .await
            .map_err(|e| ArtifactError::Unexpected(format!("S3 download failed: {e}")))?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| ArtifactError::Unexpected(format!("S3 body read failed: {e}")))?
            .into_bytes();

        Ok(Some(Artifact {
            filename: row.filename,
            version: u32::try_from(row.version).unwrap_or_default(),
            content_type: row.content_type,
            data,
            created_at: row.created_at,
        }))
    }
}
