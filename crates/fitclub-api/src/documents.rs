//! User documents: logos, profile images, group images and uploads.
//!
//! Metadata lives in the `documents` table; bytes live behind a
//! [`DocumentStore`], addressed by `(owner user id, document id)`.

use std::path::PathBuf;

use anyhow::{Result as AnyResult, bail};
use async_trait::async_trait;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

use fitclub_db::models::DocumentRow;
use fitclub_types::api::{Claims, DeletedResponse, UploadQuery};

use crate::error::{ApiError, Result};
use crate::extract::{ValidPath, ValidQuery};
use crate::{AppState, convert, policy, run_db};

/// 10 MB upload limit for documents
pub const MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, user_id: &str, document_id: &str, bytes: &[u8]) -> AnyResult<()>;

    /// Stored bytes, `None` when nothing is stored under this key.
    async fn get(&self, user_id: &str, document_id: &str) -> AnyResult<Option<Vec<u8>>>;

    /// Public URL of the stored bytes, `None` when nothing is stored.
    async fn url(&self, user_id: &str, document_id: &str) -> AnyResult<Option<String>>;

    /// Removing a key that holds nothing is not an error.
    async fn delete(&self, user_id: &str, document_id: &str) -> AnyResult<()>;
}

/// Documents on local disk at `{dir}/{user_id}/{document_id}`, served under
/// `{public_url}/documents/{user_id}/{document_id}`.
pub struct LocalDocumentStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalDocumentStore {
    pub async fn new(dir: PathBuf, public_url: impl Into<String>) -> AnyResult<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Document storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Both ids must be UUIDs so a key can never escape `dir`.
    fn file_path(&self, user_id: &str, document_id: &str) -> AnyResult<PathBuf> {
        if user_id.parse::<Uuid>().is_err() || document_id.parse::<Uuid>().is_err() {
            bail!("invalid document key {}/{}", user_id, document_id);
        }
        Ok(self.dir.join(user_id).join(document_id))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn put(&self, user_id: &str, document_id: &str, bytes: &[u8]) -> AnyResult<()> {
        let path = self.file_path(user_id, document_id)?;
        fs::create_dir_all(self.dir.join(user_id)).await?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, user_id: &str, document_id: &str) -> AnyResult<Option<Vec<u8>>> {
        let path = self.file_path(user_id, document_id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn url(&self, user_id: &str, document_id: &str) -> AnyResult<Option<String>> {
        let path = self.file_path(user_id, document_id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(format!(
            "{}/documents/{}/{}",
            self.public_url, user_id, document_id
        )))
    }

    async fn delete(&self, user_id: &str, document_id: &str) -> AnyResult<()> {
        let path = self.file_path(user_id, document_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted document {}/{}", user_id, document_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Document {}/{} already gone", user_id, document_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The document row, when it exists and belongs to `user_id`.
async fn owned_document(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
) -> Result<Option<DocumentRow>> {
    let did = document_id.to_string();
    let row = run_db(state, move |db| db.get_document(&did)).await?;
    Ok(row.filter(|doc| doc.user_id == user_id.to_string()))
}

/// POST /documents?kind=IMAGE&fileName=... with the raw bytes as body.
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidQuery(query): ValidQuery<UploadQuery>,
    bytes: Bytes,
) -> Result<impl IntoResponse> {
    if bytes.is_empty() {
        return Err(ApiError::Validation("document body is empty".into()));
    }

    let document_id = Uuid::new_v4().to_string();
    let user_id = claims.sub.to_string();
    let size = bytes.len() as i64;

    state.documents.put(&user_id, &document_id, &bytes).await?;

    let (did, uid, kind, file_name) = (document_id.clone(), user_id.clone(), query.kind, query.file_name);
    let inserted = run_db(&state, move |db| {
        db.insert_document(&did, &uid, kind, file_name.as_deref(), size)?;
        db.get_document(&did)
    })
    .await;

    let row = match inserted {
        Ok(Some(row)) => row,
        Ok(None) => return Err(anyhow::anyhow!("document {} vanished after insert", document_id).into()),
        Err(e) => {
            // Drop the orphaned bytes
            if let Err(cleanup) = state.documents.delete(&user_id, &document_id).await {
                error!("Failed to remove orphaned document {}: {}", document_id, cleanup);
            }
            return Err(e);
        }
    };

    let url = state.documents.url(&user_id, &document_id).await?;
    info!(%document_id, %user_id, size, "Document uploaded");

    Ok((StatusCode::CREATED, Json(convert::document_response(row, url)?)))
}

/// GET /documents/{user_id}/{document_id}/url: `null` when the document or
/// its bytes are missing.
pub async fn get_document_url_by_id(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ValidPath((user_id, document_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<Option<String>>> {
    if owned_document(&state, user_id, document_id).await?.is_none() {
        return Ok(Json(None));
    }
    let url = state
        .documents
        .url(&user_id.to_string(), &document_id.to_string())
        .await?;
    Ok(Json(url))
}

/// GET /documents/{user_id}/{document_id}
pub async fn download_document(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ValidPath((user_id, document_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let not_found = || ApiError::NotFound(format!("document {}", document_id));

    owned_document(&state, user_id, document_id)
        .await?
        .ok_or_else(not_found)?;
    let bytes = state
        .documents
        .get(&user_id.to_string(), &document_id.to_string())
        .await?
        .ok_or_else(not_found)?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// DELETE /documents/{user_id}/{document_id}: owner or admin.
pub async fn delete_user_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath((user_id, document_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<DeletedResponse>> {
    policy::require_self_or_admin(&claims, user_id, "delete this document")?;

    if owned_document(&state, user_id, document_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("document {}", document_id)));
    }

    let did = document_id.to_string();
    let removed = run_db(&state, move |db| db.delete_document(&did)).await?;
    state
        .documents
        .delete(&user_id.to_string(), &document_id.to_string())
        .await?;

    Ok(Json(DeletedResponse {
        count: usize::from(removed),
    }))
}
