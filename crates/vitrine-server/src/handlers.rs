use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use vitrine_media::UploadFile;

use crate::state::AppState;

/// Folder served when the query string names none, matching the public
/// gallery page being the main anonymous consumer.
const DEFAULT_FOLDER: &str = "gallery";

/// Error response carrying an `{error}` body with the right status.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "storage operation failed");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    folder: Option<String>,
}

/// GET /media?folder=<key> - merged listing for a folder
pub async fn list_media(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let folder = query
        .folder
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string());
    tracing::debug!(folder, "GET /media");

    let items = state.library.list(&folder).await;
    Json(json!({ "items": items }))
}

/// POST /media/upload - multipart upload of one or more files
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut folder: Option<String> = None;
    let mut files: Vec<UploadFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("folder") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("unreadable folder field: {e}")))?;
                folder = Some(value);
            }
            Some("files") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("unreadable file field: {e}")))?;
                files.push(UploadFile {
                    name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let folder = folder
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing folder/files"))?;
    if files.is_empty() {
        return Err(ApiError::bad_request("Missing folder/files"));
    }

    tracing::info!(folder, count = files.len(), "POST /media/upload");
    state
        .library
        .upload_files(&folder, files)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({"ok": true})))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    folder: Option<String>,
    order: Option<Vec<String>>,
}

/// POST /media/reorder - replace a folder's manual ordering wholesale
pub async fn reorder_media(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Value>, ApiError> {
    let folder = request
        .folder
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid payload"))?;
    let order = request
        .order
        .ok_or_else(|| ApiError::bad_request("Invalid payload"))?;

    tracing::info!(folder, count = order.len(), "POST /media/reorder");
    state
        .library
        .reorder(&folder, order)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({"ok": true})))
}

#[derive(Debug, Deserialize)]
pub struct DescriptionsRequest {
    folder: Option<String>,
    descriptions: Option<BTreeMap<String, String>>,
}

/// POST /media/descriptions - shallow-merge description edits
pub async fn update_descriptions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DescriptionsRequest>,
) -> Result<Json<Value>, ApiError> {
    let folder = request
        .folder
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid payload"))?;
    let descriptions = request
        .descriptions
        .ok_or_else(|| ApiError::bad_request("Invalid payload"))?;

    tracing::info!(folder, count = descriptions.len(), "POST /media/descriptions");
    state
        .library
        .describe(&folder, descriptions)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({"ok": true})))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    folder: Option<String>,
    id: Option<String>,
}

/// POST /media/delete - delete one asset from backend and overlay
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<Value>, ApiError> {
    let folder = request
        .folder
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing folder or id"))?;
    let id = request
        .id
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing folder or id"))?;

    tracing::info!(folder, id, "POST /media/delete");
    state
        .library
        .delete(&folder, &id)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({"success": true})))
}

/// GET /settings - application settings blob (`{}` when absent)
pub async fn read_settings(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.library.read_settings().await)
}

/// POST /settings - replace the application settings blob
pub async fn write_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !body.is_object() {
        return Err(ApiError::bad_request("settings must be a JSON object"));
    }

    state
        .library
        .write_settings(&body)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({"success": true})))
}
