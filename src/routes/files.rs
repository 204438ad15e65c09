//! File (archive) endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::identity::Identity;
use crate::routes::{
    collect_body, collect_json, error_response, failure_response, json_response,
    unauthorized_response,
};
use crate::server::AppState;

/// Handle GET /files/{folderId} — folder listing, passed through.
pub async fn handle_list_files(
    state: Arc<AppState>,
    identity: Option<Identity>,
    folder_id: i64,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.list_files(&identity, folder_id).await {
        Ok(listing) => json_response(StatusCode::OK, listing),
        Err(e) => {
            warn!(folder = folder_id, error = %e, "file listing failed");
            failure_response(e)
        }
    }
}

/// Handle POST /files/{folderId} — forward a multipart upload.
pub async fn handle_upload_file(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    folder_id: i64,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("multipart/form-data") {
        return error_response(StatusCode::BAD_REQUEST, "Expected multipart/form-data");
    }

    let body = match collect_body(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file provided");
    }

    match state
        .groupware
        .upload_file(&identity, folder_id, &content_type, body)
        .await
    {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(e) => {
            warn!(folder = folder_id, error = %e, "file upload failed");
            failure_response(e)
        }
    }
}

/// Handle POST /files/{folderId}/folder — create a subfolder.
pub async fn handle_create_folder(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    folder_id: i64,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let body = match collect_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let name = body.get("name").and_then(|n| n.as_str()).unwrap_or("");
    if name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Folder name required");
    }

    match state.groupware.create_folder(&identity, folder_id, name).await {
        Ok(created) => json_response(StatusCode::OK, created),
        Err(e) => {
            warn!(folder = folder_id, error = %e, "folder creation failed");
            failure_response(e)
        }
    }
}

/// Handle DELETE /files/delete/{fileId}
pub async fn handle_delete_file(
    state: Arc<AppState>,
    identity: Option<Identity>,
    file_id: i64,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.delete_file(&identity, file_id).await {
        Ok(deleted) => json_response(StatusCode::OK, deleted),
        Err(e) => {
            warn!(file = file_id, error = %e, "file deletion failed");
            failure_response(e)
        }
    }
}
