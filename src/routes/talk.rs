//! Chat (pulse) endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::identity::Identity;
use crate::routes::{
    collect_body, collect_json, error_response, failure_response, json_response,
    unauthorized_response,
};
use crate::server::AppState;

/// Handle GET /talk/rooms — the rooms visible to the caller's account.
pub async fn handle_list_rooms(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.get_chat_rooms(&identity).await {
        Ok(rooms) => json_response(StatusCode::OK, rooms),
        Err(e) => {
            warn!(error = %e, "room list forward failed");
            failure_response(e)
        }
    }
}

/// Handle GET /talk/rooms/{token}/messages?limit=N
pub async fn handle_get_messages(
    state: Arc<AppState>,
    identity: Option<Identity>,
    token: &str,
    params: &HashMap<String, String>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(50)
        .min(200);

    match state.groupware.get_chat_messages(&identity, token, limit).await {
        Ok(messages) => json_response(StatusCode::OK, messages),
        Err(e) => {
            warn!(room = %token, error = %e, "message fetch failed");
            failure_response(e)
        }
    }
}

/// Handle POST /talk/rooms/{token}/messages
pub async fn handle_send_message(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    token: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let body = match collect_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let message = body.get("message").and_then(|m| m.as_str()).unwrap_or("");
    if message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message required");
    }

    match state.groupware.send_chat_message(&identity, token, message).await {
        Ok(sent) => json_response(StatusCode::OK, sent),
        Err(e) => {
            warn!(room = %token, error = %e, "message send failed");
            failure_response(e)
        }
    }
}

/// Handle POST /talk/{token}/upload — forward a multipart media payload
/// to the room. One buffered payload per request, bounded by the upload
/// timeout; on failure the user re-triggers manually.
pub async fn handle_upload(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    token: &str,
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
        .upload_chat_media(&identity, token, &content_type, body)
        .await
    {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(e) => {
            warn!(room = %token, error = %e, "media upload failed");
            failure_response(e)
        }
    }
}
