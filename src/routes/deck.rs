//! Kanban (quests) endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::identity::Identity;
use crate::routes::{
    collect_json, error_response, failure_response, json_response, unauthorized_response,
};
use crate::server::AppState;

/// Handle GET /deck/{boardId}/stacks
pub async fn handle_get_stacks(
    state: Arc<AppState>,
    identity: Option<Identity>,
    board_id: i64,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.get_kanban_stacks(&identity, board_id).await {
        Ok(stacks) => json_response(StatusCode::OK, stacks),
        Err(e) => {
            warn!(board = board_id, error = %e, "stack fetch failed");
            failure_response(e)
        }
    }
}

/// Handle POST /deck/{boardId}/stacks/{stackId}/cards
pub async fn handle_create_card(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    board_id: i64,
    stack_id: i64,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let body = match collect_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let title = body.get("title").and_then(|t| t.as_str()).unwrap_or("");
    if title.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Title is required");
    }
    let description = body
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or("");

    match state
        .groupware
        .create_kanban_card(&identity, board_id, stack_id, title, description)
        .await
    {
        Ok(created) => json_response(StatusCode::OK, created),
        Err(e) => {
            warn!(board = board_id, stack = stack_id, error = %e, "card creation failed");
            failure_response(e)
        }
    }
}
