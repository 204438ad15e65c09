//! Guild endpoints
//!
//! Listing and lookup go through the guild directory; membership actions
//! and edits forward 1:1 to the groupware. The focus and notification
//! endpoints expose the derived view-state computed per request.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::focus;
use crate::guilds;
use crate::identity::Identity;
use crate::notifications;
use crate::routes::{
    collect_json, error_response, failure_response, json_response, unauthorized_response,
};
use crate::server::AppState;

/// Handle GET /guilds — the full guild list visible to the deployment.
pub async fn handle_list_guilds(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.list_guilds(&identity).await {
        Ok(guilds) => json_response(StatusCode::OK, guilds),
        Err(e) => {
            warn!(error = %e, "guild list forward failed");
            failure_response(e)
        }
    }
}

/// Handle GET /guilds/mine — the caller's guilds, mandatory ones included.
pub async fn handle_my_guilds(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let mine = guilds::list_user_guilds(&state.groupware, &identity).await;
    json_response(StatusCode::OK, mine)
}

/// Handle POST /guilds — create a guild.
pub async fn handle_create_guild(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
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
        return error_response(StatusCode::BAD_REQUEST, "Guild name required");
    }

    match state.groupware.create_guild(&identity, &body).await {
        Ok(created) => json_response(StatusCode::OK, created),
        Err(e) => {
            warn!(error = %e, "guild creation failed");
            failure_response(e)
        }
    }
}

/// Handle GET /guilds/{id}
pub async fn handle_get_guild(
    state: Arc<AppState>,
    identity: Option<Identity>,
    guild_id: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match guilds::get(&state.groupware, &identity, guild_id).await {
        Some(guild) => json_response(StatusCode::OK, guild),
        None => error_response(StatusCode::NOT_FOUND, "Guild not found"),
    }
}

/// Handle POST /guilds/{id}?action=join|apply|leave
pub async fn handle_guild_action(
    state: Arc<AppState>,
    identity: Option<Identity>,
    guild_id: &str,
    params: &HashMap<String, String>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let result = match params.get("action").map(String::as_str) {
        Some("join") => state.groupware.join_guild(&identity, guild_id).await,
        Some("apply") => state.groupware.apply_to_guild(&identity, guild_id).await,
        Some("leave") => state.groupware.leave_guild(&identity, guild_id).await,
        Some(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid action"),
        None => return error_response(StatusCode::BAD_REQUEST, "Action required"),
    };

    match result {
        Ok(answer) => json_response(StatusCode::OK, answer),
        Err(e) => {
            warn!(guild = %guild_id, error = %e, "guild action failed");
            failure_response(e)
        }
    }
}

/// Handle PUT /guilds/{id}
pub async fn handle_update_guild(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    guild_id: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let body = match collect_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state.groupware.update_guild(&identity, guild_id, &body).await {
        Ok(updated) => json_response(StatusCode::OK, updated),
        Err(e) => {
            warn!(guild = %guild_id, error = %e, "guild update failed");
            failure_response(e)
        }
    }
}

/// Handle GET /guilds/{id}/focus — the landing-view focus card.
pub async fn handle_guild_focus(
    state: Arc<AppState>,
    identity: Option<Identity>,
    guild_id: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let Some(guild) = guilds::get(&state.groupware, &identity, guild_id).await else {
        return error_response(StatusCode::NOT_FOUND, "Guild not found");
    };

    let focus = focus::determine_focus(&state.groupware, &identity, &guild).await;
    json_response(StatusCode::OK, focus)
}

/// Handle GET /guilds/{id}/notifications — chamber badge counts.
pub async fn handle_guild_notifications(
    state: Arc<AppState>,
    identity: Option<Identity>,
    guild_id: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let Some(guild) = guilds::get(&state.groupware, &identity, guild_id).await else {
        return error_response(StatusCode::NOT_FOUND, "Guild not found");
    };

    let counts = notifications::chamber_notifications(&state.groupware, &identity, &guild).await;
    json_response(StatusCode::OK, counts)
}
