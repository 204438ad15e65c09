//! Calendar (rites) endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::identity::Identity;
use crate::routes::{collect_json, failure_response, json_response, unauthorized_response};
use crate::server::AppState;

/// Handle GET /calendar/{calendarId}/events
pub async fn handle_list_events(
    state: Arc<AppState>,
    identity: Option<Identity>,
    calendar_uri: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.get_calendar_events(&identity, calendar_uri).await {
        Ok(events) => json_response(StatusCode::OK, events),
        Err(e) => {
            warn!(calendar = %calendar_uri, error = %e, "event fetch failed");
            failure_response(e)
        }
    }
}

/// Handle POST /calendar/{calendarId}/events
pub async fn handle_create_event(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    calendar_uri: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let body = match collect_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state
        .groupware
        .create_calendar_event(&identity, calendar_uri, &body)
        .await
    {
        Ok(created) => json_response(StatusCode::OK, created),
        Err(e) => {
            warn!(calendar = %calendar_uri, error = %e, "event creation failed");
            failure_response(e)
        }
    }
}

/// Handle PUT /calendar/{calendarId}/events/{eventUid}
pub async fn handle_update_event(
    req: Request<Incoming>,
    state: Arc<AppState>,
    identity: Option<Identity>,
    calendar_uri: &str,
    event_uid: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let body = match collect_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state
        .groupware
        .update_calendar_event(&identity, calendar_uri, event_uid, &body)
        .await
    {
        Ok(updated) => json_response(StatusCode::OK, updated),
        Err(e) => {
            warn!(calendar = %calendar_uri, event = %event_uid, error = %e, "event update failed");
            failure_response(e)
        }
    }
}

/// Handle DELETE /calendar/{calendarId}/events/{eventUid}
pub async fn handle_delete_event(
    state: Arc<AppState>,
    identity: Option<Identity>,
    calendar_uri: &str,
    event_uid: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state
        .groupware
        .delete_calendar_event(&identity, calendar_uri, event_uid)
        .await
    {
        Ok(deleted) => json_response(StatusCode::OK, deleted),
        Err(e) => {
            warn!(calendar = %calendar_uri, event = %event_uid, error = %e, "event deletion failed");
            failure_response(e)
        }
    }
}
