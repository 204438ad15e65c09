//! Forms (scrolls) endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::identity::Identity;
use crate::routes::{collect_json, failure_response, json_response, unauthorized_response};
use crate::server::AppState;

/// Handle GET /forms — forms the caller owns.
pub async fn handle_list_forms(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.list_forms(&identity).await {
        Ok(forms) => json_response(StatusCode::OK, forms),
        Err(e) => {
            warn!(error = %e, "forms fetch failed");
            failure_response(e)
        }
    }
}

/// Handle GET /forms/shared — forms shared with the caller.
pub async fn handle_shared_forms(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.groupware.list_shared_forms(&identity).await {
        Ok(forms) => json_response(StatusCode::OK, forms),
        Err(e) => {
            warn!(error = %e, "shared forms fetch failed");
            failure_response(e)
        }
    }
}

/// Handle POST /forms — create a form.
pub async fn handle_create_form(
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

    match state.groupware.create_form(&identity, &body).await {
        Ok(created) => json_response(StatusCode::OK, created),
        Err(e) => {
            warn!(error = %e, "form creation failed");
            failure_response(e)
        }
    }
}
