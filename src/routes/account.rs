//! Account-service endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::identity::Identity;
use crate::routes::{collect_json, failure_response, json_response, unauthorized_response};
use crate::server::AppState;

/// Handle DELETE /account — forward the deletion request, keyed by
/// username, to the account-management service.
pub async fn handle_delete_account(
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

    match state.account.delete_account(&identity, &body).await {
        Ok(answer) => json_response(StatusCode::OK, answer),
        Err(e) => {
            warn!(user = %identity.username, error = %e, "account deletion failed");
            failure_response(e)
        }
    }
}

/// Handle GET /invite — the caller's invite link.
pub async fn handle_invite_link(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.account.invite_link(&identity).await {
        Ok(link) => json_response(StatusCode::OK, link),
        Err(e) => {
            warn!(user = %identity.username, error = %e, "invite link fetch failed");
            failure_response(e)
        }
    }
}

/// Handle GET /invite/referrals — referral listing. Degrades to an empty
/// listing when the account service is unreachable; the settings page
/// renders the section either way.
pub async fn handle_referrals(
    state: Arc<AppState>,
    identity: Option<Identity>,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    match state.account.referrals(&identity).await {
        Ok(referrals) => json_response(StatusCode::OK, referrals),
        Err(e) => {
            warn!(user = %identity.username, error = %e, "referral fetch failed, serving empty");
            json_response(
                StatusCode::OK,
                serde_json::json!({ "referrals": [], "count": 0 }),
            )
        }
    }
}
