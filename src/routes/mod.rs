//! HTTP routes for Sanctum

pub mod account;
pub mod avatar;
pub mod calendar;
pub mod deck;
pub mod files;
pub mod forms;
pub mod guilds;
pub mod health;
pub mod talk;
pub mod userinfo;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;

use crate::types::SanctumError;

/// Collect the request body, answering 400 on a broken stream.
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, Response<Full<Bytes>>> {
    match req.into_body().collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => Err(error_response(
            StatusCode::BAD_REQUEST,
            &format!("Failed to read request body: {}", e),
        )),
    }
}

/// Collect and parse a JSON request body.
pub async fn collect_json(
    req: Request<Incoming>,
) -> Result<serde_json::Value, Response<Full<Bytes>>> {
    let body = collect_body(req).await?;
    serde_json::from_slice(&body).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {}", e))
    })
}

/// Build a JSON response from any serializable value.
pub fn json_response(status: StatusCode, data: impl Serialize) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(&data)
        .unwrap_or_else(|_| br#"{"error":"Serialization failed"}"#.to_vec());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
                .unwrap()
        })
}

/// Build a `{"error": ...}` response.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, serde_json::json!({ "error": message }))
}

/// Uniform 401 for requests missing the identity headers.
pub fn unauthorized_response() -> Response<Full<Bytes>> {
    error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
}

/// Map a boundary error onto the wire: upstream statuses propagate,
/// everything else keeps its taxonomy status.
pub fn failure_response(err: SanctumError) -> Response<Full<Bytes>> {
    let (status, body) = err.into_status_code_and_body();
    error_response(status, &body)
}

/// Parse a query string into a key-value map.
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    if query.is_empty() {
        return HashMap::new();
    }

    query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
