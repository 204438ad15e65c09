//! Avatar proxy
//!
//! Serves user avatars from the groupware. Successful fetches are
//! browser-cacheable for an hour; failures fall back to a transparent
//! placeholder pixel with a short cache so a recovering upstream shows
//! through quickly.

use base64::Engine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

use crate::identity::Identity;
use crate::routes::{error_response, unauthorized_response};
use crate::server::AppState;

/// A 1x1 transparent PNG.
const PLACEHOLDER_PIXEL_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPj/HwADBwIAMCbHYQAAAABJRU5ErkJggg==";

const MAX_AVATAR_SIZE: u32 = 512;

/// Handle GET /avatar/{username}/{size}
pub async fn handle_avatar(
    state: Arc<AppState>,
    identity: Option<Identity>,
    username: &str,
    size_raw: &str,
) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    let size = match size_raw.parse::<u32>() {
        Ok(s) if (1..=MAX_AVATAR_SIZE).contains(&s) => s,
        _ => return error_response(StatusCode::BAD_REQUEST, "Invalid parameters"),
    };
    if username.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid parameters");
    }

    match state.groupware.get_avatar(&identity, username, size).await {
        Ok((bytes, content_type)) => Response::builder()
            .status(StatusCode::OK)
            .header(
                "Content-Type",
                content_type.as_deref().unwrap_or("image/png"),
            )
            .header(
                "Cache-Control",
                "public, max-age=3600, stale-while-revalidate=86400",
            )
            .body(Full::new(bytes))
            .unwrap(),
        Err(e) => {
            debug!(user = %username, error = %e, "avatar fetch failed, serving placeholder");
            placeholder_response()
        }
    }
}

fn placeholder_response() -> Response<Full<Bytes>> {
    let pixel = base64::engine::general_purpose::STANDARD
        .decode(PLACEHOLDER_PIXEL_B64)
        .unwrap_or_default();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "image/png")
        .header("Cache-Control", "public, max-age=300")
        .body(Full::new(Bytes::from(pixel)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_valid_png() {
        let resp = placeholder_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let pixel = base64::engine::general_purpose::STANDARD
            .decode(PLACEHOLDER_PIXEL_B64)
            .unwrap();
        // PNG signature
        assert_eq!(&pixel[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
