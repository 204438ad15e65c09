//! Identity summary endpoint

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::identity::Identity;
use crate::routes::{json_response, unauthorized_response};

/// Handle GET /userinfo — echo the proxy-asserted identity back to the
/// browser, with the avatar URL this portal serves.
pub fn handle_userinfo(identity: Option<Identity>) -> Response<Full<Bytes>> {
    let Some(identity) = identity else {
        return unauthorized_response();
    };

    json_response(
        StatusCode::OK,
        serde_json::json!({
            "username": identity.username,
            "name": identity.display_name,
            "email": identity.email,
            "groups": identity.groups,
            "avatar": identity.avatar_url(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_identity_is_401() {
        assert_eq!(handle_userinfo(None).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_identity_echoed() {
        let identity = Identity {
            username: "mira".into(),
            groups: vec!["elders".into()],
            display_name: "Mira Stone".into(),
            email: "mira@example.org".into(),
        };
        let resp = handle_userinfo(Some(identity));
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
