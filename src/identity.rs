//! Request identity
//!
//! The reverse proxy in front of Sanctum authenticates users and injects
//! `X-Authentik-*` headers. Sanctum trusts those headers and passes the
//! identity around explicitly; no function reads ambient request state.

use hyper::HeaderMap;
use serde::Serialize;

/// The identity asserted by the upstream proxy for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub username: String,
    pub groups: Vec<String>,
    #[serde(rename = "name")]
    pub display_name: String,
    pub email: String,
}

impl Identity {
    /// Parse the identity headers. Returns `None` when the username header
    /// is absent, which every handler treats as unauthenticated.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let username = header_str(headers, "x-authentik-username")?;
        if username.is_empty() {
            return None;
        }

        let groups = header_str(headers, "x-authentik-groups")
            .unwrap_or_default()
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        let display_name =
            header_str(headers, "x-authentik-name").unwrap_or_else(|| username.clone());
        let email = header_str(headers, "x-authentik-email").unwrap_or_default();

        Some(Self {
            username,
            groups,
            display_name,
            email,
        })
    }

    /// Comma-joined group list, as forwarded to the groupware.
    pub fn groups_header(&self) -> String {
        self.groups.join(",")
    }

    /// Portal administrators.
    pub fn is_grandmaster(&self) -> bool {
        self.groups.iter().any(|g| {
            let g = g.to_lowercase();
            g.contains("grandmaster") || g.contains("admin")
        })
    }

    /// Senior members with moderation privileges.
    pub fn is_elder(&self) -> bool {
        self.groups
            .iter()
            .any(|g| g.to_lowercase().contains("elder"))
    }

    /// The avatar URL this portal serves for a user.
    pub fn avatar_url(&self) -> String {
        format!("/avatar/{}/64", self.username)
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                name.parse::<HeaderName>().unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_missing_username_is_unauthenticated() {
        let map = headers(&[("x-authentik-name", "Somebody")]);
        assert!(Identity::from_headers(&map).is_none());
    }

    #[test]
    fn test_full_identity_parsed() {
        let map = headers(&[
            ("x-authentik-username", "mira"),
            ("x-authentik-groups", "elders, masons"),
            ("x-authentik-name", "Mira Stone"),
            ("x-authentik-email", "mira@example.org"),
        ]);
        let id = Identity::from_headers(&map).unwrap();
        assert_eq!(id.username, "mira");
        assert_eq!(id.groups, vec!["elders", "masons"]);
        assert_eq!(id.display_name, "Mira Stone");
        assert_eq!(id.groups_header(), "elders,masons");
        assert!(id.is_elder());
        assert!(!id.is_grandmaster());
    }

    #[test]
    fn test_display_name_defaults_to_username() {
        let map = headers(&[("x-authentik-username", "mira")]);
        let id = Identity::from_headers(&map).unwrap();
        assert_eq!(id.display_name, "mira");
        assert!(id.groups.is_empty());
    }

    #[test]
    fn test_grandmaster_matches_admin_group() {
        let map = headers(&[
            ("x-authentik-username", "root"),
            ("x-authentik-groups", "Portal-Admins"),
        ]);
        assert!(Identity::from_headers(&map).unwrap().is_grandmaster());
    }
}
