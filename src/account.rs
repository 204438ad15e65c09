//! Account-management service client
//!
//! A separate service owns account lifecycle (deletion, invites). Sanctum
//! forwards the caller's username as the trust header and passes the
//! answers through untyped.

use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::identity::Identity;
use crate::types::{Result, SanctumError};

pub struct AccountClient {
    http: reqwest::Client,
    base_url: String,
}

impl AccountClient {
    pub fn new(args: &Args) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.request_timeout_ms))
            .user_agent(concat!("sanctum/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: args.account_api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        identity: &Identity,
        body: Option<&Value>,
    ) -> Result<Value> {
        debug!(method = %method, path = %path, "account service call");
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header("X-Authentik-Username", &identity.username);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let mut excerpt = text;
            excerpt.truncate(200);
            return Err(SanctumError::remote_status(status.as_u16(), excerpt));
        }
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({})))
    }

    /// Forward an account-deletion request, keyed by username.
    pub async fn delete_account(&self, identity: &Identity, body: &Value) -> Result<Value> {
        self.call(Method::DELETE, "/api/account/delete", identity, Some(body))
            .await
    }

    /// The caller's personal invite link.
    pub async fn invite_link(&self, identity: &Identity) -> Result<Value> {
        self.call(Method::GET, "/api/invite/link", identity, None).await
    }

    /// Users the caller has referred.
    pub async fn referrals(&self, identity: &Identity) -> Result<Value> {
        self.call(Method::GET, "/api/invite/referrals", identity, None)
            .await
    }
}
