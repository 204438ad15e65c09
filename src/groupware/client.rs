//! HTTP client for the groupware's internal portal API
//!
//! Every call forwards the caller's identity verbatim as `X-Authentik-*`
//! trust headers; the groupware performs its own authorization against
//! them. Non-2xx answers and transport errors surface as
//! [`SanctumError::Remote`]; 2xx answers that fail entity validation
//! surface as [`SanctumError::WrongShape`]. There are no retries.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::groupware::models::{CalendarEvent, ChatMessage, ChatRoom, Guild, KanbanStack};
use crate::identity::Identity;
use crate::types::{Result, SanctumError};

/// The read operations the derived-state components consume. Split out as
/// a trait so the focus selector, notification aggregator and guild
/// directory can be exercised against a fake upstream in tests.
#[async_trait]
pub trait GroupwareApi: Send + Sync {
    async fn guilds(&self, identity: &Identity) -> Result<Vec<Guild>>;
    async fn chat_rooms(&self, identity: &Identity) -> Result<Vec<ChatRoom>>;
    async fn chat_messages(
        &self,
        identity: &Identity,
        token: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>>;
    async fn calendar_events(
        &self,
        identity: &Identity,
        calendar_uri: &str,
    ) -> Result<Vec<CalendarEvent>>;
    async fn kanban_stacks(&self, identity: &Identity, board_id: i64) -> Result<Vec<KanbanStack>>;
}

/// Client for the groupware portal API.
pub struct GroupwareClient {
    http: reqwest::Client,
    base_url: String,
    api_prefix: String,
    host_header: Option<String>,
    upload_timeout: Duration,
    avatar_timeout: Duration,
}

/// The guild list arrives wrapped in an envelope.
#[derive(Deserialize)]
struct GuildsEnvelope {
    #[serde(default)]
    guilds: Vec<Guild>,
}

/// So do kanban stacks.
#[derive(Deserialize)]
struct StacksEnvelope {
    #[serde(default)]
    stacks: Vec<KanbanStack>,
}

impl GroupwareClient {
    pub fn new(args: &Args) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.request_timeout_ms))
            .user_agent(concat!("sanctum/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: args.groupware_url.trim_end_matches('/').to_string(),
            api_prefix: args.groupware_api_prefix.trim_end_matches('/').to_string(),
            host_header: args.groupware_host.clone(),
            upload_timeout: Duration::from_millis(args.upload_timeout_ms),
            avatar_timeout: Duration::from_millis(args.avatar_timeout_ms),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    fn request(&self, method: Method, path: &str, identity: &Identity) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("Accept", "application/json")
            .header("X-Authentik-Username", &identity.username)
            .header("X-Authentik-Groups", identity.groups_header())
            .header("X-Authentik-Name", &identity.display_name);
        if let Some(ref host) = self.host_header {
            builder = builder.header("Host", host);
        }
        builder
    }

    /// Execute and return the raw success body, mapping non-2xx to
    /// `Remote` with the upstream status and a bounded body excerpt.
    async fn execute(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let mut excerpt = body;
            excerpt.truncate(200);
            return Err(SanctumError::remote_status(status.as_u16(), excerpt));
        }
        Ok(body)
    }

    /// GET a validated entity.
    async fn get_json<T: DeserializeOwned>(&self, identity: &Identity, path: &str) -> Result<T> {
        debug!(path = %path, "groupware GET");
        let body = self
            .execute(self.request(Method::GET, path, identity))
            .await?;
        serde_json::from_str(&body)
            .map_err(|e| SanctumError::WrongShape(format!("{}: {}", path, e)))
    }

    /// The groupware habitually answers writes with an empty body; treat
    /// anything unparseable on a 2xx as a bare success marker.
    fn lenient_json(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "success": true }))
    }

    /// Write with an optional JSON body; the upstream's JSON answer is
    /// passed through untyped.
    async fn write(
        &self,
        method: Method,
        identity: &Identity,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        debug!(method = %method, path = %path, "groupware write");
        let mut builder = self.request(method, path, identity);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let text = self.execute(builder).await?;
        Ok(Self::lenient_json(&text))
    }

    // ------------------------------------------------------------------
    // Guilds
    // ------------------------------------------------------------------

    pub async fn list_guilds(&self, identity: &Identity) -> Result<Vec<Guild>> {
        let envelope: GuildsEnvelope = self.get_json(identity, "/guilds").await?;
        Ok(envelope.guilds)
    }

    pub async fn create_guild(&self, identity: &Identity, body: &Value) -> Result<Value> {
        self.write(Method::POST, identity, "/guilds", Some(body)).await
    }

    pub async fn update_guild(&self, identity: &Identity, id: &str, body: &Value) -> Result<Value> {
        self.write(
            Method::PUT,
            identity,
            &format!("/guilds/{}", urlencoding::encode(id)),
            Some(body),
        )
        .await
    }

    pub async fn join_guild(&self, identity: &Identity, id: &str) -> Result<Value> {
        self.membership_action(identity, id, "join").await
    }

    pub async fn apply_to_guild(&self, identity: &Identity, id: &str) -> Result<Value> {
        self.membership_action(identity, id, "apply").await
    }

    pub async fn leave_guild(&self, identity: &Identity, id: &str) -> Result<Value> {
        self.membership_action(identity, id, "leave").await
    }

    async fn membership_action(
        &self,
        identity: &Identity,
        id: &str,
        action: &str,
    ) -> Result<Value> {
        self.write(
            Method::POST,
            identity,
            &format!("/guilds/{}/{}", urlencoding::encode(id), action),
            None,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Chat (pulse)
    // ------------------------------------------------------------------

    pub async fn get_chat_rooms(&self, identity: &Identity) -> Result<Vec<ChatRoom>> {
        self.get_json(identity, "/talk/rooms").await
    }

    pub async fn get_chat_messages(
        &self,
        identity: &Identity,
        token: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>> {
        self.get_json(
            identity,
            &format!(
                "/talk/rooms/{}/messages?limit={}",
                urlencoding::encode(token),
                limit
            ),
        )
        .await
    }

    pub async fn send_chat_message(
        &self,
        identity: &Identity,
        token: &str,
        message: &str,
    ) -> Result<Value> {
        self.write(
            Method::POST,
            identity,
            &format!("/talk/rooms/{}/messages", urlencoding::encode(token)),
            Some(&serde_json::json!({ "message": message })),
        )
        .await
    }

    /// Forward a browser-supplied multipart payload to the room's media
    /// endpoint. The body streams through verbatim; only the bounded
    /// upload timeout differs from ordinary writes.
    pub async fn upload_chat_media(
        &self,
        identity: &Identity,
        token: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<Value> {
        let path = format!("/talk/rooms/{}/media", urlencoding::encode(token));
        let builder = self
            .request(Method::POST, &path, identity)
            .header("Content-Type", content_type)
            .timeout(self.upload_timeout)
            .body(body);
        let text = self.execute(builder).await?;
        Ok(Self::lenient_json(&text))
    }

    // ------------------------------------------------------------------
    // Calendar (rites)
    // ------------------------------------------------------------------

    pub async fn get_calendar_events(
        &self,
        identity: &Identity,
        calendar_uri: &str,
    ) -> Result<Vec<CalendarEvent>> {
        self.get_json(
            identity,
            &format!("/calendar/{}/events", urlencoding::encode(calendar_uri)),
        )
        .await
    }

    pub async fn create_calendar_event(
        &self,
        identity: &Identity,
        calendar_uri: &str,
        body: &Value,
    ) -> Result<Value> {
        self.write(
            Method::POST,
            identity,
            &format!("/calendar/{}/events", urlencoding::encode(calendar_uri)),
            Some(body),
        )
        .await
    }

    pub async fn update_calendar_event(
        &self,
        identity: &Identity,
        calendar_uri: &str,
        event_uid: &str,
        body: &Value,
    ) -> Result<Value> {
        self.write(
            Method::PUT,
            identity,
            &format!(
                "/calendar/{}/events/{}",
                urlencoding::encode(calendar_uri),
                urlencoding::encode(event_uid)
            ),
            Some(body),
        )
        .await
    }

    pub async fn delete_calendar_event(
        &self,
        identity: &Identity,
        calendar_uri: &str,
        event_uid: &str,
    ) -> Result<Value> {
        self.write(
            Method::DELETE,
            identity,
            &format!(
                "/calendar/{}/events/{}",
                urlencoding::encode(calendar_uri),
                urlencoding::encode(event_uid)
            ),
            None,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Kanban (quests)
    // ------------------------------------------------------------------

    pub async fn get_kanban_stacks(
        &self,
        identity: &Identity,
        board_id: i64,
    ) -> Result<Vec<KanbanStack>> {
        let envelope: StacksEnvelope = self
            .get_json(identity, &format!("/deck/{}/stacks", board_id))
            .await?;
        Ok(envelope.stacks)
    }

    pub async fn create_kanban_card(
        &self,
        identity: &Identity,
        board_id: i64,
        stack_id: i64,
        title: &str,
        description: &str,
    ) -> Result<Value> {
        self.write(
            Method::POST,
            identity,
            &format!("/deck/{}/stacks/{}/cards", board_id, stack_id),
            Some(&serde_json::json!({ "title": title, "description": description })),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Files (archive)
    // ------------------------------------------------------------------

    pub async fn list_files(&self, identity: &Identity, folder_id: i64) -> Result<Value> {
        self.get_json(identity, &format!("/files/{}", folder_id)).await
    }

    pub async fn upload_file(
        &self,
        identity: &Identity,
        folder_id: i64,
        content_type: &str,
        body: Bytes,
    ) -> Result<Value> {
        let path = format!("/files/{}/upload", folder_id);
        let builder = self
            .request(Method::POST, &path, identity)
            .header("Content-Type", content_type)
            .timeout(self.upload_timeout)
            .body(body);
        let text = self.execute(builder).await?;
        Ok(Self::lenient_json(&text))
    }

    pub async fn create_folder(
        &self,
        identity: &Identity,
        folder_id: i64,
        name: &str,
    ) -> Result<Value> {
        self.write(
            Method::POST,
            identity,
            &format!("/files/{}/folder", folder_id),
            Some(&serde_json::json!({ "name": name })),
        )
        .await
    }

    pub async fn delete_file(&self, identity: &Identity, file_id: i64) -> Result<Value> {
        self.write(Method::DELETE, identity, &format!("/files/{}", file_id), None)
            .await
    }

    // ------------------------------------------------------------------
    // Forms (scrolls)
    // ------------------------------------------------------------------

    pub async fn list_forms(&self, identity: &Identity) -> Result<Value> {
        self.get_json(identity, "/forms").await
    }

    pub async fn list_shared_forms(&self, identity: &Identity) -> Result<Value> {
        self.get_json(identity, "/forms/shared").await
    }

    pub async fn create_form(&self, identity: &Identity, body: &Value) -> Result<Value> {
        self.write(Method::POST, identity, "/forms", Some(body)).await
    }

    // ------------------------------------------------------------------
    // Avatars
    // ------------------------------------------------------------------

    /// Fetch a user's avatar image. Returns the raw bytes and the
    /// upstream content type.
    pub async fn get_avatar(
        &self,
        identity: &Identity,
        username: &str,
        size: u32,
    ) -> Result<(Bytes, Option<String>)> {
        let path = format!("/avatar/{}/{}", urlencoding::encode(username), size);
        let builder = self
            .request(Method::GET, &path, identity)
            .timeout(self.avatar_timeout);

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SanctumError::remote_status(
                status.as_u16(),
                format!("avatar fetch failed for {}", username),
            ));
        }
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?;
        Ok((bytes, content_type))
    }
}

#[async_trait]
impl GroupwareApi for GroupwareClient {
    async fn guilds(&self, identity: &Identity) -> Result<Vec<Guild>> {
        self.list_guilds(identity).await
    }

    async fn chat_rooms(&self, identity: &Identity) -> Result<Vec<ChatRoom>> {
        self.get_chat_rooms(identity).await
    }

    async fn chat_messages(
        &self,
        identity: &Identity,
        token: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>> {
        self.get_chat_messages(identity, token, limit).await
    }

    async fn calendar_events(
        &self,
        identity: &Identity,
        calendar_uri: &str,
    ) -> Result<Vec<CalendarEvent>> {
        self.get_calendar_events(identity, calendar_uri).await
    }

    async fn kanban_stacks(&self, identity: &Identity, board_id: i64) -> Result<Vec<KanbanStack>> {
        self.get_kanban_stacks(identity, board_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn client() -> GroupwareClient {
        let args = Args::parse_from([
            "sanctum",
            "--groupware-url",
            "http://groupware:80/",
            "--groupware-api-prefix",
            "/apps/sanctum/api",
        ]);
        GroupwareClient::new(&args)
    }

    #[test]
    fn test_url_joins_prefix() {
        let c = client();
        assert_eq!(
            c.url("/guilds"),
            "http://groupware:80/apps/sanctum/api/guilds"
        );
    }

    #[test]
    fn test_guilds_envelope_unwraps() {
        let envelope: GuildsEnvelope =
            serde_json::from_str(r#"{"guilds":[{"id":"g1","name":"Stonewrights"}]}"#).unwrap();
        assert_eq!(envelope.guilds.len(), 1);

        let empty: GuildsEnvelope = serde_json::from_str(r#"{}"#).unwrap();
        assert!(empty.guilds.is_empty());
    }

    #[test]
    fn test_stacks_envelope_unwraps() {
        let envelope: StacksEnvelope = serde_json::from_str(
            r#"{"stacks":[{"id":1,"title":"Backlog","order":0,"cards":[]}]}"#,
        )
        .unwrap();
        assert_eq!(envelope.stacks[0].title, "Backlog");
    }
}
