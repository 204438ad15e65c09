//! Entity models for the groupware wire shapes
//!
//! Field names mirror the JSON the groupware emits (camelCase). Anything
//! the upstream may omit gets a default so a sparse record still parses;
//! a record missing its identity fields is rejected by serde and surfaces
//! as a wrong-shape remote failure.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a guild admits new members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Admission {
    #[default]
    Open,
    Closed,
    /// Every authenticated user is implicitly a member, regardless of the
    /// stored member list. Enforced at read time by the guild directory.
    Mandatory,
}

/// A named community. The groupware owns the canonical record; Sanctum
/// only reads it and forwards membership actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub admission: Admission,
    #[serde(default)]
    pub seeder_uid: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub pending: Vec<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub circle_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_form: Option<ApplicationForm>,
    #[serde(default)]
    pub resources: GuildResources,
}

/// Agreements an applicant must accept for closed guilds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationForm {
    #[serde(default)]
    pub agreements: Vec<Agreement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: i64,
    pub text: String,
}

/// Identifiers of the groupware resources linked to a guild. All optional;
/// a missing identifier means the guild has no such chamber.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildResources {
    #[serde(default)]
    pub talk_room: Option<String>,
    #[serde(default)]
    pub calendar_uri: Option<String>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub folder_name: Option<String>,
    #[serde(default)]
    pub deck_board_id: Option<i64>,
}

/// A chat room as listed by the groupware, with per-account unread state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub room_type: i64,
    #[serde(default)]
    pub unread_messages: u32,
    #[serde(default)]
    pub unread_mention: bool,
    #[serde(default)]
    pub last_activity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    #[serde(default)]
    pub actor_type: String,
    #[serde(default)]
    pub actor_id: String,
    #[serde(default)]
    pub actor_display_name: String,
    /// Unix timestamp, seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDescriptor>,
}

impl ChatMessage {
    /// Only `comment` messages from real users count toward pulse activity.
    pub fn is_user_comment(&self) -> bool {
        self.message_type == "comment" && self.actor_type == "users"
    }

    /// Messages the portal surfaces at all: user/bot comments and shared
    /// files. System messages are filtered before display or counting.
    pub fn is_displayable(&self) -> bool {
        (self.message_type == "comment"
            && (self.actor_type == "users" || self.actor_type == "bots"))
            || self.message_type == "file_shared"
    }

    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp, 0).unwrap_or_else(|| DateTime::UNIX_EPOCH)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub size: i64,
}

/// A calendar event. Recurrence expansion happens in the groupware's
/// calendar service; Sanctum sees already-expanded instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    /// Start timestamp as the upstream emitted it (RFC 3339, or a naive
    /// local stamp for all-day events). Use [`CalendarEvent::start_time`].
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<EventLink>,
}

impl CalendarEvent {
    /// Parse the start stamp. Unparseable starts never match a time window.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        parse_upstream_time(&self.start)
    }
}

/// A related-chamber link attached to an event (meeting room, archive
/// folder, scroll, pulse room).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLink {
    #[serde(rename = "type")]
    pub link_type: String,
    pub label: String,
    pub url: String,
}

/// An ordered column on a guild's kanban board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanStack {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub cards: Vec<KanbanCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanCard {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub duedate: Option<String>,
    #[serde(default)]
    pub assigned_users: Vec<String>,
    #[serde(default)]
    pub labels: Vec<KanbanLabel>,
    #[serde(default)]
    pub comments_count: u32,
}

impl KanbanCard {
    pub fn due_time(&self) -> Option<DateTime<Utc>> {
        self.duedate.as_deref().and_then(parse_upstream_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanLabel {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub color: String,
}

/// Parse the timestamp formats the groupware emits: RFC 3339 with offset,
/// a naive datetime (treated as UTC), or a bare date.
fn parse_upstream_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_parses_sparse_record() {
        let guild: Guild = serde_json::from_str(r#"{"id":"g1","name":"Stonewrights"}"#).unwrap();
        assert_eq!(guild.admission, Admission::Open);
        assert!(guild.members.is_empty());
        assert!(guild.resources.talk_room.is_none());
    }

    #[test]
    fn test_guild_missing_id_is_rejected() {
        assert!(serde_json::from_str::<Guild>(r#"{"name":"Nameless"}"#).is_err());
    }

    #[test]
    fn test_admission_wire_values() {
        let guild: Guild =
            serde_json::from_str(r#"{"id":"g","name":"n","admission":"mandatory"}"#).unwrap();
        assert_eq!(guild.admission, Admission::Mandatory);
    }

    #[test]
    fn test_resources_camel_case() {
        let res: GuildResources = serde_json::from_str(
            r#"{"talkRoom":"tok","calendarUri":"cal-1","deckBoardId":7}"#,
        )
        .unwrap();
        assert_eq!(res.talk_room.as_deref(), Some("tok"));
        assert_eq!(res.deck_board_id, Some(7));
        assert!(res.folder_id.is_none());
    }

    #[test]
    fn test_user_comment_filter() {
        let msg = ChatMessage {
            id: 1,
            actor_type: "users".into(),
            actor_id: "mira".into(),
            actor_display_name: "Mira".into(),
            timestamp: 1_700_000_000,
            message: "hello".into(),
            message_type: "comment".into(),
            file: None,
        };
        assert!(msg.is_user_comment());

        let system = ChatMessage {
            message_type: "system".into(),
            ..msg.clone()
        };
        assert!(!system.is_user_comment());
        assert!(!system.is_displayable());

        let bot = ChatMessage {
            actor_type: "bots".into(),
            ..msg
        };
        assert!(!bot.is_user_comment());
        assert!(bot.is_displayable());
    }

    #[test]
    fn test_event_start_time_formats() {
        let mut event = CalendarEvent {
            uid: "e1".into(),
            title: "Moot".into(),
            start: "2026-03-04T19:30:00+00:00".into(),
            end: None,
            all_day: None,
            location: None,
            description: None,
            recurrence: None,
            status: None,
            categories: None,
            links: Vec::new(),
        };
        assert!(event.start_time().is_some());

        event.start = "2026-03-04T19:30:00".into();
        assert!(event.start_time().is_some());

        event.start = "2026-03-04".into();
        assert!(event.start_time().is_some());

        event.start = "next tuesday".into();
        assert!(event.start_time().is_none());
    }

    #[test]
    fn test_card_due_time() {
        let card: KanbanCard = serde_json::from_str(
            r#"{"id":3,"title":"Forge the Banner","duedate":"2026-01-05T12:00:00+00:00","assignedUsers":["mira"]}"#,
        )
        .unwrap();
        assert!(card.due_time().is_some());
        assert_eq!(card.assigned_users, vec!["mira"]);
    }
}
