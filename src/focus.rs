//! Focus selection
//!
//! Picks the single "what deserves your attention right now" card for a
//! guild's landing view. A fixed priority cascade is evaluated top-down
//! and the first matching rule wins: urgency beats schedule beats backlog
//! beats ambient. The cascade is deliberately rule-based and
//! non-configurable so the landing experience stays predictable.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;
use tracing::warn;

use crate::groupware::models::{CalendarEvent, ChatMessage, Guild, KanbanStack};
use crate::groupware::GroupwareApi;
use crate::identity::Identity;

/// Messages newer than this many minutes qualify as "hot" pulse activity.
const HOT_PULSE_WINDOW_MINS: i64 = 30;
/// At least this many qualifying messages make the pulse hot.
const HOT_PULSE_MIN_MESSAGES: usize = 2;
/// Events starting within this many hours qualify as imminent rites.
const RITE_WINDOW_HOURS: i64 = 72;
/// Focus descriptions are clipped to this many characters.
const DESCRIPTION_LIMIT: usize = 80;
/// At most this many avatars decorate a focus card.
const MAX_AVATARS: usize = 4;

/// The focus card surfaced on a guild's landing view. Computed fresh per
/// request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Focus {
    Pulse {
        title: String,
        description: String,
        meta: String,
        avatars: Vec<String>,
        #[serde(rename = "recentMessage", skip_serializing_if = "Option::is_none")]
        recent_message: Option<ChatMessage>,
    },
    Rite {
        title: String,
        description: String,
        meta: String,
        avatars: Vec<String>,
        rite: CalendarEvent,
    },
    Quest {
        title: String,
        description: String,
        meta: String,
        avatars: Vec<String>,
        quest: QuestProgress,
    },
    /// Reserved for pending-form prompts. Defined in the model but never
    /// produced by the cascade.
    Scroll {
        title: String,
        description: String,
        meta: String,
        avatars: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestProgress {
    pub name: String,
    pub progress: usize,
    pub total: usize,
    pub remaining: usize,
}

/// Gather the guild's three signals concurrently and run the cascade.
/// A failed fetch degrades to an empty signal, never an aborted
/// selection.
pub async fn determine_focus(
    api: &dyn GroupwareApi,
    identity: &Identity,
    guild: &Guild,
) -> Focus {
    let messages = async {
        match guild.resources.talk_room.as_deref() {
            Some(token) => match api.chat_messages(identity, token, 5).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(guild = %guild.id, error = %e, "pulse fetch failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    };
    let events = async {
        match guild.resources.calendar_uri.as_deref() {
            Some(uri) => match api.calendar_events(identity, uri).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(guild = %guild.id, error = %e, "rites fetch failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    };
    let stacks = async {
        match guild.resources.deck_board_id {
            Some(board_id) => match api.kanban_stacks(identity, board_id).await {
                Ok(stacks) => stacks,
                Err(e) => {
                    warn!(guild = %guild.id, error = %e, "quests fetch failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    };

    let (messages, events, stacks) = futures::join!(messages, events, stacks);
    select_focus(guild, &messages, &events, &stacks, Utc::now())
}

/// The pure cascade. Deterministic for given inputs and `now`.
pub fn select_focus(
    guild: &Guild,
    messages: &[ChatMessage],
    events: &[CalendarEvent],
    stacks: &[KanbanStack],
    now: DateTime<Utc>,
) -> Focus {
    // Priority 1: hot pulse - a conversation happening right now
    let cutoff = now - Duration::minutes(HOT_PULSE_WINDOW_MINS);
    let recent: Vec<&ChatMessage> = messages
        .iter()
        .filter(|m| m.is_user_comment() && m.time() > cutoff)
        .collect();

    if recent.len() >= HOT_PULSE_MIN_MESSAGES {
        let mut actors: Vec<&str> = Vec::new();
        for message in &recent {
            if !actors.iter().any(|a| *a == message.actor_id) {
                actors.push(&message.actor_id);
            }
        }
        let latest = recent
            .iter()
            .max_by_key(|m| m.timestamp)
            .copied()
            .cloned();
        let description = latest
            .as_ref()
            .map(|m| truncate_chars(&m.message, DESCRIPTION_LIMIT))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "The circle stirs with whispers...".to_string());

        return Focus::Pulse {
            title: "The Pulse".to_string(),
            description,
            meta: format!("{} brothers in conversation", actors.len()),
            avatars: avatar_urls(actors.iter().copied()),
            recent_message: latest,
        };
    }

    // Priority 2: imminent rite within the next 72 hours
    let horizon = now + Duration::hours(RITE_WINDOW_HOURS);
    let upcoming = events
        .iter()
        .filter_map(|e| e.start_time().map(|start| (start, e)))
        .filter(|(start, _)| *start > now && *start < horizon)
        .min_by_key(|(start, _)| *start);

    if let Some((start, rite)) = upcoming {
        return Focus::Rite {
            title: rite.title.clone(),
            description: format!("The circle gathers {}", format_time_until(start, now)),
            meta: format_rite_date(start, now),
            avatars: avatar_urls(guild.members.iter().map(String::as_str)),
            rite: rite.clone(),
        };
    }

    // Priority 3: active quest with pending tasks
    if let Some(quest) = find_active_quest(stacks) {
        return Focus::Quest {
            title: quest.name.clone(),
            description: format!("{} tasks await completion", quest.remaining),
            meta: format!("{} of {} complete", quest.progress, quest.total),
            avatars: avatar_urls(quest.assignees.iter().map(String::as_str)),
            quest: QuestProgress {
                name: quest.name,
                progress: quest.progress,
                total: quest.total,
                remaining: quest.remaining,
            },
        };
    }

    // Priority 4 would be a pending scroll; the cascade does not produce
    // it yet (needs the forms signal).

    // Priority 5: default ambient pulse
    let last_message = messages
        .iter()
        .filter(|m| m.is_user_comment())
        .max_by_key(|m| m.timestamp)
        .cloned();
    let description = last_message
        .as_ref()
        .map(|m| truncate_chars(&m.message, DESCRIPTION_LIMIT))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "The circle awaits your presence...".to_string());

    Focus::Pulse {
        title: "The Pulse".to_string(),
        description,
        meta: format!("{} brothers in the cove", guild.member_count),
        avatars: avatar_urls(guild.members.iter().map(String::as_str)),
        recent_message: last_message,
    }
}

struct ActiveQuest {
    name: String,
    progress: usize,
    total: usize,
    remaining: usize,
    assignees: Vec<String>,
}

/// The featured quest is the first card of the first stack whose title
/// reads like "in progress". An empty in-progress stack yields no quest
/// even if a later stack would match.
fn find_active_quest(stacks: &[KanbanStack]) -> Option<ActiveQuest> {
    let in_progress = stacks.iter().find(|s| {
        let title = s.title.to_lowercase();
        title.contains("progress") || title.contains("doing") || title.contains("active")
    })?;
    let card = in_progress.cards.first()?;

    let total: usize = stacks.iter().map(|s| s.cards.len()).sum();
    let done = stacks
        .iter()
        .find(|s| {
            let title = s.title.to_lowercase();
            title.contains("done") || title.contains("complete")
        })
        .map(|s| s.cards.len())
        .unwrap_or(0);

    Some(ActiveQuest {
        name: card.title.clone(),
        progress: done,
        total,
        remaining: total - done,
        assignees: card.assigned_users.clone(),
    })
}

/// Relative label for an upcoming start: "within the hour", "in N hours",
/// "in N days".
pub fn format_time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (target - now).num_hours();
    if hours < 1 {
        return "within the hour".to_string();
    }
    if hours < 24 {
        return format!("in {} hour{}", hours, plural(hours));
    }
    let days = hours / 24;
    format!("in {} day{}", days, plural(days))
}

/// Calendar label for a rite: "Today at 7:30 pm", "Tomorrow at ...", or
/// weekday + date + time. Rendered in UTC; the groupware supplies
/// wall-clock stamps.
pub fn format_rite_date(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let time = format!(
        "{}:{:02} {}",
        hour12(target),
        target.minute(),
        meridiem(target)
    );
    if target.date_naive() == now.date_naive() {
        return format!("Today at {}", time);
    }
    if Some(target.date_naive()) == now.date_naive().succ_opt() {
        return format!("Tomorrow at {}", time);
    }
    format!(
        "{}, {} {}, {}",
        target.format("%a"),
        target.day(),
        target.format("%b"),
        time
    )
}

fn hour12(t: DateTime<Utc>) -> u32 {
    let (_, hour) = t.hour12();
    hour
}

fn meridiem(t: DateTime<Utc>) -> &'static str {
    let (pm, _) = t.hour12();
    if pm {
        "pm"
    } else {
        "am"
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn avatar_urls<'a>(users: impl Iterator<Item = &'a str>) -> Vec<String> {
    users
        .take(MAX_AVATARS)
        .map(|u| format!("/avatar/{}/32", u))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupware::models::{Admission, GuildResources, KanbanCard};

    fn guild_with_members(members: &[&str]) -> Guild {
        Guild {
            id: "g1".to_string(),
            name: "Stonewrights".to_string(),
            description: String::new(),
            icon: String::new(),
            color: String::new(),
            admission: Admission::Open,
            seeder_uid: String::new(),
            members: members.iter().map(|m| m.to_string()).collect(),
            pending: Vec::new(),
            member_count: members.len() as u32,
            created_at: String::new(),
            circle_id: String::new(),
            application_form: None,
            resources: GuildResources::default(),
        }
    }

    fn message(id: i64, actor: &str, timestamp: i64, text: &str) -> ChatMessage {
        ChatMessage {
            id,
            actor_type: "users".to_string(),
            actor_id: actor.to_string(),
            actor_display_name: actor.to_string(),
            timestamp,
            message: text.to_string(),
            message_type: "comment".to_string(),
            file: None,
        }
    }

    fn event(uid: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            uid: uid.to_string(),
            title: format!("Rite {}", uid),
            start: start.to_rfc3339(),
            end: None,
            all_day: None,
            location: None,
            description: None,
            recurrence: None,
            status: None,
            categories: None,
            links: Vec::new(),
        }
    }

    fn card(id: i64, title: &str, assignees: &[&str]) -> KanbanCard {
        KanbanCard {
            id,
            title: title.to_string(),
            description: String::new(),
            order: 0,
            duedate: None,
            assigned_users: assignees.iter().map(|a| a.to_string()).collect(),
            labels: Vec::new(),
            comments_count: 0,
        }
    }

    fn stack(id: i64, title: &str, cards: Vec<KanbanCard>) -> KanbanStack {
        KanbanStack {
            id,
            title: title.to_string(),
            order: id,
            cards,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T12:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_two_recent_messages_make_hot_pulse() {
        let now = now();
        let guild = guild_with_members(&["mira", "tom"]);
        let messages = vec![
            message(1, "mira", now.timestamp() - 10, "the banner is ready"),
            message(2, "tom", now.timestamp() - 20, "show us"),
            message(3, "tom", now.timestamp() - 40 * 60, "old talk"),
        ];

        match select_focus(&guild, &messages, &[], &[], now) {
            Focus::Pulse {
                description, meta, avatars, ..
            } => {
                assert_eq!(description, "the banner is ready");
                assert_eq!(meta, "2 brothers in conversation");
                assert_eq!(avatars, vec!["/avatar/mira/32", "/avatar/tom/32"]);
            }
            other => panic!("expected hot pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_single_recent_message_falls_through() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let messages = vec![message(1, "mira", now.timestamp() - 10, "anyone here?")];
        let events = vec![event("e1", now + Duration::hours(30))];

        match select_focus(&guild, &messages, &events, &[], now) {
            Focus::Rite { .. } => {}
            other => panic!("expected rite, got {:?}", other),
        }
    }

    #[test]
    fn test_hot_pulse_counts_distinct_actors_once() {
        let now = now();
        let guild = guild_with_members(&["mira", "tom"]);
        let messages = vec![
            message(1, "mira", now.timestamp() - 5, "one"),
            message(2, "mira", now.timestamp() - 15, "two"),
            message(3, "mira", now.timestamp() - 25, "three"),
        ];

        match select_focus(&guild, &messages, &[], &[], now) {
            Focus::Pulse { meta, avatars, .. } => {
                assert_eq!(meta, "1 brothers in conversation");
                assert_eq!(avatars, vec!["/avatar/mira/32"]);
            }
            other => panic!("expected hot pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_bot_and_system_messages_never_heat_the_pulse() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let mut bot = message(1, "reminder-bot", now.timestamp() - 10, "meeting soon");
        bot.actor_type = "bots".to_string();
        let mut joined = message(2, "tom", now.timestamp() - 20, "tom joined");
        joined.message_type = "system".to_string();

        match select_focus(&guild, &[bot, joined], &[], &[], now) {
            Focus::Pulse { meta, .. } => assert_eq!(meta, "1 brothers in the cove"),
            other => panic!("expected ambient pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_earliest_rite_in_window_wins() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let events = vec![
            event("late", now + Duration::hours(100)),
            event("soon", now + Duration::hours(30)),
            event("past", now - Duration::hours(2)),
        ];

        match select_focus(&guild, &[], &events, &[], now) {
            Focus::Rite {
                title, description, ..
            } => {
                assert_eq!(title, "Rite soon");
                assert_eq!(description, "The circle gathers in 1 day");
            }
            other => panic!("expected rite, got {:?}", other),
        }
    }

    #[test]
    fn test_rite_outside_72_hours_never_wins() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let events = vec![event("late", now + Duration::hours(100))];

        match select_focus(&guild, &[], &events, &[], now) {
            Focus::Pulse { .. } => {}
            other => panic!("expected ambient pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_quest_progress_counts() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let stacks = vec![
            stack(1, "Backlog", vec![card(1, "a", &[]), card(2, "b", &[])]),
            stack(
                2,
                "In Progress",
                vec![
                    card(3, "Forge the Banner", &["mira", "tom"]),
                    card(4, "c", &[]),
                    card(5, "d", &[]),
                ],
            ),
            stack(
                3,
                "Done",
                vec![
                    card(6, "e", &[]),
                    card(7, "f", &[]),
                    card(8, "g", &[]),
                    card(9, "h", &[]),
                    card(10, "i", &[]),
                ],
            ),
        ];

        match select_focus(&guild, &[], &[], &stacks, now) {
            Focus::Quest {
                title,
                quest,
                meta,
                avatars,
                ..
            } => {
                assert_eq!(title, "Forge the Banner");
                assert_eq!(quest.progress, 5);
                assert_eq!(quest.total, 10);
                assert_eq!(quest.remaining, 5);
                assert_eq!(meta, "5 of 10 complete");
                assert_eq!(avatars, vec!["/avatar/mira/32", "/avatar/tom/32"]);
            }
            other => panic!("expected quest, got {:?}", other),
        }
    }

    #[test]
    fn test_no_matching_stack_means_no_quest() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let stacks = vec![stack(1, "Backlog", vec![card(1, "a", &[])])];

        match select_focus(&guild, &[], &[], &stacks, now) {
            Focus::Pulse { .. } => {}
            other => panic!("expected ambient pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_in_progress_stack_means_no_quest() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let stacks = vec![
            stack(1, "In Progress", Vec::new()),
            stack(2, "Done", vec![card(1, "a", &[])]),
        ];

        match select_focus(&guild, &[], &[], &stacks, now) {
            Focus::Pulse { .. } => {}
            other => panic!("expected ambient pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_default_pulse_uses_latest_comment_and_member_count() {
        let now = now();
        let guild = guild_with_members(&["mira", "tom", "petra"]);
        let messages = vec![
            message(1, "tom", now.timestamp() - 7200, "yesterday's word"),
            message(2, "mira", now.timestamp() - 3600, "latest word"),
        ];

        match select_focus(&guild, &messages, &[], &[], now) {
            Focus::Pulse {
                description,
                meta,
                recent_message,
                ..
            } => {
                assert_eq!(description, "latest word");
                assert_eq!(meta, "3 brothers in the cove");
                assert_eq!(recent_message.unwrap().actor_id, "mira");
            }
            other => panic!("expected ambient pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_default_pulse_placeholder_when_silent() {
        let now = now();
        let guild = guild_with_members(&[]);

        match select_focus(&guild, &[], &[], &[], now) {
            Focus::Pulse {
                description,
                avatars,
                recent_message,
                ..
            } => {
                assert_eq!(description, "The circle awaits your presence...");
                assert!(avatars.is_empty());
                assert!(recent_message.is_none());
            }
            other => panic!("expected ambient pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_description_truncated_to_80_chars() {
        let now = now();
        let guild = guild_with_members(&["mira"]);
        let long = "x".repeat(200);
        let messages = vec![
            message(1, "mira", now.timestamp() - 5, &long),
            message(2, "tom", now.timestamp() - 6, "aye"),
        ];

        match select_focus(&guild, &messages, &[], &[], now) {
            Focus::Pulse { description, .. } => assert_eq!(description.chars().count(), 80),
            other => panic!("expected hot pulse, got {:?}", other),
        }
    }

    #[test]
    fn test_selection_is_idempotent() {
        let now = now();
        let guild = guild_with_members(&["mira", "tom"]);
        let messages = vec![
            message(1, "mira", now.timestamp() - 10, "one"),
            message(2, "tom", now.timestamp() - 20, "two"),
        ];
        let first = select_focus(&guild, &messages, &[], &[], now);
        let second = select_focus(&guild, &messages, &[], &[], now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_time_until_labels() {
        let now = now();
        assert_eq!(
            format_time_until(now + Duration::minutes(20), now),
            "within the hour"
        );
        assert_eq!(
            format_time_until(now + Duration::hours(1), now),
            "in 1 hour"
        );
        assert_eq!(
            format_time_until(now + Duration::hours(5), now),
            "in 5 hours"
        );
        assert_eq!(
            format_time_until(now + Duration::hours(30), now),
            "in 1 day"
        );
        assert_eq!(
            format_time_until(now + Duration::hours(50), now),
            "in 2 days"
        );
    }

    #[test]
    fn test_format_rite_date_labels() {
        // now is 2026-03-02 12:00 UTC, a Monday
        let now = now();
        assert_eq!(
            format_rite_date(now + Duration::hours(7), now),
            "Today at 7:00 pm"
        );
        assert_eq!(
            format_rite_date(now + Duration::hours(21), now),
            "Tomorrow at 9:00 am"
        );
        assert_eq!(
            format_rite_date(now + Duration::hours(55), now),
            "Wed, 4 Mar, 7:00 pm"
        );
    }
}
