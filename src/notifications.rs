//! Chamber notifications
//!
//! Three independent badge counts per guild: unread pulse messages,
//! near-term rites, and quests that concern the caller. Each signal is
//! fetched and evaluated in isolation; one failing fetch never blocks the
//! others. An absent key means "no badge", never zero.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use crate::groupware::models::{CalendarEvent, ChatRoom, Guild, KanbanStack};
use crate::groupware::GroupwareApi;
use crate::guilds::user_matches;
use crate::identity::Identity;

/// Rites within this many days of now raise a badge.
const RITES_WINDOW_DAYS: i64 = 7;

/// Badge counts for a guild's chambers. Recomputed per request from live
/// upstream data; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChamberNotifications {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rites: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quests: Option<u32>,
}

/// Gather the three signals concurrently and count. A failed fetch
/// degrades that badge to absent.
pub async fn chamber_notifications(
    api: &dyn GroupwareApi,
    identity: &Identity,
    guild: &Guild,
) -> ChamberNotifications {
    let rooms = async {
        match guild.resources.talk_room {
            Some(_) => match api.chat_rooms(identity).await {
                Ok(rooms) => rooms,
                Err(e) => {
                    warn!(guild = %guild.id, error = %e, "room list fetch failed");
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

    let (rooms, events, stacks) = futures::join!(rooms, events, stacks);
    count_notifications(guild, &identity.username, &rooms, &events, &stacks, Utc::now())
}

/// The pure counting rules. Deterministic for given inputs and `now`.
pub fn count_notifications(
    guild: &Guild,
    username: &str,
    rooms: &[ChatRoom],
    events: &[CalendarEvent],
    stacks: &[KanbanStack],
    now: DateTime<Utc>,
) -> ChamberNotifications {
    let mut notifications = ChamberNotifications::default();

    // Pulse: unread count of this guild's room
    if let Some(token) = guild.resources.talk_room.as_deref() {
        if let Some(room) = rooms.iter().find(|r| r.token == token) {
            if room.unread_messages > 0 {
                notifications.pulse = Some(room.unread_messages);
            }
        }
    }

    // Rites: events starting within the next 7 days
    let horizon = now + Duration::days(RITES_WINDOW_DAYS);
    let upcoming = events
        .iter()
        .filter_map(CalendarEvent::start_time)
        .filter(|start| *start > now && *start < horizon)
        .count();
    if upcoming > 0 {
        notifications.rites = Some(upcoming as u32);
    }

    // Quests: cards assigned to the caller or overdue; a card satisfying
    // both counts once
    let mut concerning = 0u32;
    for stack in stacks {
        for card in &stack.cards {
            let assigned = card
                .assigned_users
                .iter()
                .any(|u| user_matches(u, username));
            let overdue = card.due_time().is_some_and(|due| due < now);
            if assigned || overdue {
                concerning += 1;
            }
        }
    }
    if concerning > 0 {
        notifications.quests = Some(concerning);
    }

    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupware::models::{Admission, GuildResources, KanbanCard};

    fn guild() -> Guild {
        Guild {
            id: "g1".to_string(),
            name: "Stonewrights".to_string(),
            description: String::new(),
            icon: String::new(),
            color: String::new(),
            admission: Admission::Open,
            seeder_uid: String::new(),
            members: vec!["mira".to_string()],
            pending: Vec::new(),
            member_count: 1,
            created_at: String::new(),
            circle_id: String::new(),
            application_form: None,
            resources: GuildResources {
                talk_room: Some("tok-1".to_string()),
                calendar_uri: Some("cal-1".to_string()),
                folder_id: None,
                folder_name: None,
                deck_board_id: Some(9),
            },
        }
    }

    fn room(token: &str, unread: u32) -> ChatRoom {
        ChatRoom {
            token: token.to_string(),
            name: String::new(),
            room_type: 2,
            unread_messages: unread,
            unread_mention: false,
            last_activity: 0,
        }
    }

    fn event(uid: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            uid: uid.to_string(),
            title: uid.to_string(),
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

    fn card(id: i64, assignees: &[&str], duedate: Option<String>) -> KanbanCard {
        KanbanCard {
            id,
            title: format!("card-{}", id),
            description: String::new(),
            order: 0,
            duedate,
            assigned_users: assignees.iter().map(|a| a.to_string()).collect(),
            labels: Vec::new(),
            comments_count: 0,
        }
    }

    fn stack(id: i64, cards: Vec<KanbanCard>) -> KanbanStack {
        KanbanStack {
            id,
            title: format!("stack-{}", id),
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
    fn test_unread_pulse_badge() {
        let n = count_notifications(
            &guild(),
            "mira",
            &[room("other", 9), room("tok-1", 3)],
            &[],
            &[],
            now(),
        );
        assert_eq!(n.pulse, Some(3));
        assert_eq!(n.rites, None);
        assert_eq!(n.quests, None);
    }

    #[test]
    fn test_zero_unread_omits_pulse_key() {
        let n = count_notifications(&guild(), "mira", &[room("tok-1", 0)], &[], &[], now());
        assert_eq!(n.pulse, None);
        assert_eq!(serde_json::to_string(&n).unwrap(), "{}");
    }

    #[test]
    fn test_rites_counts_seven_day_window() {
        let now = now();
        let events = vec![
            event("in-window", now + Duration::days(2)),
            event("edge-out", now + Duration::days(8)),
            event("past", now - Duration::hours(1)),
        ];
        let n = count_notifications(&guild(), "mira", &[], &events, &[], now);
        assert_eq!(n.rites, Some(1));
    }

    #[test]
    fn test_quests_assigned_or_overdue_counted_once() {
        let now = now();
        let overdue = (now - Duration::days(1)).to_rfc3339();
        let future = (now + Duration::days(1)).to_rfc3339();
        let stacks = vec![
            stack(
                1,
                vec![
                    // assigned and overdue: counts once
                    card(1, &["mira"], Some(overdue.clone())),
                    // assigned only (case differs)
                    card(2, &["Mira"], None),
                    // overdue only, someone else's
                    card(3, &["tom"], Some(overdue)),
                    // neither
                    card(4, &["tom"], Some(future)),
                ],
            ),
            stack(2, vec![card(5, &["mira"], None)]),
        ];
        let n = count_notifications(&guild(), "mira", &[], &[], &stacks, now);
        assert_eq!(n.quests, Some(4));
    }

    #[test]
    fn test_counting_is_idempotent() {
        let now = now();
        let events = vec![event("e", now + Duration::days(1))];
        let first = count_notifications(&guild(), "mira", &[], &events, &[], now);
        let second = count_notifications(&guild(), "mira", &[], &events, &[], now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_guild_without_resources_reports_nothing() {
        let mut bare = guild();
        bare.resources = GuildResources::default();
        let n = count_notifications(&bare, "mira", &[room("tok-1", 5)], &[], &[], now());
        assert_eq!(n, ChamberNotifications::default());
    }
}
