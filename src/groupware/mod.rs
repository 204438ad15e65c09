//! Groupware client boundary
//!
//! Typed access to the groupware's internal portal API. All reads are
//! validated into the entity models here; malformed upstream data fails at
//! this boundary as a remote failure instead of leaking into handlers.

pub mod client;
pub mod models;

pub use client::{GroupwareApi, GroupwareClient};
pub use models::{
    Admission, CalendarEvent, ChatMessage, ChatRoom, EventLink, Guild, GuildResources, KanbanCard,
    KanbanLabel, KanbanStack,
};
