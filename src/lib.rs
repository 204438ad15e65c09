//! Sanctum - guild portal gateway
//!
//! Sanctum sits between the browser and a groupware platform, re-presenting
//! the groupware's chat, calendar, kanban, file and form data under the
//! guild metaphor. Identity arrives as trust-asserting headers injected by
//! the reverse proxy in front of this service; Sanctum forwards them
//! verbatim to the groupware and never verifies credentials itself.
//!
//! ## Services
//!
//! - **Guild directory**: membership-aware view over the groupware's guild list
//! - **Focus selector**: picks the single most relevant activity card per guild
//! - **Chamber notifications**: unread/upcoming/assigned badge counts
//! - **Forwarders**: thin HTTP pass-through for chat, calendar, kanban,
//!   files, forms, avatars and account actions

pub mod account;
pub mod config;
pub mod focus;
pub mod groupware;
pub mod guilds;
pub mod identity;
pub mod notifications;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use identity::Identity;
pub use server::{run, AppState};
pub use types::{Result, SanctumError};
