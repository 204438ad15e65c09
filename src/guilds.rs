//! Guild directory
//!
//! Read-through view over the groupware's guild list. Nothing is cached:
//! every call fetches fresh, and an upstream failure degrades to an empty
//! list rather than an error. Callers must treat "empty" as "no data",
//! not as a confirmed zero.

use tracing::warn;

use crate::groupware::models::{Admission, Guild};
use crate::groupware::GroupwareApi;
use crate::identity::Identity;

/// The single case-folding rule for membership tests, applied uniformly
/// across the directory, focus avatar lists and notification counts.
pub fn user_matches(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Whether `username` belongs to `guild`: listed as a member, or the guild
/// admits everyone (`mandatory` guilds are implicitly joined by every
/// authenticated user, regardless of the stored member list).
pub fn is_user_guild(guild: &Guild, username: &str) -> bool {
    guild.admission == Admission::Mandatory
        || guild.members.iter().any(|m| user_matches(m, username))
}

/// Full guild list visible to the deployment. Upstream failure is
/// swallowed to an empty list.
pub async fn list_all(api: &dyn GroupwareApi, identity: &Identity) -> Vec<Guild> {
    match api.guilds(identity).await {
        Ok(guilds) => guilds,
        Err(e) => {
            warn!(error = %e, "guild list fetch failed, serving empty");
            Vec::new()
        }
    }
}

/// Lookup by id. Linear scan of the fresh list; guild counts are small
/// and this view is deliberately uncached.
pub async fn get(api: &dyn GroupwareApi, identity: &Identity, id: &str) -> Option<Guild> {
    list_all(api, identity).await.into_iter().find(|g| g.id == id)
}

/// The guilds the caller belongs to, including every mandatory guild.
pub async fn list_user_guilds(api: &dyn GroupwareApi, identity: &Identity) -> Vec<Guild> {
    list_all(api, identity)
        .await
        .into_iter()
        .filter(|g| is_user_guild(g, &identity.username))
        .collect()
}
