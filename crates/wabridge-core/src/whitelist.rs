//! Whitelist evaluation for outbound sends.
//!
//! A whitelist entry is one of three kinds, inferred syntactically at
//! match time:
//!
//! - full JID (contains `@`) — compared by canonical equality,
//! - group id (contains `-`, no `@`) — compared against `<id>@g.us`,
//! - numeric — compared against the target's local part.
//!
//! An empty whitelist disables filtering entirely.

use crate::jid;

/// Evaluate the whitelist against a raw target.
///
/// The target is normalized first; a target that cannot be normalized
/// is always denied. The first matching entry short-circuits to allow;
/// blank entries are skipped.
pub fn is_allowed(target: &str, entries: &[String]) -> bool {
    if entries.is_empty() {
        return true;
    }

    let normalized = jid::normalize(target);
    if normalized.is_empty() {
        tracing::debug!("whitelist check on unroutable target, denying");
        return false;
    }

    entries
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .any(|entry| matches_entry(&normalized, entry))
}

fn matches_entry(normalized_target: &str, entry: &str) -> bool {
    if entry.contains('@') {
        return jid::normalize(entry) == normalized_target;
    }

    if entry.contains('-') {
        let cleaned: String = entry
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        return normalized_target == format!("{cleaned}@{}", jid::GROUP_DOMAIN);
    }

    let cleaned: String = entry.chars().filter(|c| c.is_ascii_digit()).collect();
    !cleaned.is_empty() && jid::local_part(normalized_target) == cleaned
}
