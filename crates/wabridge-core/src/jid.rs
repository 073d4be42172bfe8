//! Recipient address (JID) normalization.
//!
//! The addon routes messages by JID: `<local>@<domain>` where the
//! domain is `s.whatsapp.net` for individual chats, `g.us` for groups,
//! or a verbatim pre-qualified domain such as `lid`. Callers hand us
//! phone numbers, group ids, or full JIDs in whatever shape their
//! automation produced; this module canonicalizes them.

/// Domain for individual chats.
pub const USER_DOMAIN: &str = "s.whatsapp.net";

/// Domain for group chats.
pub const GROUP_DOMAIN: &str = "g.us";

/// Digit count at which a bare numeric identifier is classified as a
/// modern group id rather than a phone number. E.164 caps phone
/// numbers at 15 digits, so 16+ digits cannot be a phone number.
/// Heuristic: group id length is not guaranteed by the remote
/// platform.
pub const GROUP_ID_MIN_DIGITS: usize = 16;

/// Normalize a raw recipient string into a canonical JID.
///
/// Returns an empty string when the input is empty or contains nothing
/// routable (e.g. no digits at all). Callers must check for empty
/// before use; this is not an error here.
///
/// Normalizing an already-qualified JID returns it unchanged apart
/// from a stripped leading `+`, so the function is idempotent.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // Already qualified: strip a leading '+' and keep the rest verbatim.
    if trimmed.contains('@') {
        return trimmed.strip_prefix('+').unwrap_or(trimmed).to_string();
    }

    // Old-style group id: "<digits>-<digits>".
    if is_old_style_group(trimmed) {
        return format!("{trimmed}@{GROUP_DOMAIN}");
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }

    if digits.len() >= GROUP_ID_MIN_DIGITS {
        format!("{digits}@{GROUP_DOMAIN}")
    } else {
        format!("{digits}@{USER_DOMAIN}")
    }
}

/// The local part of a JID (the substring before `@`), or the whole
/// string when no `@` is present.
pub fn local_part(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid)
}

fn is_old_style_group(value: &str) -> bool {
    let mut halves = value.split('-');
    match (halves.next(), halves.next(), halves.next()) {
        (Some(a), Some(b), None) => {
            !a.is_empty()
                && !b.is_empty()
                && a.chars().all(|c| c.is_ascii_digit())
                && b.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}
