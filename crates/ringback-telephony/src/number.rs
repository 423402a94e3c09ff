//! Destination-number validation for the direct call API.

/// E.164-style check: a leading `+` followed by 8–15 digits, no leading zero.
///
/// Webhook paths skip this — numbers arriving from the provider are taken
/// as-is — so only the direct JSON API rejects malformed input up front.
pub fn is_e164(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}
