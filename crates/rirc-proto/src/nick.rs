//! Nickname validation.

/// Longest accepted nickname, per RFC 1459.
pub const NICKNAME_MAX_LEN: usize = 9;

/// Check a nickname: 1 to 9 characters drawn from ASCII letters, digits and
/// `-`.
///
/// ```
/// use rirc_proto::is_valid_nickname;
///
/// assert!(is_valid_nickname("A1-b"));
/// assert!(!is_valid_nickname("mein nick"));
/// assert!(!is_valid_nickname("#foo"));
/// ```
pub fn is_valid_nickname(nick: &str) -> bool {
    !nick.is_empty()
        && nick.len() <= NICKNAME_MAX_LEN
        && nick.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
