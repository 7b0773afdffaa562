//! Room name sanitization.

/// Longest accepted room name, excluding the `#` prefix.
pub const ROOM_NAME_MAX_LEN: usize = 50;

/// Sanitize a requested room name.
///
/// The name is lowercased and stripped of any leading `&#+!` sigils; what
/// remains must be 1 to 50 characters containing none of NUL, BEL, LF, CR,
/// space, comma, colon or slash. Accepted names come back with a single `#`
/// prefix.
///
/// ```
/// use rirc_proto::sanitize_room_name;
///
/// assert_eq!(sanitize_room_name("foo").as_deref(), Some("#foo"));
/// assert_eq!(sanitize_room_name("#FOO").as_deref(), Some("#foo"));
/// assert_eq!(sanitize_room_name("bla/bla/bla"), None);
/// ```
pub fn sanitize_room_name(name: &str) -> Option<String> {
    let lowered = name.to_lowercase();
    let stripped = lowered.trim_start_matches(&['&', '#', '+', '!'][..]);
    let len = stripped.chars().count();
    if len == 0 || len > ROOM_NAME_MAX_LEN {
        return None;
    }
    if stripped
        .chars()
        .any(|c| matches!(c, '\0' | '\x07' | '\n' | '\r' | ' ' | ',' | ':' | '/'))
    {
        return None;
    }
    Some(format!("#{stripped}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_and_lowercases() {
        assert_eq!(sanitize_room_name("foo").as_deref(), Some("#foo"));
        assert_eq!(sanitize_room_name("#foo").as_deref(), Some("#foo"));
        assert_eq!(sanitize_room_name("#FOO").as_deref(), Some("#foo"));
        assert_eq!(sanitize_room_name("&#+!bar").as_deref(), Some("#bar"));
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert_eq!(sanitize_room_name("bla/bla/bla"), None);
        assert_eq!(sanitize_room_name("bla:bla:bla"), None);
        assert_eq!(sanitize_room_name("foo bar"), None);
        assert_eq!(sanitize_room_name("foo,bar"), None);
        assert_eq!(sanitize_room_name("foo\x07"), None);
    }

    #[test]
    fn rejects_bad_lengths() {
        assert_eq!(sanitize_room_name(""), None);
        assert_eq!(sanitize_room_name("###"), None);
        assert_eq!(sanitize_room_name(&"x".repeat(51)), None);
        assert!(sanitize_room_name(&"x".repeat(50)).is_some());
    }
}
