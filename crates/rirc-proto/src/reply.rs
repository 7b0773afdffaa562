//! Server reply shaping.
//!
//! Every server-originated line is `:<hostname> <rest>`. Numeric replies
//! join their parameters with single spaces, colon-prefixing the final one
//! so that it may contain spaces.

/// Join a reply code and its parameters, colon-prefixing the last parameter.
pub fn join_params(code: &str, params: &[&str]) -> String {
    let mut out = String::from(code);
    for (n, param) in params.iter().enumerate() {
        out.push(' ');
        if n + 1 == params.len() {
            out.push(':');
        }
        out.push_str(param);
    }
    out
}

/// Prefix a reply with the originating server's name.
pub fn with_server_prefix(hostname: &str, rest: &str) -> String {
    format!(":{hostname} {rest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_param_is_colon_prefixed() {
        assert_eq!(
            join_params("431", &["No nickname given"]),
            "431 :No nickname given"
        );
        assert_eq!(
            join_params("433", &["*", "meinick", "Nickname is already in use"]),
            "433 * meinick :Nickname is already in use"
        );
    }

    #[test]
    fn bare_code_passes_through() {
        assert_eq!(join_params("323", &[]), "323");
    }

    #[test]
    fn server_prefix() {
        assert_eq!(
            with_server_prefix("foohost", "001 n :Hi, welcome to IRC"),
            ":foohost 001 n :Hi, welcome to IRC"
        );
    }
}
