use subtle::ConstantTimeEq;

/// Checks an `Authorization: Bearer <token>` header against the configured
/// admin token using a constant-time comparison, per SPEC_FULL.md §4.4/§6.
///
/// Mirrors `secrets.compare_digest`'s behavior: a length mismatch is
/// rejected without comparing content (token lengths are not secret), but
/// the content comparison itself never short-circuits on the first
/// differing byte.
#[must_use]
pub fn bearer_matches(header_value: Option<&str>, expected_token: &str) -> bool {
    let Some(header_value) = header_value else {
        return false;
    };
    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return false;
    };
    let token = token.trim();
    if token.len() != expected_token.len() {
        return false;
    }
    token.as_bytes().ct_eq(expected_token.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_bearer_token() {
        assert!(bearer_matches(Some("Bearer secret-token"), "secret-token"));
    }

    #[test]
    fn rejects_mismatched_token() {
        assert!(!bearer_matches(Some("Bearer wrong-token"), "secret-token"));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(!bearer_matches(None, "secret-token"));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        assert!(!bearer_matches(Some("Basic secret-token"), "secret-token"));
    }

    #[test]
    fn rejects_different_length_tokens() {
        assert!(!bearer_matches(Some("Bearer short"), "a-much-longer-admin-token"));
    }
}
