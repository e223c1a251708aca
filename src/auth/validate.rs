//! Request shape validation for the OAuth endpoints
//!
//! Every endpoint runs these checks before any state mutation. Failures are
//! reported as plain strings; the handlers wrap them in the protocol error
//! envelope.

use uuid::Uuid;

/// Maximum accepted client_name length
pub const MAX_CLIENT_NAME_LEN: usize = 100;

/// Maximum accepted redirect URI length
pub const MAX_REDIRECT_URI_LEN: usize = 2048;

/// PKCE code challenge length bounds per RFC 7636
pub const CODE_CHALLENGE_MIN_LEN: usize = 43;
pub const CODE_CHALLENGE_MAX_LEN: usize = 128;

/// Validate an optional client display name
pub fn validate_client_name(name: Option<&str>) -> Result<(), String> {
    match name {
        Some(n) if n.len() > MAX_CLIENT_NAME_LEN => Err(format!(
            "client_name must be at most {} characters",
            MAX_CLIENT_NAME_LEN
        )),
        _ => Ok(()),
    }
}

/// Validate the registered redirect URI set: non-empty, each absolute
pub fn validate_redirect_uris(uris: &[String]) -> Result<(), String> {
    if uris.is_empty() {
        return Err("redirect_uris is required and must be non-empty".to_string());
    }
    for uri in uris {
        if !is_absolute_uri(uri) {
            return Err(format!("Invalid redirect URI: {}", uri));
        }
    }
    Ok(())
}

/// A single redirect URI presented at /oauth/authorize
pub fn validate_redirect_uri(uri: &str) -> Result<(), String> {
    if is_absolute_uri(uri) {
        Ok(())
    } else {
        Err(format!("Invalid redirect URI: {}", uri))
    }
}

/// Client ids are uuids assigned at registration
pub fn validate_client_id(client_id: &str) -> Result<(), String> {
    Uuid::parse_str(client_id)
        .map(|_| ())
        .map_err(|_| "client_id is not a well-formed identifier".to_string())
}

/// PKCE challenge: base64url SHA-256 digest string, length 43-128
pub fn validate_code_challenge(challenge: &str) -> Result<(), String> {
    if (CODE_CHALLENGE_MIN_LEN..=CODE_CHALLENGE_MAX_LEN).contains(&challenge.len()) {
        Ok(())
    } else {
        Err(format!(
            "code_challenge length must be between {} and {}",
            CODE_CHALLENGE_MIN_LEN, CODE_CHALLENGE_MAX_LEN
        ))
    }
}

fn is_absolute_uri(uri: &str) -> bool {
    if uri.is_empty() || uri.len() > MAX_REDIRECT_URI_LEN {
        return false;
    }
    match url::Url::parse(uri) {
        // Url::parse only succeeds on absolute URIs; reject fragments outright
        Ok(parsed) => parsed.fragment().is_none(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_name_bounds() {
        assert!(validate_client_name(None).is_ok());
        assert!(validate_client_name(Some("Market Data Studio")).is_ok());
        assert!(validate_client_name(Some(&"a".repeat(101))).is_err());
    }

    #[test]
    fn test_redirect_uri_set() {
        assert!(validate_redirect_uris(&[]).is_err());
        assert!(validate_redirect_uris(&["https://app.example/cb".to_string()]).is_ok());
        assert!(validate_redirect_uris(&["/relative/path".to_string()]).is_err());
        assert!(validate_redirect_uris(&["https://app.example/cb#frag".to_string()]).is_err());
        assert!(validate_redirect_uris(&["a".repeat(3000)]).is_err());
    }

    #[test]
    fn test_client_id_shape() {
        assert!(validate_client_id("b2c3e6ea-95c5-4cc4-9205-8e4ee7cf6a90").is_ok());
        assert!(validate_client_id("not-a-uuid").is_err());
        assert!(validate_client_id("").is_err());
    }

    #[test]
    fn test_code_challenge_bounds() {
        assert!(validate_code_challenge(&"x".repeat(42)).is_err());
        assert!(validate_code_challenge(&"x".repeat(43)).is_ok());
        assert!(validate_code_challenge(&"x".repeat(128)).is_ok());
        assert!(validate_code_challenge(&"x".repeat(129)).is_err());
    }
}
