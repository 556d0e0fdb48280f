//! Key and record name validation.
//!
//! Valid names:
//! - Must be non-empty
//! - Must not contain `/` (names appear as a single `/ipns/` path segment)
//! - Must not contain whitespace or control characters

use crate::error::{NameError, NameResult};

/// The node's own key. Always present and never generated, renamed, or removed.
pub const SELF_KEY: &str = "self";

/// Validate a key or record name.
pub fn validate_name(name: &str) -> NameResult<()> {
    let invalid = |reason: &str| NameError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    if let Some(ch) = name.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// Validate a name a user may create or take over; rejects [`SELF_KEY`].
pub fn validate_user_key_name(name: &str, action: &'static str) -> NameResult<()> {
    if name == SELF_KEY {
        return Err(NameError::ReservedKey { action });
    }
    validate_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("self").is_ok());
        assert!(validate_name("my-key").is_ok());
        assert!(validate_name("k.1_x").is_ok());
    }

    #[test]
    fn reject_empty_name() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn reject_slash() {
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("/ipns").is_err());
    }

    #[test]
    fn reject_whitespace() {
        assert!(validate_name("has space").is_err());
        assert!(validate_name("has\ttab").is_err());
        assert!(validate_name("nul\0").is_err());
    }

    #[test]
    fn self_is_reserved_for_users() {
        assert_eq!(
            validate_user_key_name(SELF_KEY, "generate"),
            Err(NameError::ReservedKey { action: "generate" })
        );
        assert!(validate_user_key_name("other", "generate").is_ok());
    }
}
