//! Reusable field validators
//!
//! Small predicates over `serde_json::Value` shared by the per-resource
//! validators. Each returns `Ok(())` or a human-readable rejection
//! message; the caller attaches the field name to build a
//! `CmsError::Validation`.
//!
//! Each validator checks exactly one rule. Type mismatches are reported
//! by the type validators (`string_in_range`, `strict_bool`, ...), so
//! constraint validators pass non-matching types through; the ordered
//! check sequence in the resource validators guarantees the type check
//! ran first.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug regex is valid"));

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("username regex is valid"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"));

/// Minimum accepted password length.
pub const PASSWORD_MIN_LEN: usize = 6;

/// The field must be present and non-null.
pub fn required(value: Option<&Value>) -> Result<(), String> {
    match value {
        Some(v) if !v.is_null() => Ok(()),
        _ => Err("is required".to_string()),
    }
}

/// The field must be a string with length in `[min, max]`.
pub fn string_in_range(value: &Value, min: usize, max: usize) -> Result<(), String> {
    let Some(s) = value.as_str() else {
        return Err("must be a string".to_string());
    };
    let len = s.chars().count();
    if len < min {
        Err(format!("must be at least {min} characters"))
    } else if len > max {
        Err(format!("must be at most {max} characters"))
    } else {
        Ok(())
    }
}

/// The field must match the URL-safe slug charset: `^[a-z0-9-]+$`.
pub fn slug_format(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if SLUG_RE.is_match(s) => Ok(()),
        Some(_) => Err("must contain only lowercase letters, digits, and hyphens".to_string()),
        None => Ok(()), // type reported by string_in_range
    }
}

/// The field must match the username charset: `^[a-zA-Z0-9_-]+$`.
pub fn username_format(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if USERNAME_RE.is_match(s) => Ok(()),
        Some(_) => {
            Err("must contain only letters, digits, hyphens, and underscores".to_string())
        }
        None => Ok(()),
    }
}

/// The field must look like an email address.
pub fn email_format(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if EMAIL_RE.is_match(s) => Ok(()),
        Some(_) => Err("must be a valid email address".to_string()),
        None => Err("must be a string".to_string()),
    }
}

/// The field must be a strict JSON boolean. Truthy strings are rejected.
pub fn strict_bool(value: &Value) -> Result<(), String> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err("must be a boolean".to_string())
    }
}

/// `content` must be an ordered sequence of blocks, not a bare object.
pub fn block_sequence(value: &Value) -> Result<(), String> {
    if value.is_array() {
        Ok(())
    } else {
        Err("must be an ordered sequence of content blocks".to_string())
    }
}

/// `meta` must be a key/value bag, not an array.
pub fn meta_map(value: &Value) -> Result<(), String> {
    if value.is_object() {
        Ok(())
    } else {
        Err("must be a key/value object".to_string())
    }
}

/// Passwords must be strings of at least [`PASSWORD_MIN_LEN`] characters.
pub fn password_length(value: &Value) -> Result<(), String> {
    let Some(s) = value.as_str() else {
        return Err("must be a string".to_string());
    };
    if s.chars().count() < PASSWORD_MIN_LEN {
        Err("Password length is too short".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === required ===

    #[test]
    fn required_missing_is_rejected() {
        assert!(required(None).is_err());
    }

    #[test]
    fn required_null_is_rejected() {
        assert!(required(Some(&json!(null))).is_err());
    }

    #[test]
    fn required_present_is_ok() {
        assert!(required(Some(&json!("x"))).is_ok());
        assert!(required(Some(&json!(false))).is_ok());
        assert!(required(Some(&json!([]))).is_ok());
    }

    // === string_in_range ===

    #[test]
    fn string_in_range_rejects_non_string() {
        assert!(string_in_range(&json!(42), 1, 512).is_err());
    }

    #[test]
    fn string_in_range_rejects_empty_when_min_one() {
        let err = string_in_range(&json!(""), 1, 512).unwrap_err();
        assert!(err.contains("at least 1"));
    }

    #[test]
    fn string_in_range_rejects_over_max() {
        let long = "a".repeat(513);
        let err = string_in_range(&json!(long), 1, 512).unwrap_err();
        assert!(err.contains("at most 512"));
    }

    #[test]
    fn string_in_range_accepts_bounds() {
        assert!(string_in_range(&json!("a"), 1, 512).is_ok());
        assert!(string_in_range(&json!("a".repeat(512)), 1, 512).is_ok());
    }

    // === slug_format ===

    #[test]
    fn slug_format_accepts_lowercase_hyphenated() {
        assert!(slug_format(&json!("my-page-2")).is_ok());
    }

    #[test]
    fn slug_format_rejects_uppercase_and_spaces() {
        assert!(slug_format(&json!("My-Page")).is_err());
        assert!(slug_format(&json!("my page")).is_err());
        assert!(slug_format(&json!("caf\u{e9}")).is_err());
    }

    // === strict_bool ===

    #[test]
    fn strict_bool_rejects_truthy_strings() {
        assert!(strict_bool(&json!("true")).is_err());
        assert!(strict_bool(&json!(1)).is_err());
        assert!(strict_bool(&json!(true)).is_ok());
        assert!(strict_bool(&json!(false)).is_ok());
    }

    // === block_sequence / meta_map ===

    #[test]
    fn content_must_be_an_array() {
        assert!(block_sequence(&json!([])).is_ok());
        assert!(block_sequence(&json!([{ "type": "text" }])).is_ok());
        assert!(block_sequence(&json!({ "type": "text" })).is_err());
    }

    #[test]
    fn meta_must_be_an_object() {
        assert!(meta_map(&json!({})).is_ok());
        assert!(meta_map(&json!({ "k": "v" })).is_ok());
        assert!(meta_map(&json!(["k"])).is_err());
    }

    // === email / username / password ===

    #[test]
    fn email_format_basic_shapes() {
        assert!(email_format(&json!("a@b.co")).is_ok());
        assert!(email_format(&json!("not-an-email")).is_err());
        assert!(email_format(&json!("a b@c.co")).is_err());
    }

    #[test]
    fn username_format_charset() {
        assert!(username_format(&json!("alice_01")).is_ok());
        assert!(username_format(&json!("alice!")).is_err());
    }

    #[test]
    fn password_too_short_message_is_exact() {
        let err = password_length(&json!("abcd")).unwrap_err();
        assert_eq!(err, "Password length is too short");
        assert!(password_length(&json!("abcdef")).is_ok());
    }
}
