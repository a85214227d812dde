//! Redaction helpers for diagnostic output.

use serde_json::{Map, Value};

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "credential",
    "api_key",
    "apikey",
    "auth",
    "cookie",
];

const REDACTED: &str = "[redacted]";

/// Whether a context key looks like it carries a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| key.contains(fragment))
}

/// Redact credential-looking entries of a context map, recursing into
/// nested objects.
pub fn context(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            if is_sensitive_key(&key) {
                (key, Value::from(REDACTED))
            } else if let Value::Object(inner) = value {
                (key, Value::Object(context(inner)))
            } else {
                (key, value)
            }
        })
        .collect()
}

/// Truncate free-form text for log fields.
pub fn text(raw: &str, max_len: usize) -> String {
    if raw.chars().count() > max_len {
        let mut trimmed: String = raw.chars().take(max_len).collect();
        trimmed.push('…');
        trimmed
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_nested_credential_keys() {
        let mut map = Map::new();
        map.insert("selector".to_string(), json!("#login"));
        map.insert("session_token".to_string(), json!("abc123"));
        map.insert("form".to_string(), json!({ "Password": "hunter2" }));

        let redacted = context(map);
        assert_eq!(redacted["selector"], "#login");
        assert_eq!(redacted["session_token"], REDACTED);
        assert_eq!(redacted["form"]["Password"], REDACTED);
    }

    #[test]
    fn truncates_long_text() {
        let long = "a".repeat(20);
        let shortened = text(&long, 8);
        assert_eq!(shortened.chars().count(), 9);
        assert!(shortened.ends_with('…'));
        assert_eq!(text("short", 8), "short");
    }
}
