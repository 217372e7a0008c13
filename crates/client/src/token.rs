//! Claim extraction from a token without signature verification.
//!
//! The client only needs to know who it is logged in as, which roles it holds
//! and when the token expires. The server verifies every request, so the
//! payload segment is decoded as-is. Anything that does not decode yields no
//! claims.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

/// One `(name, value)` pair from a token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub name: String,
    pub value: String,
}

impl Claim {
    fn new(name: &str, value: String) -> Self {
        Self {
            name: name.to_owned(),
            value,
        }
    }
}

/// A payload value: one string, or a sequence of them.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClaimValue {
    Single(String),
    Multiple(Vec<String>),
}

impl From<Value> for ClaimValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Multiple(items.into_iter().map(scalar_text).collect()),
            other => Self::Single(scalar_text(other)),
        }
    }
}

/// String form of a JSON value: strings unquoted, null empty, the rest as JSON.
fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Extract the claims carried by `token`.
///
/// Array values expand to one claim per element. Returns an empty list for
/// an empty string, a string without `.`, or any payload that fails to decode.
#[must_use]
pub fn parse_claims(token: &str) -> Vec<Claim> {
    let Some(payload) = payload_segment(token) else {
        return Vec::new();
    };

    let Some(map) = decode_payload(payload) else {
        tracing::debug!("Token payload did not decode, ignoring");
        return Vec::new();
    };

    map.into_iter()
        .flat_map(|(name, value)| match value {
            ClaimValue::Single(v) => vec![Claim::new(&name, v)],
            ClaimValue::Multiple(vs) => vs.into_iter().map(|v| Claim::new(&name, v)).collect(),
        })
        .collect()
}

/// First value of claim `name`.
#[must_use]
pub fn find_claim<'a>(claims: &'a [Claim], name: &str) -> Option<&'a str> {
    claims
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.value.as_str())
}

fn payload_segment(token: &str) -> Option<&str> {
    if token.trim().is_empty() {
        return None;
    }
    token.split('.').nth(1)
}

fn decode_payload(segment: &str) -> Option<BTreeMap<String, ClaimValue>> {
    let bytes = STANDARD.decode(to_standard_alphabet(segment)).ok()?;
    let Value::Object(object) = serde_json::from_slice::<Value>(&bytes).ok()? else {
        return None;
    };

    Some(
        object
            .into_iter()
            .map(|(name, value)| (name, ClaimValue::from(value)))
            .collect(),
    )
}

/// Translate URL-safe base64 without padding into the standard padded alphabet.
fn to_standard_alphabet(segment: &str) -> String {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => {}
    }
    standard
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    /// Build an unsigned token around `payload`.
    pub(crate) fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    fn values<'a>(claims: &'a [Claim], name: &str) -> Vec<&'a str> {
        claims
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.value.as_str())
            .collect()
    }

    #[test]
    fn test_role_array_expands() {
        let token = token_with_payload(&serde_json::json!({
            "name": "alice",
            "role": ["Admin", "Guest"],
            "exp": 1_900_000_000,
        }));

        let claims = parse_claims(&token);
        assert_eq!(values(&claims, "role"), vec!["Admin", "Guest"]);
        assert_eq!(find_claim(&claims, "name"), Some("alice"));
        assert_eq!(find_claim(&claims, "exp"), Some("1900000000"));
    }

    #[test]
    fn test_single_role_string() {
        let token = token_with_payload(&serde_json::json!({"role": "Admin"}));
        assert_eq!(values(&parse_claims(&token), "role"), vec!["Admin"]);
    }

    #[test]
    fn test_other_values_are_stringified() {
        let token = token_with_payload(&serde_json::json!({
            "flag": true,
            "nothing": null,
            "nested": {"a": 1},
        }));
        let claims = parse_claims(&token);
        assert_eq!(find_claim(&claims, "flag"), Some("true"));
        assert_eq!(find_claim(&claims, "nothing"), Some(""));
        assert_eq!(find_claim(&claims, "nested"), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_garbage_yields_nothing() {
        for token in [
            "",
            "   ",
            "no-dots-here",
            "a.%%%.c",
            "a.b",
            // valid base64, not JSON
            "a.aGVsbG8.c",
            // valid JSON, not an object
            "a.WzEsMl0.c",
        ] {
            assert!(parse_claims(token).is_empty(), "token {token:?}");
        }
    }

    #[test]
    fn test_padding_and_url_alphabet() {
        assert_eq!(to_standard_alphabet("ab-_"), "ab+/");
        assert_eq!(to_standard_alphabet("abcdef"), "abcdef==");
        assert_eq!(to_standard_alphabet("abcdefg"), "abcdefg=");

        let token = token_with_payload(&serde_json::json!({"sub": "?>?"}));
        assert_eq!(find_claim(&parse_claims(&token), "sub"), Some("?>?"));
    }
}
