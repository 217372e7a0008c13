//! Signed access tokens.
//!
//! Tokens are HS256 JWTs. The issuer embeds the username (`sub`, `name`), a
//! random `jti`, every granted role (`role`, always an array), `iat`, `exp`,
//! `iss` and `aud`. Verification checks signature, issuer, audience and expiry
//! with no leeway.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use velvet_core::Role;

use crate::config::{JwtConfig, MIN_JWT_KEY_LENGTH};

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME_HOURS: i64 = 3;

/// Errors raised while issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The configured signing key is too short to be used.
    #[error("signing key must be at least {MIN_JWT_KEY_LENGTH} bytes (got {0})")]
    WeakKey(usize),

    /// The token's `exp` has passed.
    #[error("token expired")]
    Expired,

    /// Signature, issuer, audience or structure did not check out.
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Claim set written into every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub name: String,
    pub jti: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub role: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl TokenClaims {
    /// Whether `role` is among the granted roles.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role.iter().any(|r| r == role.as_str())
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens with one symmetric key.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    /// Build an issuer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::WeakKey` if the key is shorter than
    /// [`MIN_JWT_KEY_LENGTH`] bytes. There is no fallback key.
    pub fn new(config: &JwtConfig) -> Result<Self, TokenError> {
        Self::from_parts(&config.key, &config.issuer, &config.audience)
    }

    /// Build an issuer from a raw key, issuer and audience.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::WeakKey` if the key is too short.
    pub fn from_parts(key: &SecretString, issuer: &str, audience: &str) -> Result<Self, TokenError> {
        let secret = key.expose_secret().as_bytes();
        if secret.len() < MIN_JWT_KEY_LENGTH {
            return Err(TokenError::WeakKey(secret.len()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: issuer.to_owned(),
            audience: audience.to_owned(),
        })
    }

    /// Issue a token for `username` carrying `roles`, valid for three hours.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, username: &str, roles: &[Role]) -> Result<IssuedToken, TokenError> {
        self.issue_at(username, roles, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(
        &self,
        username: &str,
        roles: &[Role],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + Duration::hours(TOKEN_LIFETIME_HOURS);
        let claims = TokenClaims {
            sub: username.to_owned(),
            name: username.to_owned(),
            jti: Uuid::new_v4().to_string(),
            role: roles.iter().map(|r| r.as_str().to_owned()).collect(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;

        // Second precision, matching what the token itself carries.
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token presented as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` once `exp` has passed and
    /// `TokenError::Invalid` for any other failure.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }
}

/// Accept `"Admin"` as well as `["Admin", "Guest"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(role) => vec![role],
        OneOrMany::Many(roles) => roles,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &str = "k3Yf0rT3st1ng0nlyZq9Wx8Vc7Bn6Mm5Ll4";

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_parts(&SecretString::from(KEY), "velvet-api", "velvet-users").unwrap()
    }

    #[test]
    fn test_rejects_short_key() {
        let short = SecretString::from("too-short");
        assert!(matches!(
            TokenIssuer::from_parts(&short, "i", "a"),
            Err(TokenError::WeakKey(9))
        ));
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let issued = issuer.issue("alice", &[Role::Admin]).unwrap();

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.role, vec!["Admin".to_owned()]);
        assert!(claims.has_role(Role::Admin));
        assert!(!claims.has_role(Role::Guest));
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_HOURS * 3600);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn test_each_token_gets_a_fresh_id() {
        let issuer = issuer();
        let a = issuer.verify(&issuer.issue("bob", &[]).unwrap().token).unwrap();
        let b = issuer.verify(&issuer.issue("bob", &[]).unwrap().token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer();
        let issued = issuer
            .issue_at("carol", &[Role::Guest], Utc::now() - Duration::hours(4))
            .unwrap();
        assert!(matches!(issuer.verify(&issued.token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_key_or_audience_is_rejected() {
        let issued = issuer().issue("dave", &[]).unwrap();

        let other_key = TokenIssuer::from_parts(
            &SecretString::from("An0th3rK3yTh4tIsL0ngEn0ugh4HS256xx"),
            "velvet-api",
            "velvet-users",
        )
        .unwrap();
        assert!(matches!(other_key.verify(&issued.token), Err(TokenError::Invalid(_))));

        let other_aud =
            TokenIssuer::from_parts(&SecretString::from(KEY), "velvet-api", "someone-else").unwrap();
        assert!(matches!(other_aud.verify(&issued.token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_claim_field_names_match_shared_constants() {
        use velvet_core::claims;

        let issued = issuer().issue("erin", &[Role::Guest]).unwrap();
        let claims_json = serde_json::to_value(issuer().verify(&issued.token).unwrap()).unwrap();
        for name in [
            claims::SUBJECT,
            claims::NAME,
            claims::ROLE,
            claims::TOKEN_ID,
            claims::EXPIRES_AT,
            claims::ISSUED_AT,
            claims::ISSUER,
            claims::AUDIENCE,
        ] {
            assert!(claims_json.get(name).is_some(), "missing claim {name}");
        }
    }

    #[test]
    fn test_single_string_role_is_accepted() {
        let claims: TokenClaims = serde_json::from_str(
            r#"{"sub":"f","name":"f","jti":"x","role":"Admin","iat":0,"exp":1,"iss":"i","aud":"a"}"#,
        )
        .unwrap();
        assert_eq!(claims.role, vec!["Admin".to_owned()]);
    }
}
