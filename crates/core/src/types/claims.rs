//! Claim names shared by the token issuer and client-side parsers.
//!
//! The issuer writes `ROLE` as a JSON array even for a single role; parsers
//! must also accept a plain string.

/// Subject (username).
pub const SUBJECT: &str = "sub";
/// Display identity (username).
pub const NAME: &str = "name";
/// Role claim; one value per granted role.
pub const ROLE: &str = "role";
/// Unique token identifier.
pub const TOKEN_ID: &str = "jti";
/// Expiry, seconds since the Unix epoch.
pub const EXPIRES_AT: &str = "exp";
/// Issued-at, seconds since the Unix epoch.
pub const ISSUED_AT: &str = "iat";
/// Issuer.
pub const ISSUER: &str = "iss";
/// Audience.
pub const AUDIENCE: &str = "aud";
