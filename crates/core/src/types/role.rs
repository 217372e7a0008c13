//! Authorization roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

/// Role granted to a user and embedded in issued tokens.
///
/// The textual form (`Admin`, `Guest`) is what appears in the `role` claim and
/// in the `user_role` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Can create, update and delete catalog products.
    Admin,
    /// Default role for self-registered shoppers.
    Guest,
}

impl Role {
    /// All known roles.
    pub const ALL: [Self; 2] = [Self::Admin, Self::Guest];

    /// The role name as written to tokens and the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Guest => "Guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RoleParseError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Guest".parse::<Role>().unwrap(), Role::Guest);
        assert_eq!(
            "owner".parse::<Role>(),
            Err(RoleParseError("owner".to_owned()))
        );
    }

    #[test]
    fn test_serde_uses_claim_spelling() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
    }
}
