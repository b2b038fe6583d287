use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Username reserved for the own profile endpoint (`/users/me`)
pub const RESERVED_USERNAME: &str = "me";

pub fn is_reserved_username(username: &str) -> bool {
    username == RESERVED_USERNAME
}

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidEmail(#[garde(email, length(max = 254))] String);

#[cfg(feature = "e2e-tests")]
impl ValidEmail {
    pub fn cheat(email: String) -> Self {
        ValidEmail(email)
    }
}

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.to_string());
        email.validate()?;
        Ok(email)
    }
}

impl ValidEmail {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
