use std::{fmt::Display, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Privilege level of an account, ordered `User < Moderator < Admin`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid role: {0}")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| InvalidRole(s.to_string()))
    }
}

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

/// Capability predicates, derived only from the role and the superuser flag.
pub trait Authorization {
    fn role(&self) -> Role;
    fn is_superuser(&self) -> bool;

    /// Superusers are always admin capable, whatever their role is.
    fn is_admin(&self) -> bool {
        self.is_superuser() || self.role() == Role::Admin
    }

    fn is_moderator(&self) -> bool {
        self.role() == Role::Moderator
    }

    fn is_user(&self) -> bool {
        self.role() == Role::User
    }
}

/// Authenticated identity on whose behalf a request is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl Authorization for Actor {
    fn role(&self) -> Role {
        self.role
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

/// Claims of the access token, `sub` is the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiClaim {
    pub sub: String,
    pub exp: u64,
}

impl ApiClaim {
    pub fn new_expired(sub: impl Into<String>) -> Self {
        ApiClaim {
            sub: sub.into(),
            exp: 0,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = until
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    fn check_validity(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(u64::MAX);
        self.exp > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, is_superuser: bool) -> Actor {
        Actor {
            id: 1,
            username: "usak".into(),
            email: "usak@example.com".into(),
            role,
            is_superuser,
        }
    }

    #[test]
    fn test_role() {
        let role: Role = "admin".parse().unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(role.as_ref(), "admin");
        assert!("root".parse::<Role>().is_err());
        assert!(Role::User < Role::Moderator && Role::Moderator < Role::Admin);
        assert_eq!(
            serde_json::to_string(&Role::Moderator).unwrap(),
            "\"moderator\""
        );
    }

    #[test]
    fn test_capabilities() {
        let admin = actor(Role::Admin, false);
        assert!(admin.is_admin() && !admin.is_moderator() && !admin.is_user());

        let moderator = actor(Role::Moderator, false);
        assert!(!moderator.is_admin() && moderator.is_moderator());

        let user = actor(Role::User, false);
        assert!(!user.is_admin() && user.is_user());

        let superuser = actor(Role::User, true);
        assert!(superuser.is_admin());
        assert!(superuser.is_user());
    }

    #[test]
    fn test_claim_validity() {
        let mut claim = ApiClaim::new_expired("42");
        assert!(!claim.check_validity());
        assert_eq!(claim.user_id(), Some(42));
        claim.set_validity(SystemTime::now() + std::time::Duration::from_secs(60));
        assert!(claim.check_validity());
    }
}
