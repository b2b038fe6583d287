//! Access policy - decides whether an actor may perform a verb on a resource.
//!
//! The decision is a pure function of its inputs, callers pass the actor explicitly
//! (`None` for anonymous requests) and look up resource ownership before asking.

use crate::claim::{Actor, Authorization};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Delete,
}

impl Verb {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Verb::List | Verb::Retrieve)
    }
}

/// Kind of the target resource.
///
/// For reviews and comments `author_id` is the author of the targeted instance,
/// `None` when the request does not address an existing instance (listing, creation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    Genre,
    Title,
    Review { author_id: Option<i64> },
    Comment { author_id: Option<i64> },
    /// User management - list, create and records addressed by username
    Users,
    /// Profile of the requesting actor (`/users/me`)
    OwnProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "Authentication credentials were not provided",
            DenyReason::Forbidden => "You do not have permission to perform this action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

fn admin_only(actor: Option<&Actor>) -> Decision {
    match actor {
        None => Decision::Deny(DenyReason::Unauthenticated),
        Some(actor) if actor.is_admin() => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::Forbidden),
    }
}

fn author_or_staff(actor: Option<&Actor>, verb: Verb, author_id: Option<i64>) -> Decision {
    let Some(actor) = actor else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };
    if actor.is_admin() || actor.is_moderator() {
        return Decision::Allow;
    }
    match author_id {
        Some(author_id) if author_id == actor.id => Decision::Allow,
        None if verb == Verb::Create => Decision::Allow,
        _ => Decision::Deny(DenyReason::Forbidden),
    }
}

/// Rules in order of precedence:
/// 1. reading the catalogue, reviews and comments is public
/// 2. categories, genres and titles are changed only by admins
/// 3. reviews and comments are changed by their author, moderators or admins,
///    any authenticated actor can create them
/// 4. user management is admin only, own profile can be read and partially updated
pub fn authorize(actor: Option<&Actor>, verb: Verb, resource: Resource) -> Decision {
    match resource {
        Resource::Category
        | Resource::Genre
        | Resource::Title
        | Resource::Review { .. }
        | Resource::Comment { .. }
            if verb.is_read_only() =>
        {
            Decision::Allow
        }
        Resource::Category | Resource::Genre | Resource::Title => admin_only(actor),
        Resource::Review { author_id } | Resource::Comment { author_id } => {
            author_or_staff(actor, verb, author_id)
        }
        Resource::Users => admin_only(actor),
        Resource::OwnProfile => match actor {
            None => Decision::Deny(DenyReason::Unauthenticated),
            Some(_) if matches!(verb, Verb::Retrieve | Verb::PartialUpdate) => Decision::Allow,
            Some(_) => Decision::Deny(DenyReason::Forbidden),
        },
    }
}
