//! Actors
//!
//! The identity performing an operation: a registered user or an anonymous
//! session. Authentication itself happens upstream; by the time a request
//! reaches the services the actor is already resolved.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::uuids::TypedUuid;

/// Registered User
#[derive(Debug)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// Opaque token identifying an anonymous browsing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Who is acting. Also used as the owner of a cart, which belongs to exactly
/// one of the two kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    User(UserUuid),
    Guest(SessionToken),
}

impl Actor {
    /// The registered user, if any.
    #[must_use]
    pub fn user_uuid(&self) -> Option<UserUuid> {
        match self {
            Self::User(uuid) => Some(*uuid),
            Self::Guest(_) => None,
        }
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::User(uuid) => write!(f, "user:{uuid}"),
            Self::Guest(_) => f.write_str("guest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_and_guest_never_compare_equal() {
        let user = Actor::User(UserUuid::new());
        let guest = Actor::Guest(SessionToken::new("abc"));

        assert_ne!(user, guest);
        assert!(user.user_uuid().is_some());
        assert!(guest.user_uuid().is_none());
    }

    #[test]
    fn display_does_not_leak_session_tokens() {
        let guest = Actor::Guest(SessionToken::new("secret-session"));

        assert_eq!(guest.to_string(), "guest");
    }
}
