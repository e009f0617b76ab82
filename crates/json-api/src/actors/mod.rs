//! Actor resolution
//!
//! Authentication happens upstream. The gateway forwards the signed-in user
//! as `x-user-uuid`; anonymous shoppers carry an `x-session-token`.

pub(crate) mod middleware;

pub(crate) const USER_UUID_HEADER: &str = "x-user-uuid";
pub(crate) const SESSION_TOKEN_HEADER: &str = "x-session-token";
