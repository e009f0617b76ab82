//! Actor middleware.

use salvo::prelude::*;
use uuid::Uuid;

use storefront_app::domain::actors::{Actor, SessionToken, UserUuid};

use crate::actors::{SESSION_TOKEN_HEADER, USER_UUID_HEADER};

#[derive(Debug, PartialEq, Eq)]
enum ActorHeaderError {
    Missing,
    InvalidUserUuid,
}

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let actor = match resolve_actor(
        header_value(req, USER_UUID_HEADER),
        header_value(req, SESSION_TOKEN_HEADER),
    ) {
        Ok(actor) => actor,
        Err(ActorHeaderError::Missing) => {
            res.render(StatusError::unauthorized().brief("Missing user or session header"));

            return;
        }
        Err(ActorHeaderError::InvalidUserUuid) => {
            res.render(StatusError::unauthorized().brief("Invalid user header"));

            return;
        }
    };

    depot.inject(actor);

    ctrl.call_next(req, depot, res).await;
}

/// The session token sent with the request, if any.
pub(crate) fn session_token(req: &Request) -> Option<SessionToken> {
    header_value(req, SESSION_TOKEN_HEADER).map(SessionToken::new)
}

fn header_value<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// A user header wins over a session header.
fn resolve_actor(user: Option<&str>, session: Option<&str>) -> Result<Actor, ActorHeaderError> {
    if let Some(user) = user {
        let uuid = Uuid::parse_str(user).map_err(|_ignored| ActorHeaderError::InvalidUserUuid)?;

        return Ok(Actor::User(UserUuid::from_uuid(uuid)));
    }

    session
        .map(|token| Actor::Guest(SessionToken::new(token)))
        .ok_or(ActorHeaderError::Missing)
}
