//! Cart guards, run before every mutation: expiry first, then ownership.

use jiff::Timestamp;

use crate::domain::{
    actors::Actor,
    carts::{errors::CartsServiceError, records::CartRecord},
};

pub(crate) fn ensure_not_expired(
    cart: &CartRecord,
    now: Timestamp,
) -> Result<(), CartsServiceError> {
    if cart.is_expired_at(now) {
        return Err(CartsServiceError::CartExpired);
    }

    Ok(())
}

pub(crate) fn ensure_owned_by(cart: &CartRecord, actor: &Actor) -> Result<(), CartsServiceError> {
    if &cart.owner != actor {
        return Err(CartsServiceError::UnauthorizedCartAccess);
    }

    Ok(())
}

pub(crate) fn guard_mutation(
    cart: &CartRecord,
    actor: &Actor,
    now: Timestamp,
) -> Result<(), CartsServiceError> {
    ensure_not_expired(cart, now)?;
    ensure_owned_by(cart, actor)
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use crate::domain::{
        actors::{SessionToken, UserUuid},
        carts::records::CartUuid,
    };

    use super::*;

    fn cart(owner: Actor, expires_at: Option<Timestamp>) -> CartRecord {
        CartRecord {
            uuid: CartUuid::new(),
            owner,
            coupon_code: None,
            discount_amount: 0,
            expires_at,
            items: Vec::new(),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn owner_passes_both_guards() {
        let owner = Actor::User(UserUuid::new());

        assert!(guard_mutation(&cart(owner.clone(), None), &owner, Timestamp::now()).is_ok());
    }

    #[test]
    fn other_session_is_rejected() {
        let cart = cart(Actor::Guest(SessionToken::new("mine")), None);

        let result = ensure_owned_by(&cart, &Actor::Guest(SessionToken::new("theirs")));

        assert!(matches!(result, Err(CartsServiceError::UnauthorizedCartAccess)));
    }

    #[test]
    fn user_cannot_touch_guest_cart_with_same_identity_shape() {
        let user = UserUuid::new();
        let cart = cart(Actor::Guest(SessionToken::new(user.to_string())), None);

        let result = ensure_owned_by(&cart, &Actor::User(user));

        assert!(matches!(result, Err(CartsServiceError::UnauthorizedCartAccess)));
    }

    #[test]
    fn expiry_is_checked_before_ownership() {
        let now = Timestamp::now();
        let yesterday = now
            .checked_sub(SignedDuration::from_hours(24))
            .expect("valid timestamp");

        let cart = cart(Actor::Guest(SessionToken::new("mine")), Some(yesterday));

        let result = guard_mutation(&cart, &Actor::Guest(SessionToken::new("theirs")), now);

        assert!(matches!(result, Err(CartsServiceError::CartExpired)));
    }
}
