//! Postgres access for carts and their lines.
//!
//! Every method takes the caller's transaction; nothing here commits.

mod carts;
mod items;

pub(crate) use self::{carts::PgCartsRepository, items::PgCartItemsRepository};
