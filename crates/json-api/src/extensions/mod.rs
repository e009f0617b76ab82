//! Handler conveniences on salvo and std types.
//!
//! Import with `use crate::extensions::*;` to bring the traits into scope.

mod depot;
mod result;

pub(crate) use self::{depot::DepotExt as _, result::ResultExt as _};
