//! Carts Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    actors::{SessionToken, UserUuid},
    carts::records::{CartOwner, CartRecord, CartUuid},
    columns::{try_get_amount, try_i64_from_u64},
};

const FIND_CART_SQL: &str = include_str!("../sql/find_cart.sql");
const FIND_CART_BY_USER_SQL: &str = include_str!("../sql/find_cart_by_user.sql");
const FIND_CART_BY_SESSION_SQL: &str = include_str!("../sql/find_cart_by_session.sql");
const CREATE_CART_SQL: &str = include_str!("../sql/create_cart.sql");
const UPDATE_CART_COUPON_SQL: &str = include_str!("../sql/update_cart_coupon.sql");
const DELETE_CART_SQL: &str = include_str!("../sql/delete_cart.sql");
const DELETE_EXPIRED_CARTS_SQL: &str = include_str!("../sql/delete_expired_carts.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Cart row only; `items` is left empty.
    pub(crate) async fn find_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(FIND_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(FIND_CART_BY_USER_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session: &SessionToken,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(FIND_CART_BY_SESSION_SQL)
            .bind(session.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_owner(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: &CartOwner,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        match owner {
            CartOwner::User(user) => self.find_by_user(tx, *user).await,
            CartOwner::Guest(session) => self.find_by_session(tx, session).await,
        }
    }

    /// Inserts a cart for `owner`. Guest carts expire `lifetime_days` after
    /// creation. Returns `None` when the owner already has a cart.
    pub(crate) async fn create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        owner: &CartOwner,
        lifetime_days: u16,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        let (user, session) = match owner {
            CartOwner::User(user) => (Some(user.into_uuid()), None),
            CartOwner::Guest(session) => (None, Some(session.as_str())),
        };

        query_as::<Postgres, CartRecord>(CREATE_CART_SQL)
            .bind(cart.into_uuid())
            .bind(user)
            .bind(session)
            .bind(i32::from(lifetime_days))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        coupon_code: Option<&str>,
        discount_amount: u64,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_CART_COUPON_SQL)
            .bind(cart.into_uuid())
            .bind(coupon_code)
            .bind(try_i64_from_u64(discount_amount, "discount_amount")?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn delete_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Deletes up to `limit` carts that expired before `now`.
    pub(crate) async fn delete_expired(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
        limit: u32,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_EXPIRED_CARTS_SQL)
            .bind(SqlxTimestamp::from(now))
            .bind(i64::from(limit))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn decode_owner(row: &PgRow) -> sqlx::Result<CartOwner> {
    let user: Option<uuid::Uuid> = row.try_get("user_uuid")?;
    let session: Option<String> = row.try_get("session_token")?;

    match (user, session) {
        (Some(user), None) => Ok(CartOwner::User(UserUuid::from_uuid(user))),
        (None, Some(session)) => Ok(CartOwner::Guest(SessionToken::new(session))),
        _ => Err(sqlx::Error::ColumnDecode {
            index: "user_uuid".to_string(),
            source: "cart must have exactly one owner".into(),
        }),
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            owner: decode_owner(row)?,
            coupon_code: row.try_get("coupon_code")?,
            discount_amount: try_get_amount(row, "discount_amount")?,
            expires_at: row
                .try_get::<Option<SqlxTimestamp>, _>("expires_at")?
                .map(SqlxTimestamp::to_jiff),
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
