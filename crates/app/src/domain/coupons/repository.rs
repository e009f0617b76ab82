//! Coupons Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::domain::{
    actors::UserUuid,
    columns::{try_get_amount, try_get_optional_amount},
    coupons::records::{CouponDiscount, CouponRecord, CouponUuid},
    orders::records::OrderUuid,
};

const FIND_COUPON_SQL: &str = include_str!("sql/find_coupon.sql");
const LOCK_COUPON_SQL: &str = include_str!("sql/lock_coupon.sql");
const COUNT_USER_REDEMPTIONS_SQL: &str = include_str!("sql/count_user_redemptions.sql");
const INCREMENT_USAGE_SQL: &str = include_str!("sql/increment_usage.sql");
const CREATE_REDEMPTION_SQL: &str = include_str!("sql/create_redemption.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponsRepository;

impl PgCouponsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn find_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(FIND_COUPON_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Like [`Self::find_by_code`] but holds the row lock until commit, so
    /// `used_count` cannot move underneath a checkout.
    pub(crate) async fn lock_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(LOCK_COUPON_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn count_user_redemptions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
    ) -> Result<u64, sqlx::Error> {
        let count: i64 = query_scalar(COUNT_USER_REDEMPTIONS_SQL)
            .bind(coupon.into_uuid())
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
            index: "count".to_string(),
            source: Box::new(e),
        })
    }

    /// Bumps `used_count` unless the usage limit is already met. Returns the
    /// affected row count.
    pub(crate) async fn increment_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(INCREMENT_USAGE_SQL)
            .bind(coupon.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn create_redemption(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_REDEMPTION_SQL)
            .bind(uuid::Uuid::now_v7())
            .bind(coupon.into_uuid())
            .bind(user.into_uuid())
            .bind(order.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: crate::domain::coupons::data::NewCoupon,
    ) -> Result<CouponRecord, sqlx::Error> {
        use crate::domain::columns::try_i64_from_u64;

        let (amount, percentage, max_discount) = match &coupon.discount {
            CouponDiscount::FixedAmount { amount } => (Some(*amount), None, None),
            CouponDiscount::Percentage {
                percentage,
                max_discount,
            } => (None, Some(*percentage), *max_discount),
            CouponDiscount::Unsupported { .. } => (None, None, None),
        };

        let to_i64 = |value: Option<u64>, column: &'static str| {
            value.map(|v| try_i64_from_u64(v, column)).transpose()
        };

        query_as::<Postgres, CouponRecord>(include_str!("sql/create_coupon.sql"))
            .bind(coupon.uuid.into_uuid())
            .bind(coupon.code)
            .bind(coupon.discount.kind().to_string())
            .bind(to_i64(amount, "amount")?)
            .bind(percentage)
            .bind(to_i64(max_discount, "max_discount_amount")?)
            .bind(to_i64(coupon.min_purchase_amount, "min_purchase_amount")?)
            .bind(to_i64(coupon.usage_limit, "usage_limit")?)
            .bind(to_i64(coupon.usage_limit_per_user, "usage_limit_per_user")?)
            .bind(coupon.is_active)
            .bind(coupon.starts_at.map(SqlxTimestamp::from))
            .bind(coupon.expires_at.map(SqlxTimestamp::from))
            .fetch_one(&mut **tx)
            .await
    }
}

fn decode_discount(row: &PgRow) -> sqlx::Result<CouponDiscount> {
    let kind: String = row.try_get("kind")?;

    let discount = match kind.as_str() {
        "fixed" => CouponDiscount::FixedAmount {
            amount: try_get_optional_amount(row, "amount")?.unwrap_or(0),
        },
        "percentage" => CouponDiscount::Percentage {
            percentage: row
                .try_get::<Option<Decimal>, _>("percentage")?
                .unwrap_or(Decimal::ZERO),
            max_discount: try_get_optional_amount(row, "max_discount_amount")?,
        },
        _ => CouponDiscount::Unsupported { kind },
    };

    Ok(discount)
}

impl<'r> FromRow<'r, PgRow> for CouponRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CouponUuid::from_uuid(row.try_get("uuid")?),
            code: row.try_get("code")?,
            discount: decode_discount(row)?,
            min_purchase_amount: try_get_optional_amount(row, "min_purchase_amount")?,
            usage_limit: try_get_optional_amount(row, "usage_limit")?,
            usage_limit_per_user: try_get_optional_amount(row, "usage_limit_per_user")?,
            used_count: try_get_amount(row, "used_count")?,
            is_active: row.try_get("is_active")?,
            starts_at: row
                .try_get::<Option<SqlxTimestamp>, _>("starts_at")?
                .map(SqlxTimestamp::to_jiff),
            expires_at: row
                .try_get::<Option<SqlxTimestamp>, _>("expires_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
