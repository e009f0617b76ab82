//! Payments
//!
//! The boundary to payment gateways. Only offline methods ship with the
//! service; they leave the payment pending until settled out of band.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use thiserror::Error;
use tracing::info;

use crate::{
    domain::orders::records::{OrderRecord, OrderUuid, PaymentStatus},
    uuids::TypedUuid,
};

/// Payment UUID
pub type PaymentUuid = TypedUuid<Payment>;

pub const CASH_ON_DELIVERY: &str = "cash_on_delivery";
pub const BANK_TRANSFER: &str = "bank_transfer";

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub uuid: PaymentUuid,
    pub order_uuid: OrderUuid,
    pub method: String,
    pub amount: u64,
    pub status: PaymentStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("unsupported payment method: {0}")]
    UnsupportedMethod(String),

    #[error("payment was declined: {0}")]
    Declined(String),
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Whether `method` can be handled by this gateway.
    fn supports(&self, method: &str) -> bool;

    /// Create a payment for `order` using `method`.
    async fn create_payment(&self, order: &OrderRecord, method: &str)
    -> Result<Payment, PaymentError>;

    /// Attempt to settle a payment, returning it with its new status.
    async fn process_payment(&self, payment: Payment) -> Result<Payment, PaymentError>;
}

/// Cash on delivery and bank transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePaymentGateway;

#[async_trait]
impl PaymentGateway for OfflinePaymentGateway {
    fn supports(&self, method: &str) -> bool {
        matches!(method, CASH_ON_DELIVERY | BANK_TRANSFER)
    }

    async fn create_payment(
        &self,
        order: &OrderRecord,
        method: &str,
    ) -> Result<Payment, PaymentError> {
        if !self.supports(method) {
            return Err(PaymentError::UnsupportedMethod(method.to_string()));
        }

        Ok(Payment {
            uuid: PaymentUuid::new(),
            order_uuid: order.uuid,
            method: method.to_string(),
            amount: order.total,
            status: PaymentStatus::Pending,
            created_at: Timestamp::now(),
        })
    }

    async fn process_payment(&self, payment: Payment) -> Result<Payment, PaymentError> {
        info!(
            payment_uuid = %payment.uuid,
            order_uuid = %payment.order_uuid,
            method = %payment.method,
            "offline payment awaiting settlement"
        );

        Ok(payment)
    }
}
