//! PaymentRepository - gateway transactions attached to orders

use super::Read;
use crate::entities::{OrderPaymentStatus, OrderStatus, Payment, PaymentProvider, PaymentStatus};
use rust_decimal::Decimal;
use sqlx::{Error, MySqlPool};
use tracing::{info, instrument, warn};

/// Pending payment to record before redirecting to the gateway
pub struct NewPayment<'a> {
    pub order_id: i32,
    pub transaction_uuid: &'a str,
    pub amount: Decimal,
}

/// What a gateway success did to the payment and its order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Settled,
    /// the payment was already COMPLETED
    Replayed,
    /// the order was cancelled or paid through another payment
    Rejected,
}

pub struct PaymentRepository {
    connection_pool: MySqlPool,
}

impl PaymentRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self, data), fields(order_id = %data.order_id, transaction_uuid = %data.transaction_uuid))]
    pub async fn create(&self, data: &NewPayment<'_>) -> Result<Payment, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (order_id, transaction_uuid, amount, provider, status)
            VALUES (?, ?, ?, ?, 'PENDING')
            "#,
        )
        .bind(data.order_id)
        .bind(data.transaction_uuid)
        .bind(data.amount)
        .bind(PaymentProvider::Esewa)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Payment {} recorded as PENDING", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }

    pub async fn find_by_transaction_uuid(
        &self,
        transaction_uuid: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, order_id, transaction_uuid, amount, provider, status, reference_id,
                   created_at, updated_at
            FROM payments
            WHERE transaction_uuid = ?
            "#,
        )
        .bind(transaction_uuid)
        .fetch_optional(&self.connection_pool)
        .await
    }

    pub async fn list_by_order(&self, order_id: &i32) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, order_id, transaction_uuid, amount, provider, status, reference_id,
                   created_at, updated_at
            FROM payments
            WHERE order_id = ?
            ORDER BY payment_id DESC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Most recent PENDING payment of an order, reused when checkout is retried
    pub async fn find_open_for_order(&self, order_id: &i32) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, order_id, transaction_uuid, amount, provider, status, reference_id,
                   created_at, updated_at
            FROM payments
            WHERE order_id = ? AND status = 'PENDING'
            ORDER BY payment_id DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Applies a gateway success under a lock on the order row, so a cancel
    /// or a second payment cannot interleave.
    #[instrument(skip(self))]
    pub async fn settle_success(
        &self,
        payment_id: &i32,
        order_id: &i32,
        reference_id: &str,
    ) -> Result<Settlement, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let (order_status, order_payment): (OrderStatus, OrderPaymentStatus) = sqlx::query_as(
            "SELECT status, payment_status FROM orders WHERE order_id = ? FOR UPDATE",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
        let payment_status: PaymentStatus =
            sqlx::query_scalar("SELECT status FROM payments WHERE payment_id = ? FOR UPDATE")
                .bind(payment_id)
                .fetch_one(&mut *tx)
                .await?;

        if payment_status == PaymentStatus::Completed {
            warn!("Payment already settled");
            tx.rollback().await?;
            return Ok(Settlement::Replayed);
        }

        if order_status == OrderStatus::Cancelled || order_payment == OrderPaymentStatus::Paid {
            // money moved at the gateway; keep the reference for the refund
            sqlx::query("UPDATE payments SET status = 'FAILED', reference_id = ? WHERE payment_id = ?")
                .bind(reference_id)
                .bind(payment_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            warn!(
                ?order_status,
                ?order_payment,
                "Payment arrived for a closed order"
            );
            return Ok(Settlement::Rejected);
        }

        sqlx::query("UPDATE payments SET status = 'COMPLETED', reference_id = ? WHERE payment_id = ?")
            .bind(reference_id)
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE orders SET payment_status = 'PAID' WHERE order_id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Payment settled, order marked PAID");
        Ok(Settlement::Settled)
    }

    /// Marks a PENDING payment FAILED; the order follows unless it was paid meanwhile.
    #[instrument(skip(self))]
    pub async fn mark_failed(&self, payment_id: &i32, order_id: &i32) -> Result<bool, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query(
            "UPDATE payments SET status = 'FAILED' WHERE payment_id = ? AND status = 'PENDING'",
        )
        .bind(payment_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE orders SET payment_status = 'FAILED' WHERE order_id = ? AND payment_status <> 'PAID'",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Payment marked FAILED");
        Ok(true)
    }
}

impl Read<Payment, i32> for PaymentRepository {
    async fn read(&self, id: &i32) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, order_id, transaction_uuid, amount, provider, status, reference_id,
                   created_at, updated_at
            FROM payments
            WHERE payment_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
