use super::enums::{PaymentProvider, PaymentStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Payment {
    pub payment_id: i32,
    pub order_id: i32,
    /// Our id for the gateway transaction, echoed back in callbacks
    pub transaction_uuid: String,
    pub amount: Decimal,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    /// Gateway reference (`transaction_code` for eSewa)
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
