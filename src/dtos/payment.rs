//! Payment DTOs - eSewa form and callbacks

use crate::core::money::format_amount;
use crate::entities::{Payment, PaymentProvider, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InitiatePaymentDTO {
    pub order_id: i32,
}

/// Everything the browser needs to POST the eSewa payment form
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EsewaFormDTO {
    pub url: String,
    pub amount: String,
    pub tax_amount: String,
    pub total_amount: String,
    pub transaction_uuid: String,
    pub product_code: String,
    pub product_service_charge: String,
    pub product_delivery_charge: String,
    pub success_url: String,
    pub failure_url: String,
    pub signed_field_names: String,
    pub signature: String,
}

/// Query string of the gateway redirects (`?data=<base64 json>`)
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CallbackQuery {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PaymentDTO {
    pub payment_id: i32,
    pub order_id: i32,
    pub transaction_uuid: String,
    pub amount: String,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDTO {
    fn from(value: Payment) -> Self {
        Self {
            payment_id: value.payment_id,
            order_id: value.order_id,
            transaction_uuid: value.transaction_uuid,
            amount: format_amount(value.amount),
            provider: value.provider,
            status: value.status,
            reference_id: value.reference_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
