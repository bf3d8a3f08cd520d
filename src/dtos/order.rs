//! Order DTOs

use crate::core::money::format_amount;
use crate::entities::{Order, OrderItem, OrderPaymentStatus, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrderItemDTO {
    pub order_item_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<OrderItem> for OrderItemDTO {
    fn from(value: OrderItem) -> Self {
        Self {
            order_item_id: value.order_item_id,
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: format_amount(value.unit_price),
            line_total: format_amount(value.line_total()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrderDTO {
    pub order_id: i32,
    pub user_id: i32,
    pub employee_id: Option<i32>,
    pub total_amount: String,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub shipping_address: String,
    pub items: Vec<OrderItemDTO>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderDTO {
    fn from(value: Order) -> Self {
        Self {
            order_id: value.order_id,
            user_id: value.user_id,
            employee_id: value.employee_id,
            total_amount: format_amount(value.total_amount),
            status: value.status,
            payment_status: value.payment_status,
            shipping_address: value.shipping_address,
            items: Vec::new(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl OrderDTO {
    pub fn with_items(mut self, items: Vec<OrderItem>) -> Self {
        self.items = items.into_iter().map(OrderItemDTO::from).collect();
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct OrderLineDTO {
    pub product_id: i32,
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
}

/// Body of `POST /orders`
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateOrderDTO {
    #[validate(length(min = 1, message = "An order needs at least one item"), nested)]
    pub items: Vec<OrderLineDTO>,
    #[validate(length(min = 5, max = 512, message = "Shipping address must be between 5 and 512 characters"))]
    pub shipping_address: String,
}

impl CreateOrderDTO {
    /// Merges repeated products into one line each, ordered by product id.
    pub fn merged_lines(&self) -> Vec<OrderLineDTO> {
        let mut merged: BTreeMap<i32, i32> = BTreeMap::new();
        for line in &self.items {
            *merged.entry(line.product_id).or_insert(0) += line.quantity;
        }
        merged
            .into_iter()
            .map(|(product_id, quantity)| OrderLineDTO {
                product_id,
                quantity,
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateOrderStatusDTO {
    pub status: OrderStatus,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct OrderQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}
