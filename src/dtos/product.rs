//! Product DTOs

use super::validation::validate_price;
use crate::core::money::format_amount;
use crate::entities::Product;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Serialize, Deserialize, Debug)]
pub struct ProductDTO {
    pub product_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub stock: i32,
    pub category_id: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductDTO {
    fn from(value: Product) -> Self {
        Self {
            product_id: value.product_id,
            name: value.name,
            description: value.description,
            price: format_amount(value.price),
            stock: value.stock,
            category_id: value.category_id,
            image_url: value.image_url,
            is_active: value.is_active,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateProductDTO {
    #[validate(length(min = 1, max = 150, message = "Product name must be between 1 and 150 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    pub category_id: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateProductDTO {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ProductQuery {
    #[serde(default)]
    pub category_id: Option<i32>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl ProductQuery {
    /// Returns (page, per_page) with page >= 1 and per_page clamped to the maximum.
    pub fn pagination(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, per_page)
    }

    /// Rows to skip for the requested page; widened so huge pages cannot overflow.
    pub fn offset(&self) -> u64 {
        let (page, per_page) = self.pagination();
        u64::from(page - 1) * u64::from(per_page)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageDTO<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}
