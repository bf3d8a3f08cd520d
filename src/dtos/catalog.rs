//! Catalog DTOs - categories and wash services

use super::validation::validate_price;
use crate::core::money::format_amount;
use crate::entities::{Category, Feature, Service};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug)]
pub struct CategoryDTO {
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Category> for CategoryDTO {
    fn from(value: Category) -> Self {
        Self {
            category_id: value.category_id,
            name: value.name,
            description: value.description,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateCategoryDTO {
    #[validate(length(min = 1, max = 100, message = "Category name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateCategoryDTO {
    #[validate(length(min = 1, max = 100, message = "Category name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Wash service as exposed to clients; the price travels as a string.
#[derive(Serialize, Deserialize, Debug)]
pub struct ServiceDTO {
    pub service_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub duration_minutes: i32,
    pub category_id: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Service> for ServiceDTO {
    fn from(value: Service) -> Self {
        Self {
            service_id: value.service_id,
            name: value.name,
            description: value.description,
            price: format_amount(value.price),
            duration_minutes: value.duration_minutes,
            category_id: value.category_id,
            image_url: value.image_url,
            is_active: value.is_active,
            features: Vec::new(), // filled by the handler when needed
            created_at: value.created_at,
        }
    }
}

impl ServiceDTO {
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features.into_iter().map(|f| f.name).collect();
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateServiceDTO {
    #[validate(length(min = 1, max = 150, message = "Service name must be between 1 and 150 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(range(min = 5, max = 1440, message = "Duration must be between 5 and 1440 minutes"))]
    pub duration_minutes: i32,
    pub category_id: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateServiceDTO {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 5, max = 1440))]
    pub duration_minutes: Option<i32>,
    pub category_id: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the whole feature list when present
    pub features: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ServiceQuery {
    #[serde(default)]
    pub category_id: Option<i32>,
}
