//! Staff DTOs - employees and their reviews

use super::validation::PHONE_REGEX;
use crate::core::money::format_amount;
use crate::entities::{Employee, StaffReview};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug)]
pub struct EmployeeDTO {
    pub employee_id: i32,
    pub user_id: Option<i32>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Employee> for EmployeeDTO {
    fn from(value: Employee) -> Self {
        Self {
            employee_id: value.employee_id,
            user_id: value.user_id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            position: value.position,
            is_available: value.is_available,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateEmployeeDTO {
    pub user_id: Option<i32>,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_REGEX, message = "Phone must contain 7 to 15 digits"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub position: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateEmployeeDTO {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_REGEX, message = "Phone must contain 7 to 15 digits"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub position: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct StaffQuery {
    #[serde(default)]
    pub available: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ReviewDTO {
    pub review_id: i32,
    pub employee_id: i32,
    pub user_id: i32,
    pub appointment_id: Option<i32>,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StaffReview> for ReviewDTO {
    fn from(value: StaffReview) -> Self {
        Self {
            review_id: value.review_id,
            employee_id: value.employee_id,
            user_id: value.user_id,
            appointment_id: value.appointment_id,
            rating: value.rating,
            comment: value.comment,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateReviewDTO {
    pub appointment_id: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ReviewSummaryDTO {
    pub employee_id: i32,
    pub review_count: usize,
    /// Mean rating with two decimals, absent when nobody reviewed yet
    pub average_rating: Option<String>,
    pub reviews: Vec<ReviewDTO>,
}

impl ReviewSummaryDTO {
    pub fn from_reviews(employee_id: i32, reviews: Vec<StaffReview>) -> Self {
        let review_count = reviews.len();
        let average_rating = if review_count == 0 {
            None
        } else {
            let sum: i64 = reviews.iter().map(|r| r.rating as i64).sum();
            Some(format_amount(
                Decimal::from(sum) / Decimal::from(review_count as i64),
            ))
        };
        Self {
            employee_id,
            review_count,
            average_rating,
            reviews: reviews.into_iter().map(ReviewDTO::from).collect(),
        }
    }
}

/// Work assigned to the calling staff member
#[derive(Serialize, Deserialize, Debug)]
pub struct StaffTasksDTO {
    pub employee: EmployeeDTO,
    pub appointments: Vec<super::AppointmentDTO>,
    pub orders: Vec<super::OrderDTO>,
}
