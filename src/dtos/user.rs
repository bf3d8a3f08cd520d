//! User DTOs

use super::validation::PHONE_REGEX;
use crate::entities::{User, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug)]
pub struct UserDTO {
    pub user_id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            user_id: value.user_id,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            image_url: value.image_url,
            phone: value.phone,
            role: value.role,
            created_at: value.created_at,
        }
    }
}

/// Account data coming from the identity provider (webhook payloads)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpsertUserDTO {
    pub auth_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateProfileDTO {
    #[validate(regex(path = *PHONE_REGEX, message = "Phone must contain 7 to 15 digits"))]
    pub phone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct UserQuery {
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateRoleDTO {
    pub role: UserRole,
}
