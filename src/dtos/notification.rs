use crate::entities::{Notification, NotificationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationDTO {
    pub notification_id: i32,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDTO {
    fn from(value: Notification) -> Self {
        Self {
            notification_id: value.notification_id,
            kind: value.kind,
            title: value.title,
            message: value.message,
            is_read: value.is_read,
            created_at: value.created_at,
        }
    }
}

/// Row to insert
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i32,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UnreadCountDTO {
    pub unread: i64,
}
