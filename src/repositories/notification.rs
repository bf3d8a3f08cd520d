//! NotificationRepository - per-user inbox

use super::Create;
use crate::dtos::NewNotification;
use crate::entities::Notification;
use sqlx::{Error, MySqlPool};
use tracing::{debug, instrument};

pub struct NotificationRepository {
    connection_pool: MySqlPool,
}

impl NotificationRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: &i32,
        unread_only: bool,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT notification_id, user_id, kind, title, message, is_read, created_at
            FROM notifications
            WHERE user_id = ? AND (? = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, notification_id DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn find_owned(
        &self,
        notification_id: &i32,
        user_id: &i32,
    ) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT notification_id, user_id, kind, title, message, is_read, created_at
            FROM notifications
            WHERE notification_id = ? AND user_id = ?
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Returns the updated row, `None` when it does not belong to `user_id`
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        notification_id: &i32,
        user_id: &i32,
    ) -> Result<Option<Notification>, Error> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE notification_id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        self.find_owned(notification_id, user_id).await
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: &i32) -> Result<u64, Error> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE")
                .bind(user_id)
                .execute(&self.connection_pool)
                .await?;
        debug!("{} notifications marked read", result.rows_affected());
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn delete_owned(&self, notification_id: &i32, user_id: &i32) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE notification_id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, user_id: &i32) -> Result<i64, Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Create<Notification, NewNotification> for NotificationRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id, kind = ?data.kind))]
    async fn create(&self, data: &NewNotification) -> Result<Notification, Error> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, kind, title, message) VALUES (?, ?, ?, ?)",
        )
        .bind(data.user_id)
        .bind(data.kind)
        .bind(&data.title)
        .bind(&data.message)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        self.find_owned(&new_id, &data.user_id)
            .await?
            .ok_or(Error::RowNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::NotificationKind;
    use sqlx::MySqlPool;

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "notifications")))]
    async fn test_listing_and_counts(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = NotificationRepository::new(pool);
        assert_eq!(repo.list_for_user(&2, false).await?.len(), 2);
        assert_eq!(repo.list_for_user(&2, true).await?.len(), 1);
        assert_eq!(repo.unread_count(&2).await?, 1);

        let created = repo
            .create(&NewNotification {
                user_id: 2,
                kind: NotificationKind::System,
                title: "Welcome".to_string(),
                message: "Thanks for joining".to_string(),
            })
            .await?;
        assert!(!created.is_read);
        assert_eq!(repo.unread_count(&2).await?, 2);
        assert_eq!(repo.mark_all_read(&2).await?, 2);
        assert_eq!(repo.unread_count(&2).await?, 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "notifications")))]
    async fn test_foreign_notifications_are_untouched(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = NotificationRepository::new(pool);
        assert!(repo.mark_read(&3, &2).await?.is_none());
        assert!(!repo.delete_owned(&3, &2).await?);
        assert_eq!(repo.unread_count(&4).await?, 1);

        assert!(repo.mark_read(&1, &2).await?.unwrap().is_read);
        assert!(repo.delete_owned(&1, &2).await?);
        Ok(())
    }
}
