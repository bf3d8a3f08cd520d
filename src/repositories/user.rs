//! UserRepository - local mirror of identity-provider accounts

use super::Read;
use crate::dtos::UpsertUserDTO;
use crate::entities::{User, UserRole};
use sqlx::{Error, MySqlPool};
use tracing::{debug, info, instrument};

pub struct UserRepository {
    connection_pool: MySqlPool,
}

impl UserRepository {
    pub fn new(connection_pool: MySqlPool) -> UserRepository {
        Self { connection_pool }
    }

    /// Finds the user mapped to an identity-provider id (token `sub`)
    #[instrument(skip(self))]
    pub async fn find_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, auth_id, email, first_name, last_name, image_url, phone, role,
                   created_at, updated_at
            FROM users
            WHERE auth_id = ?
            "#,
        )
        .bind(auth_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }

    /// Inserts the account or refreshes it when the auth id is already known.
    /// The role is only overwritten when the provider sent one.
    #[instrument(skip(self, data), fields(auth_id = %data.auth_id))]
    pub async fn upsert(&self, data: &UpsertUserDTO) -> Result<User, Error> {
        debug!("Upserting user from identity provider");
        sqlx::query(
            r#"
            INSERT INTO users (auth_id, email, first_name, last_name, image_url, phone, role)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                email = VALUES(email),
                first_name = VALUES(first_name),
                last_name = VALUES(last_name),
                image_url = VALUES(image_url),
                phone = COALESCE(VALUES(phone), phone),
                role = IF(?, VALUES(role), role)
            "#,
        )
        .bind(&data.auth_id)
        .bind(&data.email)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.image_url)
        .bind(&data.phone)
        .bind(data.role.unwrap_or(UserRole::Customer))
        .bind(data.role.is_some())
        .execute(&self.connection_pool)
        .await?;

        let user = self
            .find_by_auth_id(&data.auth_id)
            .await?
            .ok_or(Error::RowNotFound)?;
        info!("User {} synchronised", user.user_id);
        Ok(user)
    }

    /// Removes the account deleted on the provider side. Returns false when unknown.
    #[instrument(skip(self))]
    pub async fn delete_by_auth_id(&self, auth_id: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM users WHERE auth_id = ?")
            .bind(auth_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, role: Option<UserRole>) -> Result<Vec<User>, Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, auth_id, email, first_name, last_name, image_url, phone, role,
                   created_at, updated_at
            FROM users
            WHERE (? IS NULL OR role = ?)
            ORDER BY user_id
            "#,
        )
        .bind(role)
        .bind(role)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn update_phone(&self, user_id: &i32, phone: Option<&str>) -> Result<User, Error> {
        sqlx::query("UPDATE users SET phone = ? WHERE user_id = ?")
            .bind(phone)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        self.read(user_id).await?.ok_or(Error::RowNotFound)
    }

    #[instrument(skip(self))]
    pub async fn update_role(&self, user_id: &i32, role: UserRole) -> Result<User, Error> {
        // rows_affected is 0 for an unchanged role too, so read back instead
        sqlx::query("UPDATE users SET role = ? WHERE user_id = ?")
            .bind(role)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        self.read(user_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<User, i32> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, auth_id, email, first_name, last_name, image_url, phone, role,
                   created_at, updated_at
            FROM users
            WHERE user_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::MySqlPool;

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_find_by_auth_id(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let bob = repo.find_by_auth_id("user_customer_bob").await?.unwrap();
        assert_eq!(bob.user_id, 2);
        assert_eq!(bob.role, UserRole::Customer);
        assert!(repo.find_by_auth_id("user_unknown").await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_upsert_inserts_then_updates(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let mut data = UpsertUserDTO {
            auth_id: "user_new_erin".to_string(),
            email: "erin@washbay.test".to_string(),
            first_name: Some("Erin".to_string()),
            last_name: None,
            image_url: None,
            phone: None,
            role: None,
        };
        let created = repo.upsert(&data).await?;
        assert_eq!(created.role, UserRole::Customer);

        data.email = "erin@new.test".to_string();
        data.role = Some(UserRole::Staff);
        let updated = repo.upsert(&data).await?;
        assert_eq!(updated.user_id, created.user_id);
        assert_eq!(updated.email, "erin@new.test");
        assert_eq!(updated.role, UserRole::Staff);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_upsert_keeps_role_when_absent(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let data = UpsertUserDTO {
            auth_id: "user_admin_alice".to_string(),
            email: "alice@washbay.test".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: Some("Admin".to_string()),
            image_url: None,
            phone: None,
            role: None,
        };
        let alice = repo.upsert(&data).await?;
        assert_eq!(alice.role, UserRole::Admin);
        assert_eq!(alice.phone.as_deref(), Some("9800000001"));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_list_filters_by_role(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        assert_eq!(repo.list(None).await?.len(), 4);
        let customers = repo.list(Some(UserRole::Customer)).await?;
        assert_eq!(customers.len(), 2);
        Ok(())
    }
}
