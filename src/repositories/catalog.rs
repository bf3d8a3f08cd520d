//! CategoryRepository and ServiceRepository - the browsable catalog

use super::{Create, Delete, Read, Update};
use crate::dtos::{CreateCategoryDTO, CreateServiceDTO, UpdateCategoryDTO, UpdateServiceDTO};
use crate::entities::{Category, Feature, Service};
use sqlx::{Error, MySql, MySqlPool, QueryBuilder, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

// CATEGORY REPOSITORY
pub struct CategoryRepository {
    connection_pool: MySqlPool,
}

impl CategoryRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>, Error> {
        sqlx::query_as::<_, Category>(
            "SELECT category_id, name, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Create<Category, CreateCategoryDTO> for CategoryRepository {
    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create(&self, data: &CreateCategoryDTO) -> Result<Category, Error> {
        let result = sqlx::query("INSERT INTO categories (name, description) VALUES (?, ?)")
            .bind(&data.name)
            .bind(&data.description)
            .execute(&self.connection_pool)
            .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Category created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Category, i32> for CategoryRepository {
    async fn read(&self, id: &i32) -> Result<Option<Category>, Error> {
        sqlx::query_as::<_, Category>(
            "SELECT category_id, name, description, created_at FROM categories WHERE category_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Category, UpdateCategoryDTO, i32> for CategoryRepository {
    #[instrument(skip(self, data), fields(category_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateCategoryDTO) -> Result<Category, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;
        if data.name.is_none() && data.description.is_none() {
            debug!("No fields to update, returning current category");
            return Ok(current);
        }

        let mut query_builder = QueryBuilder::<MySql>::new("UPDATE categories SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        query_builder.push(" WHERE category_id = ");
        query_builder.push_bind(id);
        query_builder.build().execute(&self.connection_pool).await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}

impl Delete<i32> for CategoryRepository {
    /// Services and products in the category keep existing, uncategorised
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM categories WHERE category_id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }
}

// SERVICE REPOSITORY
pub struct ServiceRepository {
    connection_pool: MySqlPool,
}

impl ServiceRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_active(&self, category_id: Option<i32>) -> Result<Vec<Service>, Error> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT service_id, name, description, price, duration_minutes, category_id,
                   image_url, is_active, created_at, updated_at
            FROM services
            WHERE is_active = TRUE AND (? IS NULL OR category_id = ?)
            ORDER BY name
            "#,
        )
        .bind(category_id)
        .bind(category_id)
        .fetch_all(&self.connection_pool)
        .await?;
        debug!("Found {} active services", services.len());
        Ok(services)
    }

    pub async fn features_of(&self, service_id: &i32) -> Result<Vec<Feature>, Error> {
        sqlx::query_as::<_, Feature>(
            "SELECT feature_id, service_id, name FROM features WHERE service_id = ? ORDER BY feature_id",
        )
        .bind(service_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Features of several services in one query, grouped by service id
    pub async fn features_by_service(
        &self,
        service_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<Feature>>, Error> {
        let mut grouped: HashMap<i32, Vec<Feature>> = HashMap::new();
        if service_ids.is_empty() {
            return Ok(grouped);
        }

        let mut query_builder = QueryBuilder::<MySql>::new(
            "SELECT feature_id, service_id, name FROM features WHERE service_id IN (",
        );
        let mut separated = query_builder.separated(", ");
        for id in service_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY feature_id");

        let features = query_builder
            .build_query_as::<Feature>()
            .fetch_all(&self.connection_pool)
            .await?;
        for feature in features {
            grouped.entry(feature.service_id).or_default().push(feature);
        }
        Ok(grouped)
    }

    /// Soft delete: bookings keep pointing at the row
    #[instrument(skip(self))]
    pub async fn deactivate(&self, service_id: &i32) -> Result<(), Error> {
        let result = sqlx::query("UPDATE services SET is_active = FALSE WHERE service_id = ?")
            .bind(service_id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 && self.read(service_id).await?.is_none() {
            return Err(Error::RowNotFound);
        }
        info!("Service deactivated");
        Ok(())
    }

    async fn replace_features(
        tx: &mut Transaction<'_, MySql>,
        service_id: i32,
        features: &[String],
    ) -> Result<(), Error> {
        sqlx::query("DELETE FROM features WHERE service_id = ?")
            .bind(service_id)
            .execute(&mut **tx)
            .await?;
        for name in features.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
            sqlx::query("INSERT INTO features (service_id, name) VALUES (?, ?)")
                .bind(service_id)
                .bind(name)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

impl Create<Service, CreateServiceDTO> for ServiceRepository {
    /// Inserts the service and its features in one transaction
    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create(&self, data: &CreateServiceDTO) -> Result<Service, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO services (name, description, price, duration_minutes, category_id, image_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.duration_minutes)
        .bind(data.category_id)
        .bind(&data.image_url)
        .execute(&mut *tx)
        .await?;

        let new_id = result.last_insert_id() as i32;
        Self::replace_features(&mut tx, new_id, &data.features).await?;
        tx.commit().await?;

        info!("Service created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Service, i32> for ServiceRepository {
    async fn read(&self, id: &i32) -> Result<Option<Service>, Error> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT service_id, name, description, price, duration_minutes, category_id,
                   image_url, is_active, created_at, updated_at
            FROM services
            WHERE service_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Service, UpdateServiceDTO, i32> for ServiceRepository {
    #[instrument(skip(self, data), fields(service_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateServiceDTO) -> Result<Service, Error> {
        self.read(id).await?.ok_or(Error::RowNotFound)?;

        let mut tx = self.connection_pool.begin().await?;

        let mut query_builder = QueryBuilder::<MySql>::new("UPDATE services SET ");
        let mut separated = query_builder.separated(", ");
        // always touch updated_at so the builder never produces an empty SET
        separated.push("updated_at = CURRENT_TIMESTAMP");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(price) = data.price {
            separated.push("price = ");
            separated.push_bind_unseparated(price);
        }
        if let Some(duration) = data.duration_minutes {
            separated.push("duration_minutes = ");
            separated.push_bind_unseparated(duration);
        }
        if let Some(category_id) = data.category_id {
            separated.push("category_id = ");
            separated.push_bind_unseparated(category_id);
        }
        if let Some(ref image_url) = data.image_url {
            separated.push("image_url = ");
            separated.push_bind_unseparated(image_url);
        }
        if let Some(is_active) = data.is_active {
            separated.push("is_active = ");
            separated.push_bind_unseparated(is_active);
        }
        query_builder.push(" WHERE service_id = ");
        query_builder.push_bind(id);
        query_builder.build().execute(&mut *tx).await?;

        if let Some(ref features) = data.features {
            Self::replace_features(&mut tx, *id, features).await?;
        }
        tx.commit().await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
