//! ProductRepository - shop inventory

use super::{Create, Read, Update};
use crate::dtos::{CreateProductDTO, UpdateProductDTO};
use crate::entities::Product;
use sqlx::{Error, MySql, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

pub struct ProductRepository {
    connection_pool: MySqlPool,
}

/// Filters for the public product listing
#[derive(Debug, Default)]
pub struct ProductFilter<'a> {
    pub category_id: Option<i32>,
    pub search: Option<&'a str>,
    pub limit: u32,
    pub offset: u64,
}

impl ProductRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    fn push_filters(query_builder: &mut QueryBuilder<'_, MySql>, filter: &ProductFilter<'_>) {
        query_builder.push(" WHERE is_active = TRUE");
        if let Some(category_id) = filter.category_id {
            query_builder.push(" AND category_id = ");
            query_builder.push_bind(category_id);
        }
        if let Some(search) = filter.search {
            query_builder.push(" AND name LIKE ");
            query_builder.push_bind(format!("%{}%", search));
        }
    }

    /// Returns one page of active products plus the total match count
    #[instrument(skip(self))]
    pub async fn list_active(
        &self,
        filter: &ProductFilter<'_>,
    ) -> Result<(Vec<Product>, i64), Error> {
        let mut count_query = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM products");
        Self::push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut query_builder = QueryBuilder::<MySql>::new(
            r#"SELECT product_id, name, description, price, stock, category_id, image_url,
                      is_active, created_at, updated_at
               FROM products"#,
        );
        Self::push_filters(&mut query_builder, filter);
        query_builder.push(" ORDER BY name, product_id LIMIT ");
        query_builder.push_bind(filter.limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(filter.offset);

        let products = query_builder
            .build_query_as::<Product>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} of {} products", products.len(), total);
        Ok((products, total))
    }

    /// Soft delete: order history keeps referencing the product
    #[instrument(skip(self))]
    pub async fn deactivate(&self, product_id: &i32) -> Result<(), Error> {
        let result = sqlx::query("UPDATE products SET is_active = FALSE WHERE product_id = ?")
            .bind(product_id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 && self.read(product_id).await?.is_none() {
            return Err(Error::RowNotFound);
        }
        info!("Product deactivated");
        Ok(())
    }
}

impl Create<Product, CreateProductDTO> for ProductRepository {
    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create(&self, data: &CreateProductDTO) -> Result<Product, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (name, description, price, stock, category_id, image_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.stock)
        .bind(data.category_id)
        .bind(&data.image_url)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Product created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Product, i32> for ProductRepository {
    async fn read(&self, id: &i32) -> Result<Option<Product>, Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, description, price, stock, category_id, image_url,
                   is_active, created_at, updated_at
            FROM products
            WHERE product_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Product, UpdateProductDTO, i32> for ProductRepository {
    #[instrument(skip(self, data), fields(product_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateProductDTO) -> Result<Product, Error> {
        self.read(id).await?.ok_or(Error::RowNotFound)?;

        let mut query_builder = QueryBuilder::<MySql>::new("UPDATE products SET ");
        let mut separated = query_builder.separated(", ");
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
        if let Some(stock) = data.stock {
            separated.push("stock = ");
            separated.push_bind_unseparated(stock);
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
        query_builder.push(" WHERE product_id = ");
        query_builder.push_bind(id);
        query_builder.build().execute(&self.connection_pool).await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::MySqlPool;

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "catalog")))]
    async fn test_list_active_paginates(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = ProductRepository::new(pool);
        let (page, total) = repo
            .list_active(&ProductFilter {
                limit: 1,
                offset: 0,
                ..Default::default()
            })
            .await?;
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Car Shampoo");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "catalog")))]
    async fn test_list_active_searches_by_name(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = ProductRepository::new(pool);
        let (found, total) = repo
            .list_active(&ProductFilter {
                search: Some("cloth"),
                limit: 20,
                ..Default::default()
            })
            .await?;
        assert_eq!(total, 1);
        assert_eq!(found[0].product_id, 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "catalog")))]
    async fn test_deactivate_missing_product(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = ProductRepository::new(pool);
        assert!(matches!(repo.deactivate(&999).await, Err(Error::RowNotFound)));
        repo.deactivate(&1).await?;
        assert!(!repo.read(&1).await?.unwrap().is_active);
        Ok(())
    }
}
