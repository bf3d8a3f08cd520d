//! OrderRepository - shop orders and their line items

use super::Read;
use crate::dtos::OrderLineDTO;
use crate::entities::{Order, OrderItem, OrderStatus, Product};
use rust_decimal::Decimal;
use sqlx::{Error, MySql, MySqlPool, QueryBuilder};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument, warn};

/// Why an order could not be placed
#[derive(Debug, ThisError)]
pub enum PlaceOrderError {
    #[error("product {0} does not exist or is no longer sold")]
    ProductUnavailable(i32),
    #[error("product {product_id} has {available} left, {requested} requested")]
    InsufficientStock {
        product_id: i32,
        requested: i32,
        available: i32,
    },
    #[error(transparent)]
    Database(#[from] Error),
}

pub struct OrderRepository {
    connection_pool: MySqlPool,
}

const ORDER_COLUMNS: &str = "order_id, user_id, employee_id, total_amount, status, payment_status, \
                             shipping_address, created_at, updated_at";

impl OrderRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Places an order in one transaction: products are locked in id order,
    /// prices snapshotted into the items and stock decremented.
    /// `lines` must hold each product once.
    #[instrument(skip(self, lines, shipping_address), fields(lines = lines.len()))]
    pub async fn create_with_items(
        &self,
        user_id: &i32,
        lines: &[OrderLineDTO],
        shipping_address: &str,
    ) -> Result<Order, PlaceOrderError> {
        let mut tx = self.connection_pool.begin().await?;

        let mut priced: Vec<(&OrderLineDTO, Decimal)> = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;
        for line in lines {
            let product = sqlx::query_as::<_, Product>(
                r#"
                SELECT product_id, name, description, price, stock, category_id, image_url,
                       is_active, created_at, updated_at
                FROM products
                WHERE product_id = ?
                FOR UPDATE
                "#,
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            let product = match product {
                Some(product) if product.is_active => product,
                _ => return Err(PlaceOrderError::ProductUnavailable(line.product_id)),
            };
            if product.stock < line.quantity {
                warn!(
                    "Product {} short on stock: {} < {}",
                    product.product_id, product.stock, line.quantity
                );
                return Err(PlaceOrderError::InsufficientStock {
                    product_id: product.product_id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            total += product.price * Decimal::from(line.quantity);
            priced.push((line, product.price));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO orders (user_id, total_amount, status, payment_status, shipping_address)
            VALUES (?, ?, 'PENDING', 'UNPAID', ?)
            "#,
        )
        .bind(user_id)
        .bind(total)
        .bind(shipping_address)
        .execute(&mut *tx)
        .await?;
        let order_id = result.last_insert_id() as i32;

        for (line, unit_price) in &priced {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(unit_price)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET stock = stock - ? WHERE product_id = ?")
                .bind(line.quantity)
                .bind(line.product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Order {} placed, total {}", order_id, total);
        Ok(self.read(&order_id).await?.ok_or(Error::RowNotFound)?)
    }

    pub async fn items_for(&self, order_id: &i32) -> Result<Vec<OrderItem>, Error> {
        sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT order_item_id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ?
            ORDER BY order_item_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Items of several orders grouped by order id
    pub async fn items_by_order(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderItem>>, Error> {
        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let mut query_builder = QueryBuilder::<MySql>::new(
            "SELECT order_item_id, order_id, product_id, quantity, unit_price FROM order_items WHERE order_id IN (",
        );
        let mut separated = query_builder.separated(", ");
        for id in order_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY order_item_id");

        let items = query_builder
            .build_query_as::<OrderItem>()
            .fetch_all(&self.connection_pool)
            .await?;
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn list_where(
        &self,
        column: Option<(&'static str, i32)>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, Error> {
        let mut query_builder =
            QueryBuilder::<MySql>::new(format!("SELECT {} FROM orders WHERE 1 = 1", ORDER_COLUMNS));
        if let Some((column, id)) = column {
            query_builder.push(format!(" AND {} = ", column));
            query_builder.push_bind(id);
        }
        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        query_builder.push(" ORDER BY created_at DESC, order_id DESC");
        query_builder
            .build_query_as::<Order>()
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: &i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, Error> {
        self.list_where(Some(("user_id", *user_id)), status).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_employee(
        &self,
        employee_id: &i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, Error> {
        self.list_where(Some(("employee_id", *employee_id)), status)
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, Error> {
        self.list_where(None, status).await
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: &i32, status: OrderStatus) -> Result<Order, Error> {
        sqlx::query("UPDATE orders SET status = ? WHERE order_id = ?")
            .bind(status)
            .bind(order_id)
            .execute(&self.connection_pool)
            .await?;
        debug!("Order status set to {:?}", status);
        self.read(order_id).await?.ok_or(Error::RowNotFound)
    }

    #[instrument(skip(self))]
    pub async fn assign_employee(&self, order_id: &i32, employee_id: &i32) -> Result<Order, Error> {
        sqlx::query("UPDATE orders SET employee_id = ? WHERE order_id = ?")
            .bind(employee_id)
            .bind(order_id)
            .execute(&self.connection_pool)
            .await?;
        self.read(order_id).await?.ok_or(Error::RowNotFound)
    }

    /// Cancels a PENDING, unpaid order, expires its open payments and puts
    /// its items back on the shelf.
    /// Returns `None` when the order was no longer PENDING or got paid.
    #[instrument(skip(self))]
    pub async fn cancel_and_restock(&self, order_id: &i32) -> Result<Option<Order>, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = 'CANCELLED'
            WHERE order_id = ? AND status = 'PENDING' AND payment_status <> 'PAID'
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let expired = sqlx::query(
            "UPDATE payments SET status = 'FAILED' WHERE order_id = ? AND status = 'PENDING'",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
        if expired.rows_affected() > 0 {
            debug!("{} open payments expired", expired.rows_affected());
        }

        let restocked = sqlx::query(
            r#"
            UPDATE products p
            JOIN order_items oi ON oi.product_id = p.product_id
            SET p.stock = p.stock + oi.quantity
            WHERE oi.order_id = ?
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Order cancelled, {} product rows restocked",
            restocked.rows_affected()
        );
        self.read(order_id).await
    }
}

impl Read<Order, i32> for OrderRepository {
    async fn read(&self, id: &i32) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE order_id = ?",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{OrderPaymentStatus, PaymentStatus};
    use sqlx::MySqlPool;

    async fn stock_of(pool: &MySqlPool, product_id: i32) -> i32 {
        sqlx::query_scalar("SELECT stock FROM products WHERE product_id = ?")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "catalog")))]
    async fn test_create_snapshots_prices_and_decrements_stock(
        pool: MySqlPool,
    ) -> sqlx::Result<()> {
        let repo = OrderRepository::new(pool.clone());
        let lines = vec![
            OrderLineDTO { product_id: 1, quantity: 3 },
            OrderLineDTO { product_id: 2, quantity: 2 },
        ];
        let order = repo
            .create_with_items(&2, &lines, "Baneshwor, Kathmandu")
            .await
            .unwrap();

        assert_eq!(order.total_amount, Decimal::new(174998, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, OrderPaymentStatus::Unpaid);
        let items = repo.items_for(&order.order_id).await?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].unit_price, Decimal::new(19999, 2));
        assert_eq!(stock_of(&pool, 1).await, 7);
        assert_eq!(stock_of(&pool, 2).await, 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "catalog")))]
    async fn test_insufficient_stock_rolls_back(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = OrderRepository::new(pool.clone());
        let lines = vec![
            OrderLineDTO { product_id: 1, quantity: 1 },
            OrderLineDTO { product_id: 2, quantity: 5 },
        ];
        let err = repo
            .create_with_items(&2, &lines, "Baneshwor, Kathmandu")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock { product_id: 2, available: 2, .. }
        ));
        assert_eq!(stock_of(&pool, 1).await, 10);
        assert!(repo.list_for_user(&2, None).await?.is_empty());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "catalog")))]
    async fn test_inactive_product_is_unavailable(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = OrderRepository::new(pool);
        let lines = vec![OrderLineDTO { product_id: 3, quantity: 1 }];
        let err = repo
            .create_with_items(&2, &lines, "Baneshwor, Kathmandu")
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::ProductUnavailable(3)));
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "orders")
    ))]
    async fn test_cancel_restocks_only_pending(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = OrderRepository::new(pool.clone());
        let cancelled = repo.cancel_and_restock(&1).await?.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&pool, 1).await, 12);

        assert!(repo.cancel_and_restock(&1).await?.is_none());
        assert!(repo.cancel_and_restock(&2).await?.is_none());
        assert_eq!(stock_of(&pool, 2).await, 2);
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "orders", "payments")
    ))]
    async fn test_cancel_expires_open_payments(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = OrderRepository::new(pool.clone());
        repo.cancel_and_restock(&1).await?.unwrap();

        let status: PaymentStatus =
            sqlx::query_scalar("SELECT status FROM payments WHERE payment_id = 1")
                .fetch_one(&pool)
                .await?;
        assert_eq!(status, PaymentStatus::Failed);
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "orders")
    ))]
    async fn test_cancel_skips_paid_orders(pool: MySqlPool) -> sqlx::Result<()> {
        sqlx::query("UPDATE orders SET payment_status = 'PAID' WHERE order_id = 1")
            .execute(&pool)
            .await?;
        let repo = OrderRepository::new(pool.clone());
        assert!(repo.cancel_and_restock(&1).await?.is_none());
        assert_eq!(stock_of(&pool, 1).await, 10);
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "orders")
    ))]
    async fn test_listing_scopes(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = OrderRepository::new(pool);
        assert_eq!(repo.list_for_user(&2, None).await?.len(), 2);
        assert_eq!(repo.list_for_employee(&1, None).await?.len(), 1);
        assert_eq!(
            repo.list_all(Some(OrderStatus::Pending)).await?.len(),
            2
        );
        let grouped = repo.items_by_order(&[1, 2, 3]).await?;
        assert_eq!(grouped.len(), 3);
        Ok(())
    }
}
