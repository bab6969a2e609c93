//! PostgreSQL store
//!
//! sqlx-backed implementations of the store traits.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DomainError, Order, OrderLine, Page, Product, User, UserChanges};

use super::{OrderStore, ProductStore, StoreError, StoreResult, UserStore};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// SQLSTATE of a database error, if any
fn sql_state(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|code| code.into_owned())
}

fn is_violation(err: &sqlx::Error, state: &str) -> bool {
    sql_state(err).as_deref() == Some(state)
}

// =========================================================================
// Users
// =========================================================================

/// User persistence
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> StoreResult<User> {
        tracing::trace!("executing SQL query to create user");

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, firstname, lastname, email, password_hash, age, is_married)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, firstname, lastname, email, password_hash, age, is_married
            "#,
        )
        .bind(user.id)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(user.is_married)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                DomainError::Conflict("email is already registered".to_string()).into()
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        tracing::trace!("executing SQL query to find user by email");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, firstname, lastname, email, password_hash, age, is_married
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        tracing::trace!("executing SQL query to find user by id");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, firstname, lastname, email, password_hash, age, is_married
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> StoreResult<User> {
        tracing::trace!("executing SQL query to update user");

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                firstname = COALESCE($2, firstname),
                lastname = COALESCE($3, lastname),
                email = COALESCE($4, email),
                is_married = COALESCE($5, is_married),
                password_hash = COALESCE($6, password_hash)
            WHERE id = $1
            RETURNING id, firstname, lastname, email, password_hash, age, is_married
            "#,
        )
        .bind(id)
        .bind(changes.firstname.as_deref())
        .bind(changes.lastname.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.is_married)
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                DomainError::Conflict("email is already registered".to_string()).into()
            } else {
                StoreError::Database(e)
            }
        })?;

        user.ok_or_else(|| DomainError::not_found("User", id).into())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        tracing::trace!("executing SQL query to delete user");

        let rows_affected = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                    DomainError::Conflict("user still has orders".to_string()).into()
                } else {
                    StoreError::Database(e)
                }
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::not_found("User", id).into());
        }
        Ok(())
    }
}

// =========================================================================
// Products
// =========================================================================

/// Product persistence
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, product: &Product) -> StoreResult<Product> {
        tracing::trace!("executing SQL query to create product");

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, price, quantity, description, tags)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, price, quantity, description, tags
            "#,
        )
        .bind(product.id)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.description)
        .bind(&product.tags)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        tracing::trace!("executing SQL query to find product by id");

        let product = sqlx::query_as::<_, Product>(
            "SELECT id, price, quantity, description, tags FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list(&self, page: Page) -> StoreResult<Vec<Product>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, price, quantity, description, tags
            FROM products
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn update(&self, product: &Product) -> StoreResult<Product> {
        tracing::trace!("executing SQL query to update product");

        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET price = $2, quantity = $3, description = $4, tags = $5
            WHERE id = $1
            RETURNING id, price, quantity, description, tags
            "#,
        )
        .bind(product.id)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.description)
        .bind(&product.tags)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DomainError::not_found("Product", product.id).into())
    }
}

// =========================================================================
// Orders
// =========================================================================

/// Order persistence, including the stock-consuming transactions
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: &Order) -> StoreResult<Order> {
        tracing::trace!("executing SQL query to create order");

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, created_at, completed)
            VALUES ($1, $2, $3, false)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                DomainError::not_found("User", order.user_id).into()
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(order.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        tracing::trace!("executing SQL query to find order by id");

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                o.id, o.user_id, o.created_at, o.completed,
                COALESCE(SUM(oc.price * oc.quantity), 0)::BIGINT AS cost
            FROM orders o
            LEFT JOIN orders_content oc ON oc.order_id = o.id
            WHERE o.id = $1
            GROUP BY o.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Order>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }

        tracing::trace!("executing SQL query to find orders by user id");

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                uo.id, uo.user_id, uo.created_at, uo.completed,
                COALESCE(SUM(oc.price * oc.quantity), 0)::BIGINT AS cost
            FROM (
                SELECT id, user_id, created_at, completed
                FROM orders
                WHERE user_id = $1
                ORDER BY created_at, id
                LIMIT $2 OFFSET $3
            ) AS uo
            LEFT JOIN orders_content oc ON oc.order_id = uo.id
            GROUP BY uo.id, uo.user_id, uo.created_at, uo.completed
            ORDER BY uo.created_at, uo.id
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn lines(&self, order_id: Uuid) -> StoreResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT order_id, product_id, price, quantity
            FROM orders_content
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    async fn complete(&self, id: Uuid) -> StoreResult<()> {
        tracing::trace!("executing SQL query to complete order");

        let rows_affected = sqlx::query("UPDATE orders SET completed = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::not_found("Order", id).into());
        }
        Ok(())
    }

    async fn add_product(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: i64,
    ) -> StoreResult<OrderLine> {
        // Dropping `tx` without commit rolls the transaction back, so every
        // early return below leaves no partial effect.
        let mut tx = self.pool.begin().await?;
        tracing::trace!("started transaction to add product to order");

        // Exclusive row lock, held until commit/rollback
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, price, quantity, description, tags
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("Product", product_id))?;

        // Exclusive on the order too, so two adds cannot both pass the
        // total check below
        let completed: bool =
            sqlx::query_scalar("SELECT completed FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if completed {
            return Err(DomainError::OrderCompleted(order_id.to_string()).into());
        }

        let reservation = product.reserve(quantity)?;

        let current_cost: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(price * quantity), 0)::BIGINT FROM orders_content WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
        reservation.order_total(current_cost)?;

        sqlx::query(
            r#"
            INSERT INTO orders_content (order_id, product_id, price, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(reservation.unit_price)
        .bind(reservation.quantity)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET quantity = $1 WHERE id = $2")
            .bind(reservation.remaining)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            %product_id,
            %order_id,
            quantity,
            remaining = reservation.remaining,
            "product added to order"
        );

        Ok(OrderLine {
            order_id,
            product_id,
            price: reservation.unit_price,
            quantity: reservation.quantity,
        })
    }

    async fn delete_product(&self, product_id: Uuid, order_id: Uuid) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        tracing::trace!("started transaction to delete product from order");

        let completed: bool =
            sqlx::query_scalar("SELECT completed FROM orders WHERE id = $1 FOR SHARE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if completed {
            return Err(DomainError::OrderCompleted(order_id.to_string()).into());
        }

        let removed = sqlx::query(
            "DELETE FROM orders_content WHERE order_id = $1 AND product_id = $2",
        )
        .bind(order_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            return Err(DomainError::not_found("OrderLine", product_id).into());
        }

        tx.commit().await?;
        Ok(removed)
    }
}
