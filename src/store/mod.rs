//! Store module
//!
//! Persistence seam for users, products and orders. Every operation that
//! touches more than one row runs inside a single transaction; stock changes
//! take an exclusive lock on the product row first.
//!
//! Two implementations are provided:
//! - [`postgres`] - sqlx/PostgreSQL, `SELECT ... FOR UPDATE` row locks
//! - [`memory`] - in-process maps with one async mutex per row

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{DomainError, Order, OrderLine, Page, Product, User, UserChanges};

pub use memory::MemoryStore;
pub use postgres::{PgOrderStore, PgProductStore, PgUserStore};

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Business rule or lookup failure detected inside the store
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Duplicate email is a `Conflict`.
    async fn create(&self, user: &User) -> StoreResult<User>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Apply a partial update and return the stored user.
    async fn update(&self, id: Uuid, changes: &UserChanges) -> StoreResult<User>;

    /// Delete a user. Fails with `Conflict` while orders reference it.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: &Product) -> StoreResult<Product>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Product>>;

    async fn list(&self, page: Page) -> StoreResult<Vec<Product>>;

    /// Overwrite all writable fields of an existing product.
    async fn update(&self, product: &Product) -> StoreResult<Product>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an empty order. Unknown owner is `NotFound`.
    async fn create(&self, order: &Order) -> StoreResult<Order>;

    /// Load an order with its aggregated cost.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// One page of a user's orders, oldest first.
    async fn list_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Order>>;

    async fn lines(&self, order_id: Uuid) -> StoreResult<Vec<OrderLine>>;

    /// Mark the order completed. Completing twice is a no-op.
    async fn complete(&self, id: Uuid) -> StoreResult<()>;

    /// Take `quantity` units of a product into an order, atomically.
    ///
    /// Locks the product row, checks stock, writes a line carrying the
    /// current price and decrements stock. Nothing is written on failure.
    async fn add_product(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: i64,
    ) -> StoreResult<OrderLine>;

    /// Remove every line of `product_id` from the order. Stock is not restored.
    /// Returns the number of removed lines.
    async fn delete_product(&self, product_id: Uuid, order_id: Uuid) -> StoreResult<u64>;
}
