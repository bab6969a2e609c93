//! Inventory-order engine
//!
//! Owns the order and stock rules on top of an [`OrderStore`]. Input is
//! validated here; the store runs each mutation as one locked transaction.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DomainError, Order, OrderLine, Page};
use crate::store::{OrderStore, StoreResult};

/// An order together with its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn OrderStore>,
}

impl OrderEngine {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Open an empty order for `user_id`
    pub async fn create_order(&self, user_id: Uuid) -> StoreResult<Order> {
        let order = Order::create(user_id)?;
        let order = self.store.create(&order).await?;

        tracing::info!(order_id = %order.id, user_id = %user_id, "order created");
        Ok(order)
    }

    /// Move `quantity` units of a product into an order.
    ///
    /// Fails with `InsufficientStock` when stock is short, `OrderCompleted`
    /// when the order is closed and `NotFound` when either row is missing.
    /// Nothing changes on failure.
    pub async fn add_product_to_order(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: i64,
    ) -> StoreResult<OrderLine> {
        if quantity < 1 {
            return Err(DomainError::validation(format!(
                "quantity must be at least 1 (got {quantity})"
            ))
            .into());
        }

        match self.store.add_product(product_id, order_id, quantity).await {
            Ok(line) => {
                tracing::info!(
                    order_id = %order_id,
                    product_id = %product_id,
                    quantity,
                    price = line.price,
                    "product added to order"
                );
                Ok(line)
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order_id,
                    product_id = %product_id,
                    quantity,
                    error = %e,
                    "add product to order failed"
                );
                Err(e)
            }
        }
    }

    /// Remove a product from an order. Stock is not restored.
    pub async fn delete_product_from_order(
        &self,
        product_id: Uuid,
        order_id: Uuid,
    ) -> StoreResult<u64> {
        let removed = self.store.delete_product(product_id, order_id).await?;

        tracing::info!(
            order_id = %order_id,
            product_id = %product_id,
            removed,
            "product removed from order"
        );
        Ok(removed)
    }

    /// Mark an order completed. Completing an already completed order is a
    /// no-op.
    pub async fn complete_order(&self, order_id: Uuid) -> StoreResult<Order> {
        self.store.complete(order_id).await?;

        let order = self.find_order(order_id).await?;
        tracing::info!(order_id = %order_id, "order completed");
        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> StoreResult<OrderDetails> {
        let order = self.find_order(order_id).await?;
        let lines = self.store.lines(order_id).await?;
        Ok(OrderDetails { order, lines })
    }

    pub async fn list_orders_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Order>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }
        self.store.list_by_user(user_id, page).await
    }

    /// Load an order without its lines
    pub async fn find_order(&self, order_id: Uuid) -> StoreResult<Order> {
        self.store
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id).into())
    }
}
