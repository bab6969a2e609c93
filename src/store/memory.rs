//! In-memory store
//!
//! Process-local implementation of all store traits. Each product and order
//! row sits behind its own async mutex, mirroring the row locks taken by the
//! PostgreSQL store: stock changes lock the product row first, then the
//! order row. No `.await` happens between a check and the writes that
//! depend on it, so a cancelled call never leaves a partial effect.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::{
    order_cost, DomainError, Order, OrderLine, Page, Product, User, UserChanges,
};

use super::{OrderStore, ProductStore, StoreResult, UserStore};

#[derive(Debug)]
struct OrderRow {
    order: Order,
    lines: Vec<OrderLine>,
}

impl OrderRow {
    fn snapshot(&self) -> Result<Order, DomainError> {
        Ok(Order {
            cost: order_cost(&self.lines)?,
            ..self.order.clone()
        })
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: RwLock<HashMap<Uuid, User>>,
    products: RwLock<HashMap<Uuid, Arc<Mutex<Product>>>>,
    orders: RwLock<HashMap<Uuid, Arc<Mutex<OrderRow>>>>,
}

/// Shared in-memory database. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn product_row(&self, id: Uuid) -> StoreResult<Arc<Mutex<Product>>> {
        self.tables
            .products
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Product", id).into())
    }

    async fn order_row(&self, id: Uuid) -> StoreResult<Arc<Mutex<OrderRow>>> {
        self.tables
            .orders
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Order", id).into())
    }
}

// =========================================================================
// Users
// =========================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> StoreResult<User> {
        let mut users = self.tables.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict("email is already registered".to_string()).into());
        }
        if users.contains_key(&user.id) {
            return Err(DomainError::Conflict(format!("user {} already exists", user.id)).into());
        }

        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.tables.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.users.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> StoreResult<User> {
        let mut users = self.tables.users.write().await;

        if let Some(ref email) = changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(
                    DomainError::Conflict("email is already registered".to_string()).into(),
                );
            }
        }

        let user = users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        changes.apply_to(user);
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        // users before orders, same as order creation
        let mut users = self.tables.users.write().await;
        if !users.contains_key(&id) {
            return Err(DomainError::not_found("User", id).into());
        }

        let orders = self.tables.orders.read().await;
        for row in orders.values() {
            if row.lock().await.order.user_id == id {
                return Err(DomainError::Conflict("user still has orders".to_string()).into());
            }
        }

        users.remove(&id);
        Ok(())
    }
}

// =========================================================================
// Products
// =========================================================================

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create(&self, product: &Product) -> StoreResult<Product> {
        let mut products = self.tables.products.write().await;
        if products.contains_key(&product.id) {
            return Err(
                DomainError::Conflict(format!("product {} already exists", product.id)).into(),
            );
        }

        products.insert(product.id, Arc::new(Mutex::new(product.clone())));
        Ok(product.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = self.tables.products.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self, page: Page) -> StoreResult<Vec<Product>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Arc<Mutex<Product>>> =
            self.tables.products.read().await.values().cloned().collect();

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(row.lock().await.clone());
        }
        products.sort_by_key(|p| p.id);

        Ok(products
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn update(&self, product: &Product) -> StoreResult<Product> {
        let row = self.product_row(product.id).await?;
        let mut current = row.lock().await;
        *current = product.clone();
        Ok(current.clone())
    }
}

// =========================================================================
// Orders
// =========================================================================

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: &Order) -> StoreResult<Order> {
        let users = self.tables.users.read().await;
        if !users.contains_key(&order.user_id) {
            return Err(DomainError::not_found("User", order.user_id).into());
        }

        let row = OrderRow {
            order: order.clone(),
            lines: Vec::new(),
        };
        self.tables
            .orders
            .write()
            .await
            .insert(order.id, Arc::new(Mutex::new(row)));

        Ok(order.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = self.tables.orders.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(row.lock().await.snapshot()?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Order>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Arc<Mutex<OrderRow>>> =
            self.tables.orders.read().await.values().cloned().collect();

        let mut orders = Vec::new();
        for row in rows {
            let row = row.lock().await;
            if row.order.user_id == user_id {
                orders.push(row.snapshot()?);
            }
        }
        orders.sort_by_key(|o| (o.created_at, o.id));

        Ok(orders
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn lines(&self, order_id: Uuid) -> StoreResult<Vec<OrderLine>> {
        let row = self.order_row(order_id).await?;
        let lines = row.lock().await.lines.clone();
        Ok(lines)
    }

    async fn complete(&self, id: Uuid) -> StoreResult<()> {
        let row = self.order_row(id).await?;
        row.lock().await.order.completed = true;
        Ok(())
    }

    async fn add_product(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: i64,
    ) -> StoreResult<OrderLine> {
        let product_row = self.product_row(product_id).await?;
        let order_row = self.order_row(order_id).await?;

        let mut product = product_row.lock().await;
        let mut order = order_row.lock().await;

        if order.order.completed {
            return Err(DomainError::OrderCompleted(order_id.to_string()).into());
        }

        let reservation = product.reserve(quantity)?;
        reservation.order_total(order_cost(&order.lines)?)?;

        let line = OrderLine {
            order_id,
            product_id,
            price: reservation.unit_price,
            quantity: reservation.quantity,
        };

        order.lines.push(line.clone());
        product.quantity = reservation.remaining;

        Ok(line)
    }

    async fn delete_product(&self, product_id: Uuid, order_id: Uuid) -> StoreResult<u64> {
        let row = self.order_row(order_id).await?;
        let mut row = row.lock().await;

        if row.order.completed {
            return Err(DomainError::OrderCompleted(order_id.to_string()).into());
        }

        let before = row.lines.len();
        row.lines.retain(|line| line.product_id != product_id);
        let removed = (before - row.lines.len()) as u64;

        if removed == 0 {
            return Err(DomainError::not_found("OrderLine", product_id).into());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductDraft;
    use crate::store::StoreError;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "hash".to_string(),
            age: 30,
            is_married: false,
        }
    }

    async fn seed(store: &MemoryStore, price: i64, quantity: i64) -> (User, Product, Order) {
        let owner = UserStore::create(store, &user()).await.unwrap();
        let product = ProductDraft {
            price,
            quantity,
            description: "widget".to_string(),
            tags: vec![],
        }
        .into_product();
        ProductStore::create(store, &product).await.unwrap();
        let order = OrderStore::create(store, &Order::create(owner.id).unwrap())
            .await
            .unwrap();
        (owner, product, order)
    }

    #[tokio::test]
    async fn test_add_product_decrements_stock() {
        let store = MemoryStore::new();
        let (_, product, order) = seed(&store, 100, 5).await;

        let line = store.add_product(product.id, order.id, 3).await.unwrap();
        assert_eq!(line.price, 100);

        let product = ProductStore::find_by_id(&store, product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 2);

        let order = OrderStore::find_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(order.cost, 300);
    }

    #[tokio::test]
    async fn test_add_product_insufficient_stock_has_no_effect() {
        let store = MemoryStore::new();
        let (_, product, order) = seed(&store, 100, 2).await;

        let err = store.add_product(product.id, order.id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock { .. })
        ));

        let product = ProductStore::find_by_id(&store, product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 2);
        assert!(store.lines(order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_product_unknown_rows() {
        let store = MemoryStore::new();
        let (_, product, order) = seed(&store, 100, 2).await;

        let err = store.add_product(Uuid::new_v4(), order.id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::NotFound { entity: "Product", .. })
        ));

        let err = store.add_product(product.id, Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::NotFound { entity: "Order", .. })
        ));
    }

    #[tokio::test]
    async fn test_add_product_rejects_cost_overflow() {
        let store = MemoryStore::new();
        let (_, product, order) = seed(&store, i64::MAX / 2 + 1, 3).await;

        let err = store.add_product(product.id, order.id, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));

        // One line fits, a second would push the order total past i64::MAX
        store.add_product(product.id, order.id, 1).await.unwrap();
        let err = store.add_product(product.id, order.id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));

        let product = ProductStore::find_by_id(&store, product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 2);
        let order = OrderStore::find_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(order.cost, i64::MAX / 2 + 1);
    }

    #[tokio::test]
    async fn test_delete_user_with_orders_conflicts() {
        let store = MemoryStore::new();
        let (owner, _, _) = seed(&store, 1, 1).await;

        let err = UserStore::delete(&store, owner.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let first = user();
        UserStore::create(&store, &first).await.unwrap();

        let second = User {
            id: Uuid::new_v4(),
            ..first.clone()
        };
        let err = UserStore::create(&store, &second).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }
}
