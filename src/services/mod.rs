//! Application services
//!
//! Thin orchestration over the stores, the inventory engine and the auth
//! service. Every store call is bounded by the configured timeout.

pub mod commands;
mod order_service;
mod product_service;
mod user_service;

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{AuthError, AuthService};
use crate::config::Config;
use crate::inventory::OrderEngine;
use crate::store::{
    MemoryStore, OrderStore, PgOrderStore, PgProductStore, PgUserStore, ProductStore, UserStore,
};

pub use commands::{
    AddProductCommand, LoginCommand, PageQuery, RefreshCommand, SignupCommand,
    UpdateProfileCommand,
};
pub use order_service::OrderService;
pub use product_service::ProductService;
pub use user_service::UserService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub orders: OrderService,
    pub products: ProductService,
}

impl AppState {
    /// Wire services over PostgreSQL
    pub fn postgres(pool: PgPool, config: &Config) -> Result<Self, AuthError> {
        Self::from_stores(
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgProductStore::new(pool.clone())),
            Arc::new(PgOrderStore::new(pool)),
            config,
        )
    }

    /// Wire services over a fresh in-memory store
    pub fn memory(config: &Config) -> Result<Self, AuthError> {
        let store = MemoryStore::new();
        Self::from_stores(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            config,
        )
    }

    pub fn from_stores(
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        config: &Config,
    ) -> Result<Self, AuthError> {
        let auth = AuthService::new(Arc::clone(&users), config)?;

        Ok(Self {
            users: UserService::new(users, auth, config.db_timeout),
            orders: OrderService::new(OrderEngine::new(orders), config.db_timeout),
            products: ProductService::new(products, config.db_timeout),
        })
    }

    pub fn auth(&self) -> &AuthService {
        self.users.auth()
    }
}
