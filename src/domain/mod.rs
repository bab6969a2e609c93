//! Domain module
//!
//! Core domain types and business logic.

pub mod context;
pub mod error;
pub mod order;
pub mod product;
pub mod user;

pub use context::RequestContext;
pub use error::DomainError;
pub use order::{order_cost, Order, OrderLine, Page};
pub use product::{Product, ProductDraft, Reservation, MAX_PRICE, MAX_QUANTITY};
pub use user::{normalize_email, User, UserChanges};
