//! Order and OrderLine
//!
//! An order owns a set of lines. Each line keeps the unit price that was
//! current when the product was added, so later price changes never alter
//! the cost of an existing order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

/// Default page size for order listings
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Maximum page size for any listing
pub const MAX_PAGE_LIMIT: i64 = 100;

/// An order with its derived cost.
///
/// `completed` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    /// Sum of price snapshot x quantity over all lines
    pub cost: i64,
}

impl Order {
    /// Create a fresh, empty order for `user_id`.
    pub fn create(user_id: Uuid) -> Result<Self, DomainError> {
        if user_id.is_nil() {
            return Err(DomainError::validation("user id must not be empty"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            completed: false,
            cost: 0,
        })
    }
}

/// One product entry inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: Uuid,
    /// Unit price snapshot taken when the line was written
    pub price: i64,
    pub quantity: i64,
}

impl OrderLine {
    /// `None` when `price * quantity` does not fit in an `i64`.
    pub fn cost(&self) -> Option<i64> {
        self.price.checked_mul(self.quantity)
    }
}

/// Total cost of a set of lines. An empty set costs 0.
pub fn order_cost(lines: &[OrderLine]) -> Result<i64, DomainError> {
    lines
        .iter()
        .try_fold(0i64, |total, line| line.cost().and_then(|c| total.checked_add(c)))
        .ok_or_else(|| DomainError::validation("order cost exceeds the supported range"))
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Build a page from caller-supplied values.
    ///
    /// A limit of 0 is legal and yields an empty page.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, DomainError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);

        if limit < 0 {
            return Err(DomainError::validation(format!(
                "limit must be non-negative (got {limit})"
            )));
        }
        if offset < 0 {
            return Err(DomainError::validation(format!(
                "offset must be non-negative (got {offset})"
            )));
        }

        Ok(Self {
            limit: limit.min(MAX_PAGE_LIMIT),
            offset,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}
