//! Product
//!
//! Catalogue entry with a unit price and a stock counter.
//! Prices are integers in the minor currency unit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

/// Largest accepted unit price, in minor units
pub const MAX_PRICE: i64 = 1_000_000_000_000;

/// Largest accepted stock level and order line quantity
pub const MAX_QUANTITY: i64 = 1_000_000;

/// A product row.
///
/// # Invariants
/// - `0 <= price <= MAX_PRICE`
/// - `quantity >= 0`, also under concurrent order lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub price: i64,
    pub quantity: i64,
    pub description: String,
    pub tags: Vec<String>,
}

/// Writable product fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub price: i64,
    pub quantity: i64,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductDraft {
    /// Check price and stock are within `0..=MAX_PRICE` and `0..=MAX_QUANTITY`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0..=MAX_PRICE).contains(&self.price) {
            return Err(DomainError::validation(format!(
                "price must be between 0 and {MAX_PRICE} (got {})",
                self.price
            )));
        }
        if !(0..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(DomainError::validation(format!(
                "quantity must be between 0 and {MAX_QUANTITY} (got {})",
                self.quantity
            )));
        }
        Ok(())
    }

    /// Build a product with a freshly generated id.
    pub fn into_product(self) -> Product {
        self.into_product_with_id(Uuid::new_v4())
    }

    pub fn into_product_with_id(self, id: Uuid) -> Product {
        Product {
            id,
            price: self.price,
            quantity: self.quantity,
            description: self.description,
            tags: self.tags,
        }
    }
}

/// Outcome of taking stock from a product: the price snapshot for the order
/// line and the stock left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub unit_price: i64,
    pub quantity: i64,
    pub remaining: i64,
    /// `unit_price * quantity`
    pub line_cost: i64,
}

impl Reservation {
    /// Order cost after adding this line to an order currently costing
    /// `current_cost`.
    pub fn order_total(&self, current_cost: i64) -> Result<i64, DomainError> {
        current_cost
            .checked_add(self.line_cost)
            .ok_or_else(|| DomainError::validation("order cost exceeds the supported range"))
    }
}

impl Product {
    /// Check whether `quantity` units can be taken from stock.
    ///
    /// Callers must hold the row lock for this product between this check
    /// and writing `remaining` back.
    pub fn reserve(&self, quantity: i64) -> Result<Reservation, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be at least 1 (got {quantity})"
            )));
        }
        if quantity > MAX_QUANTITY {
            return Err(DomainError::validation(format!(
                "quantity must be at most {MAX_QUANTITY} (got {quantity})"
            )));
        }
        if quantity > self.quantity {
            return Err(DomainError::insufficient_stock(
                self.id,
                quantity,
                self.quantity,
            ));
        }

        let line_cost = self.price.checked_mul(quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "line cost of {quantity} x {} exceeds the supported range",
                self.price
            ))
        })?;

        Ok(Reservation {
            unit_price: self.price,
            quantity,
            remaining: self.quantity - quantity,
            line_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, quantity: i64) -> Product {
        ProductDraft {
            price,
            quantity,
            description: "widget".to_string(),
            tags: vec!["tools".to_string()],
        }
        .into_product()
    }

    #[test]
    fn test_reserve_takes_snapshot() {
        let p = product(250, 5);
        let r = p.reserve(3).unwrap();

        assert_eq!(r.unit_price, 250);
        assert_eq!(r.quantity, 3);
        assert_eq!(r.remaining, 2);
        assert_eq!(r.line_cost, 750);
    }

    #[test]
    fn test_reserve_rejects_overflowing_line_cost() {
        // Rows written before the price bound existed
        let p = product(i64::MAX / 2 + 1, 2);
        assert!(matches!(p.reserve(2), Err(DomainError::Validation(_))));
        assert_eq!(p.reserve(1).unwrap().line_cost, i64::MAX / 2 + 1);
    }

    #[test]
    fn test_order_total_overflow() {
        let r = product(MAX_PRICE, MAX_QUANTITY).reserve(MAX_QUANTITY).unwrap();
        assert_eq!(r.order_total(0).unwrap(), MAX_PRICE * MAX_QUANTITY);
        assert!(matches!(
            r.order_total(i64::MAX - 1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_reserve_whole_stock() {
        let p = product(10, 4);
        assert_eq!(p.reserve(4).unwrap().remaining, 0);
    }

    #[test]
    fn test_reserve_more_than_stock() {
        let p = product(10, 2);
        let err = p.reserve(3).unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_reserve_rejects_non_positive() {
        let p = product(10, 2);
        assert!(matches!(p.reserve(0), Err(DomainError::Validation(_))));
        assert!(matches!(p.reserve(-1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = ProductDraft {
            price: 0,
            quantity: 0,
            description: String::new(),
            tags: vec![],
        };
        assert!(draft.validate().is_ok());

        draft.price = -1;
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));

        draft.price = 1;
        draft.quantity = -5;
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));

        draft.quantity = MAX_QUANTITY;
        draft.price = MAX_PRICE;
        assert!(draft.validate().is_ok());

        draft.price = MAX_PRICE + 1;
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));

        draft.price = 1;
        draft.quantity = MAX_QUANTITY + 1;
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }
}
