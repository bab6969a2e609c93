//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant failures.
/// They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input shape or range
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Not enough stock to satisfy the requested quantity
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// The order has been completed and its content is frozen
    #[error("Order is completed: {0}")]
    OrderCompleted(String),

    /// State conflict (duplicate key, referenced row)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an insufficient stock error
    pub fn insufficient_stock(product_id: impl ToString, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            product_id: product_id.to_string(),
            requested,
            available,
        }
    }

    /// Check if this is a client error (caller's fault, no retry)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }

    /// Check if this is a business rule refusal
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            Self::InsufficientStock { .. } | Self::OrderCompleted(_) | Self::Conflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_error() {
        let err = DomainError::insufficient_stock("p-1", 3, 2);

        assert!(err.is_rule_violation());
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("requested 3"));
        assert!(err.to_string().contains("available 2"));
    }

    #[test]
    fn test_not_found_error() {
        let err = DomainError::not_found("Order", "abc");

        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Order not found: abc");
    }
}
