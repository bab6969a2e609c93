//! Request Context
//!
//! Identity and tracing metadata for one authenticated request. It is passed
//! explicitly down the service call chain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Authenticated user (access token subject)
    pub user_id: Uuid,

    /// Correlation ID for request tracing
    pub correlation_id: Uuid,
}

impl RequestContext {
    /// Create a context for `user_id` with a fresh correlation ID
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Use a caller-supplied correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}
