//! Command definitions
//!
//! Caller input for the application services, validated with `validator`
//! before any persistence call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register a new user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupCommand {
    #[validate(length(min = 2, max = 100))]
    pub firstname: String,
    #[validate(length(min = 2, max = 100))]
    pub lastname: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub repeat_password: String,
    #[validate(range(min = 18, max = 150))]
    pub age: i32,
    #[serde(default)]
    pub is_married: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginCommand {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Refresh-token exchange and logout
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshCommand {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Partial profile update. Changing the password requires the old one.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileCommand {
    #[validate(length(min = 2, max = 100))]
    pub firstname: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub lastname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub is_married: Option<bool>,
    pub old_password: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub new_password: Option<String>,
}

/// Add a product to an order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddProductCommand {
    pub product_id: Uuid,
    /// Upper bound matches `domain::MAX_QUANTITY`
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i64,
}

/// Pagination query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupCommand {
        SignupCommand {
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "password123".to_string(),
            repeat_password: "password123".to_string(),
            age: 36,
            is_married: false,
        }
    }

    #[test]
    fn test_valid_signup() {
        assert!(signup().validate().is_ok());
    }

    #[test]
    fn test_signup_rules() {
        let mut cmd = signup();
        cmd.repeat_password = "password124".to_string();
        let errors = cmd.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("repeat_password"));

        let mut cmd = signup();
        cmd.age = 17;
        assert!(cmd.validate().unwrap_err().field_errors().contains_key("age"));

        let mut cmd = signup();
        cmd.firstname = "A".to_string();
        cmd.email = "not-an-email".to_string();
        let errors = cmd.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("firstname"));
        assert!(errors.field_errors().contains_key("email"));

        let mut cmd = signup();
        cmd.password = "short".to_string();
        cmd.repeat_password = "short".to_string();
        assert!(cmd.validate().unwrap_err().field_errors().contains_key("password"));
    }

    #[test]
    fn test_profile_update_optional_fields() {
        assert!(UpdateProfileCommand::default().validate().is_ok());

        let cmd = UpdateProfileCommand {
            new_password: Some("short".to_string()),
            ..Default::default()
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn test_add_product_quantity() {
        let cmd = AddProductCommand {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(cmd.validate().is_err());

        let cmd = AddProductCommand {
            quantity: crate::domain::MAX_QUANTITY,
            ..cmd
        };
        assert!(cmd.validate().is_ok());

        let cmd = AddProductCommand {
            quantity: crate::domain::MAX_QUANTITY + 1,
            ..cmd
        };
        assert!(cmd.validate().unwrap_err().field_errors().contains_key("quantity"));
    }
}
