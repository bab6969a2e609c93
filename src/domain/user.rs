//! User
//!
//! Account holder. The password is only ever held as a one-way hash.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: i32,
    pub is_married: bool,
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub is_married: Option<bool>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.email.is_none()
            && self.is_married.is_none()
            && self.password_hash.is_none()
    }

    /// Apply the changes to an in-memory user.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(ref firstname) = self.firstname {
            user.firstname = firstname.clone();
        }
        if let Some(ref lastname) = self.lastname {
            user.lastname = lastname.clone();
        }
        if let Some(ref email) = self.email {
            user.email = email.clone();
        }
        if let Some(is_married) = self.is_married {
            user.is_married = is_married;
        }
        if let Some(ref hash) = self.password_hash {
            user.password_hash = hash.clone();
        }
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_changes() {
        let mut user = User {
            id: Uuid::new_v4(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "h".to_string(),
            age: 30,
            is_married: false,
        };

        let changes = UserChanges {
            lastname: Some("Park".to_string()),
            is_married: Some(true),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        changes.apply_to(&mut user);

        assert_eq!(user.firstname, "Ann");
        assert_eq!(user.lastname, "Park");
        assert!(user.is_married);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            age: 30,
            is_married: false,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
    }
}
