//! User service
//!
//! Signup, login, token refresh and profile management.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password_async, verify_password_async};
use crate::auth::{AuthService, TokenPair};
use crate::db::bounded;
use crate::domain::{normalize_email, DomainError, User, UserChanges};
use crate::error::{AppError, AppResult};
use crate::store::UserStore;

use super::commands::{LoginCommand, RefreshCommand, SignupCommand, UpdateProfileCommand};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    auth: AuthService,
    timeout: Duration,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, auth: AuthService, timeout: Duration) -> Self {
        Self {
            users,
            auth,
            timeout,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Register a user and log them in
    pub async fn signup(&self, command: SignupCommand) -> AppResult<(User, TokenPair)> {
        command.validate()?;

        let password_hash = hash_password_async(command.password).await?;
        let user = User {
            id: Uuid::new_v4(),
            firstname: command.firstname.trim().to_string(),
            lastname: command.lastname.trim().to_string(),
            email: normalize_email(&command.email),
            password_hash,
            age: command.age,
            is_married: command.is_married,
        };

        let user = bounded(self.timeout, self.users.create(&user)).await??;
        tracing::info!(user_id = %user.id, "user signed up");

        let tokens = self.auth.issue(user.id).await?;
        Ok((user, tokens))
    }

    pub async fn login(&self, command: LoginCommand) -> AppResult<TokenPair> {
        // Malformed input gets the same answer as a wrong password
        if command.validate().is_err() {
            return Err(AppError::InvalidCredentials);
        }

        let (_, tokens) = self.auth.login(&command.email, &command.password).await?;
        Ok(tokens)
    }

    pub async fn refresh(&self, command: RefreshCommand) -> AppResult<TokenPair> {
        if command.validate().is_err() {
            return Err(AppError::Unauthorized);
        }
        Ok(self.auth.rotate(&command.refresh_token).await?)
    }

    pub async fn logout(&self, command: RefreshCommand) -> AppResult<()> {
        self.auth.revoke(&command.refresh_token).await;
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        bounded(self.timeout, self.users.find_by_id(user_id))
            .await??
            .ok_or_else(|| DomainError::not_found("User", user_id).into())
    }

    /// Apply a partial profile update.
    ///
    /// A new password is only accepted together with the current one.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        command: UpdateProfileCommand,
    ) -> AppResult<User> {
        command.validate()?;

        let current = self.profile(user_id).await?;

        let password_hash = match command.new_password {
            Some(new_password) => {
                let old_password = command.old_password.ok_or_else(|| {
                    DomainError::validation("old_password is required to change the password")
                })?;
                if !verify_password_async(old_password, current.password_hash.clone()).await? {
                    return Err(AppError::InvalidCredentials);
                }
                Some(hash_password_async(new_password).await?)
            }
            None => None,
        };

        let changes = UserChanges {
            firstname: command.firstname.map(|s| s.trim().to_string()),
            lastname: command.lastname.map(|s| s.trim().to_string()),
            email: command.email.as_deref().map(normalize_email),
            is_married: command.is_married,
            password_hash,
        };

        if changes.is_empty() {
            return Ok(current);
        }

        let user = bounded(self.timeout, self.users.update(user_id, &changes)).await??;
        tracing::info!(user_id = %user_id, "profile updated");
        Ok(user)
    }

    /// Delete the account. Refused while the user still owns orders.
    pub async fn delete_profile(&self, user_id: Uuid) -> AppResult<()> {
        bounded(self.timeout, self.users.delete(user_id)).await??;
        tracing::info!(user_id = %user_id, "user deleted");
        Ok(())
    }
}
