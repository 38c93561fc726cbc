//! User manager implementation.

use std::sync::Arc;

use super::{
    models::{UserCreate, UserUpdate},
    validation::{validate_email, validate_password, validate_username},
};
use crate::{
    auth::{AuthError, AuthResult, Power, User, UserId, authorize_mutation, hash_password},
    db::{NewUser, UserChanges, UserRepository},
    pagination::{Page, PageQuery},
};

/// User manager
#[derive(Clone)]
pub struct UserManager {
    users: Arc<dyn UserRepository>,
}

impl UserManager {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Register a new user with `Normal` power
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed username, email or password
    /// * `AuthError::UserNameAlreadyExists` - Username taken
    /// * `AuthError::UserEmailAlreadyExists` - Email taken
    pub async fn register(&self, request: UserCreate) -> AuthResult<User> {
        validate_username(&request.username)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        if self
            .users
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UserNameAlreadyExists);
        }
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::UserEmailAlreadyExists);
        }

        // A concurrent registration can still win the race; the unique
        // constraints map that case to the same conflict errors.
        let user = self
            .users
            .create_user(&NewUser {
                username: request.username,
                email: request.email,
                hashed_password: hash_password(&request.password)?,
                power: Power::Normal,
            })
            .await?;

        log::info!("registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub async fn get(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn list(&self, query: &PageQuery) -> AuthResult<Page<User>> {
        let total = self.users.count_users().await?;
        let users = self
            .users
            .list_users(query.offset(), query.limit())
            .await?;
        Ok(Page::new(users, total, query))
    }

    /// Apply a profile update on behalf of `actor`.
    ///
    /// Changing `power` additionally requires that the actor is not the target
    /// and that the new power is strictly below the actor's own.
    ///
    /// # Errors
    ///
    /// * `AuthError::PermissionDenied` - Rank check failed
    /// * `AuthError::UserNotFound` - Target does not exist
    /// * `AuthError::UserNameAlreadyExists` / `UserEmailAlreadyExists` - Taken by another account
    pub async fn update(
        &self,
        actor: &User,
        target_id: UserId,
        update: UserUpdate,
    ) -> AuthResult<User> {
        authorize_mutation(self.users.as_ref(), actor, target_id).await?;

        if let Some(power) = update.power
            && (actor.id == target_id || !actor.power.outranks(power))
        {
            log::warn!(
                "user {} ({}) denied setting power of user {} to {}",
                actor.id,
                actor.power,
                target_id,
                power
            );
            return Err(AuthError::PermissionDenied);
        }

        if update.is_empty() {
            return self.get(target_id).await;
        }

        if let Some(username) = &update.username {
            validate_username(username)?;
            if let Some(existing) = self.users.find_by_username(username).await?
                && existing.id != target_id
            {
                return Err(AuthError::UserNameAlreadyExists);
            }
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
            if let Some(existing) = self.users.find_by_email(email).await?
                && existing.id != target_id
            {
                return Err(AuthError::UserEmailAlreadyExists);
            }
        }
        let hashed_password = match &update.password {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let changes = UserChanges {
            username: update.username,
            email: update.email,
            hashed_password,
            power: update.power,
        };
        self.users
            .update_user(target_id, &changes)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Rank-check an avatar change and return the current target row.
    ///
    /// Called before the upload is written so a rejected request leaves no file
    /// behind.
    pub async fn authorize_avatar_change(
        &self,
        actor: &User,
        target_id: UserId,
    ) -> AuthResult<User> {
        match authorize_mutation(self.users.as_ref(), actor, target_id).await? {
            Some(target) => Ok(target),
            None => self.get(target_id).await,
        }
    }

    /// Point the user's avatar at a stored file name.
    pub async fn replace_avatar(&self, target_id: UserId, filename: &str) -> AuthResult<User> {
        self.users
            .set_avatar(target_id, Some(filename))
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
