use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::ServiceError;
use crate::auth::AuthUser;
use crate::database::models::{NewUser, Role, RoleChange, User, UserChanges};
use crate::database::{DatabaseError, UserRepository};

/// Body of `POST /api/v1/users/profile`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub avatar: Option<String>,
}

/// Body of `POST /api/v1/users/sync`: profile data the token does not carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncInput {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn get(&self, user_id: &str) -> Result<User, ServiceError> {
        self.users
            .find(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn create_profile(
        &self,
        caller: &AuthUser,
        input: ProfileInput,
    ) -> Result<User, ServiceError> {
        let user_id = input
            .user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| caller.user_id.clone());
        if user_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "You can only create your own profile".to_string(),
            ));
        }

        let profile_exists =
            || ServiceError::Conflict("User profile already exists".to_string());
        if self.users.find(&user_id).await?.is_some() {
            return Err(profile_exists());
        }

        let defaults = profile_from_claims(caller);
        let inserted = self
            .users
            .insert(NewUser {
                id: user_id,
                name: input.name.unwrap_or(defaults.name),
                email: input.email.unwrap_or(defaults.email),
                username: input.username.unwrap_or(defaults.username),
                gender: input.gender.or(defaults.gender),
                birthdate: input.birthdate.or(defaults.birthdate),
                avatar: input.avatar,
            })
            .await;
        let user = match inserted {
            Err(DatabaseError::Duplicate(_)) => return Err(profile_exists()),
            other => other?,
        };

        info!(user_id = %user.id, "Created user profile");
        Ok(user)
    }

    /// The caller's profile. The boolean is true when it had to be created
    /// from the token claims.
    pub async fn current_profile(&self, caller: &AuthUser) -> Result<(User, bool), ServiceError> {
        if let Some(user) = self.users.find(&caller.user_id).await? {
            return Ok((user, false));
        }

        match self.users.insert(profile_from_claims(caller)).await {
            Ok(user) => {
                info!(user_id = %user.id, "Created user profile from token claims");
                Ok((user, true))
            }
            // A concurrent first request created it in the meantime.
            Err(DatabaseError::Duplicate(_)) => Ok((self.get(&caller.user_id).await?, false)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_profile(
        &self,
        caller: &AuthUser,
        user_id: &str,
        changes: UserChanges,
    ) -> Result<User, ServiceError> {
        self.ensure_own_profile(caller, user_id)?;

        self.users
            .update(user_id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub fn ensure_own_profile(&self, caller: &AuthUser, user_id: &str) -> Result<(), ServiceError> {
        if user_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "You can only update your own profile".to_string(),
            ));
        }
        Ok(())
    }

    /// Upsert the caller's profile from token claims plus client-supplied data.
    pub async fn sync(&self, caller: &AuthUser, input: SyncInput) -> Result<User, ServiceError> {
        let mut profile = profile_from_claims(caller);
        if caller.name.is_none() {
            if let Some(name) = input.name.filter(|n| !n.is_empty()) {
                profile.name = name;
            }
        }
        profile.gender = input.gender.or(profile.gender);
        profile.birthdate = input.birthdate.or(profile.birthdate);
        profile.avatar = input.avatar;

        let user = self.users.upsert(profile).await?;
        info!(user_id = %user.id, "Synced user profile");
        Ok(user)
    }

    pub async fn promote_to_instructor(&self, email: &str) -> Result<RoleChange, ServiceError> {
        let change = self.users.set_role(email, Role::Instructor).await?;
        if change == RoleChange::Updated {
            info!(%email, "Promoted user to instructor");
        }
        Ok(change)
    }
}

fn profile_from_claims(caller: &AuthUser) -> NewUser {
    let name = caller
        .name
        .clone()
        .or_else(|| match (&caller.given_name, &caller.family_name) {
            (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
            (Some(given), None) => Some(given.clone()),
            _ => None,
        })
        .or_else(|| caller.username.clone())
        .unwrap_or_default();

    NewUser {
        id: caller.user_id.clone(),
        name,
        email: caller.email.clone().unwrap_or_default(),
        username: caller.username.clone().unwrap_or_default(),
        gender: caller.gender.clone(),
        birthdate: caller.birthdate.clone(),
        avatar: None,
    }
}
