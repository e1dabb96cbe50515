use anyhow::Context;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tokio::task;

use crate::config::AuthConfig;
use crate::db::{PageWindow, Paged, StoreResult, now, paged_query};
use crate::entities::{prelude::*, users};

/// User data returned from the repository (without the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub created: String,
    pub updated: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            admin: model.admin,
            created: model.created,
            updated: model.updated,
        }
    }
}

/// Fields a user may change about their own account.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, window: PageWindow) -> StoreResult<Paged<User>> {
        let select = Users::find().order_by_asc(users::Column::Id);
        let page: Paged<users::Model> = paged_query(&self.conn, select, window).await?;
        Ok(page.map(User::from))
    }

    pub async fn get(&self, id: i32) -> StoreResult<Option<User>> {
        let user = Users::find_by_id(id).one(&self.conn).await?;
        Ok(user.map(User::from))
    }

    /// Fails with `StoreError::Duplicate` when the username is taken.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        admin: bool,
        config: &AuthConfig,
    ) -> StoreResult<User> {
        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let now = now();
        let active = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            admin: Set(admin),
            created: Set(now.clone()),
            updated: Set(now),
            ..Default::default()
        };

        Ok(User::from(active.insert(&self.conn).await?))
    }

    /// Returns the user when the password matches.
    /// Argon2 verification runs in `spawn_blocking` so it does not stall
    /// the runtime.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> StoreResult<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from(user)))
    }

    pub async fn update_profile(
        &self,
        id: i32,
        changes: ProfileChanges,
        config: &AuthConfig,
    ) -> StoreResult<User> {
        let mut active = users::ActiveModel {
            id: Unchanged(id),
            updated: Set(now()),
            ..Default::default()
        };

        if let Some(email) = changes.email {
            active.email = Set(email);
        }

        if let Some(password) = changes.password {
            let config = config.clone();
            let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(password_hash);
        }

        Ok(User::from(active.update(&self.conn).await?))
    }

    pub async fn set_admin(&self, id: i32, admin: bool) -> StoreResult<User> {
        let active = users::ActiveModel {
            id: Unchanged(id),
            admin: Set(admin),
            updated: Set(now()),
            ..Default::default()
        };

        Ok(User::from(active.update(&self.conn).await?))
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &AuthConfig) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
