//! User accounts with Argon2 password hashes.

use std::collections::HashMap;

use amitybot_common::config::SeedUser;
use amitybot_common::Role;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User already exists")]
    AlreadyExists,
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
struct StoredUser {
    password_hash: String,
    role: Role,
}

#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl UserStore {
    pub async fn from_seed(seed: &[SeedUser]) -> Result<Self, UserError> {
        let store = Self::default();
        for user in seed {
            store.insert(&user.username, &user.password, user.role).await?;
        }
        info!(users = seed.len(), "User store seeded");
        Ok(store)
    }

    /// Role of the user if the password matches.
    pub async fn verify(&self, username: &str, password: &str) -> Option<Role> {
        let stored = self.users.read().await.get(username).cloned()?;
        let password = password.to_string();
        let hash = stored.password_hash;

        let ok = tokio::task::spawn_blocking(move || {
            PasswordHash::new(&hash)
                .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false);

        if !ok {
            warn!(username, "Failed login attempt");
        }
        ok.then_some(stored.role)
    }

    /// Create a `logged_in` user.
    pub async fn register(&self, username: &str, password: &str) -> Result<Role, UserError> {
        if self.users.read().await.contains_key(username) {
            return Err(UserError::AlreadyExists);
        }
        self.insert(username, password, Role::LoggedIn).await?;
        info!(username, "User registered");
        Ok(Role::LoggedIn)
    }

    async fn insert(&self, username: &str, password: &str, role: Role) -> Result<(), UserError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(UserError::MissingCredentials);
        }
        let password_hash = hash_password(password.to_string()).await?;

        let mut users = self.users.write().await;
        // re-checked under the write lock; hashing happened without it
        if users.contains_key(username) {
            return Err(UserError::AlreadyExists);
        }
        users.insert(username.to_string(), StoredUser { password_hash, role });
        Ok(())
    }
}

async fn hash_password(password: String) -> Result<String, UserError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| UserError::Hash(e.to_string()))
    })
    .await?
}
