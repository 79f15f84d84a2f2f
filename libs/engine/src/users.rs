use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use std::sync::Arc;
use tracing::*;

use crate::{
    collection::Collection,
    errors::DomainError,
    model::{NewUser, PublicUser, RecordId, User},
    sequences::{RandomKeys, Sequence},
    storage::RecordStore,
};

pub const USERS: &str = "users";

pub struct Users {
    records: Collection<User>,
    keys: Arc<dyn Sequence<RecordId>>,
    params: Params,
}

fn hash_password(password: String, params: Params) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Hashing(e.to_string()))
}

/// Cost parameters travel inside the PHC string, so any hash verifies
/// regardless of the parameters currently configured.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl Users {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(USERS, store),
            keys: Arc::new(RandomKeys::default()),
            params: Params::default(),
        }
    }

    pub fn with_keys(self, keys: Arc<dyn Sequence<RecordId>>) -> Self {
        Self { keys, ..self }
    }

    /// Memory and iteration cost for new hashes.
    pub fn with_params(self, params: Params) -> Self {
        Self { params, ..self }
    }

    async fn hash(&self, password: String) -> Result<String, DomainError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || hash_password(password, params)).await?
    }

    /// Appends without checking for an existing email.
    pub async fn add(&self, data: NewUser) -> Result<PublicUser, DomainError> {
        let hashed = self.hash(data.password).await?;

        self.records
            .modify(|records| {
                let user = User {
                    id: self.keys.following(),
                    email: data.email,
                    password: hashed,
                };

                records.push(user.clone());

                Ok(PublicUser::from(&user))
            })
            .await
    }

    /// Inserts only when no user has this email, checked and committed
    /// under the collection's write lock.
    pub async fn add_if_absent(&self, data: NewUser) -> Result<PublicUser, DomainError> {
        let hashed = self.hash(data.password).await?;

        self.records
            .modify(|records| {
                if records.iter().any(|u| u.email == data.email) {
                    return Err(DomainError::AlreadyExists(
                        "Email exists already.".to_owned(),
                    ));
                }

                let user = User {
                    id: self.keys.following(),
                    email: data.email,
                    password: hashed,
                };

                records.push(user.clone());

                info!(id = %user.id, "users:registered");

                Ok(PublicUser::from(&user))
            })
            .await
    }

    pub async fn get(&self, email: &str) -> Result<User, DomainError> {
        self.records
            .load()
            .await?
            .into_iter()
            .find(|u| u.email == email)
            .ok_or_else(|| DomainError::NotFound(format!("Could not find user for email {}", email)))
    }

    /// Returns the user only if `password` matches the stored hash.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let user = match self.get(email).await {
            Ok(user) => user,
            Err(DomainError::NotFound(_)) => return Err(DomainError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        let valid = tokio::task::spawn_blocking({
            let password = password.to_owned();
            let hash = user.password.clone();
            move || verify_password(&password, &hash)
        })
        .await?;

        if valid {
            Ok(user)
        } else {
            Err(DomainError::InvalidCredentials)
        }
    }
}
