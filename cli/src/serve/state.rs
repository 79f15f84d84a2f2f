use anyhow::{Context, Result};
use argon2::Params;
use std::sync::Arc;

use engine::{storage::RecordStore, Events, Users};

use super::Broadcaster;

pub struct AppState {
    pub events: Events,
    pub users: Users,
    pub broadcaster: Broadcaster,
    pub env: Config,
}

pub struct Config {
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        Ok(Self { jwt_secret })
    }
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, env: Config) -> Self {
        let broadcaster = Broadcaster::default();

        AppState {
            events: Events::new(store.clone()).with_notifier(Arc::new(broadcaster.clone())),
            users: Users::new(store),
            broadcaster,
            env,
        }
    }

    /// Password hashing cost for newly registered users.
    pub fn with_params(self, params: Params) -> Self {
        Self {
            users: self.users.with_params(params),
            ..self
        }
    }
}
