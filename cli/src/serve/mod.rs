use anyhow::Result;
use clap::Args;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::*;

use crate::StoreConfiguration;

mod broadcast;
mod error;
mod events;
mod handlers;
mod jwt_auth;
mod route;
mod state;
mod validation;
mod ws;


pub use broadcast::Broadcaster;
pub use state::{AppState, Config};
pub use ws::ServerMessage;

#[derive(Debug, Args, Clone)]
pub struct Command {
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[command(flatten)]
    store: StoreConfiguration,
}

#[tokio::main]
pub async fn execute_command(cmd: &Command) -> Result<()> {
    info!("serving");

    let env = Config::from_env()?;
    let store = cmd.store.make_store()?;
    let app_state = Arc::new(AppState::new(store, env));

    let app = route::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cmd.port));
    info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
