use anyhow::Result;
use tokio::sync::broadcast;
use tracing::*;

use engine::{Event, InvoiceCreated, Notifier};

use super::ServerMessage;

const CAPACITY: usize = 100;

/// Fans creations out to every connected channel. Subscribing registers a
/// channel and dropping the receiver removes it, neither blocks a send.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<ServerMessage>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    pub fn channels(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn broadcast(&self, created: &Event) {
        let outgoing = ServerMessage::InvoiceCreated(InvoiceCreated::from(created));

        match self.tx.send(outgoing) {
            Ok(channels) => debug!(id = %created.id, channels, "broadcast:sent"),
            Err(_) => debug!(id = %created.id, "broadcast:no-channels"),
        }
    }
}

impl Notifier for Broadcaster {
    fn notify(&self, created: &Event) -> Result<()> {
        self.broadcast(created);

        Ok(())
    }
}
