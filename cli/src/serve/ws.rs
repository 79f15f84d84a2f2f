use axum::{extract::Extension, response::IntoResponse};
use axum_typed_websockets::{Message, WebSocket, WebSocketUpgrade};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tracing::*;

use engine::InvoiceCreated;

use super::AppState;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Ping,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    Welcome {},
    Pong,
    #[serde(rename = "invoice:created")]
    InvoiceCreated(InvoiceCreated),
}

pub async fn ws_handler(
    ws: WebSocketUpgrade<ServerMessage, ClientMessage>,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(stream: WebSocket<ServerMessage, ClientMessage>, state: Arc<AppState>) {
    let (mut sender, mut receiver) = stream.split();

    // Subscribe before the welcome so nothing created after it is missed.
    let rx = state.broadcaster.subscribe();

    info!(channels = state.broadcaster.channels(), "ws:connected");

    if sender
        .send(Message::Item(ServerMessage::Welcome {}))
        .await
        .is_err()
    {
        warn!("ws:welcome:error");
        return;
    }

    let (session_tx, mut session_rx) = mpsc::channel::<ServerMessage>(16);

    let mut broadcasting_task = tokio::spawn(forward_broadcasts(rx, session_tx.clone()));

    // Send all outgoing traffic to the client, either forwarded broadcasts
    // or replies to pings.
    let mut send_task = tokio::spawn(async move {
        while let Some(server_message) = session_rx.recv().await {
            // In any websocket error, break loop.
            if sender.send(Message::Item(server_message)).await.is_err() {
                warn!("sending:tx:error");
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Item(message) => {
                    if session_tx.send(reply_to(message)).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                m => trace!("ws:ignoring {:?}", m),
            }
        }
    });

    // If any one of the tasks exit, abort the others.
    tokio::select! {
        _ = (&mut broadcasting_task) => {
            warn!("broadcasting-task:exited");
            send_task.abort();
            recv_task.abort();
        },
        _ = (&mut send_task) => {
            info!("send-task:exited");
            recv_task.abort();
            broadcasting_task.abort();
        },
        _ = (&mut recv_task) => {
            info!("recv-task:exited");
            send_task.abort();
            broadcasting_task.abort();
        },
    };

    info!("ws:disconnected");
}

fn reply_to(message: ClientMessage) -> ServerMessage {
    match message {
        ClientMessage::Ping => ServerMessage::Pong,
    }
}

/// Forwards broadcasts to one channel's session until either side closes,
/// skipping ahead if the channel falls behind.
async fn forward_broadcasts(
    mut rx: broadcast::Receiver<ServerMessage>,
    session_tx: mpsc::Sender<ServerMessage>,
) {
    loop {
        match rx.recv().await {
            Ok(server_message) => {
                if session_tx.send(server_message).await.is_err() {
                    warn!("broadcasting:tx:error");
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "broadcast:lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use engine::{Event, EventData, RecordId};
    use serde_json::json;

    #[test]
    fn it_names_creations_like_the_dashboard_expects() -> Result<()> {
        let created = Event::new(
            RecordId::new("E-0"),
            EventData {
                title: "Invoice A".to_owned(),
                ..Default::default()
            },
        );

        let value = serde_json::to_value(ServerMessage::InvoiceCreated(InvoiceCreated::from(
            &created,
        )))?;

        assert_eq!(value["invoice:created"]["invoice"]["title"], "Invoice A");
        assert_eq!(value["invoice:created"]["invoice"]["id"], "E-0");
        assert!(value["invoice:created"]["timestamp"].is_string());

        Ok(())
    }

    #[test]
    fn it_serializes_control_messages() -> Result<()> {
        assert_eq!(
            serde_json::to_value(ServerMessage::Welcome {})?,
            json!({ "welcome": {} })
        );
        assert_eq!(serde_json::to_value(ServerMessage::Pong)?, json!("pong"));

        Ok(())
    }

    fn created(title: &str) -> ServerMessage {
        ServerMessage::InvoiceCreated(InvoiceCreated::from(&Event::new(
            RecordId::new("E-0"),
            EventData {
                title: title.to_owned(),
                ..Default::default()
            },
        )))
    }

    fn title_of(message: ServerMessage) -> String {
        match message {
            ServerMessage::InvoiceCreated(created) => created.invoice.title,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn it_answers_ping_with_pong() {
        assert!(matches!(reply_to(ClientMessage::Ping), ServerMessage::Pong));
    }

    #[tokio::test]
    async fn it_forwards_broadcasts_in_order_until_closed() -> Result<()> {
        let (tx, rx) = broadcast::channel(8);
        let (session_tx, mut session_rx) = mpsc::channel(8);
        let forwarding = tokio::spawn(forward_broadcasts(rx, session_tx));

        tx.send(created("Invoice A"))?;
        tx.send(created("Invoice B"))?;
        drop(tx);

        forwarding.await?;

        assert_eq!(title_of(session_rx.recv().await.unwrap()), "Invoice A");
        assert_eq!(title_of(session_rx.recv().await.unwrap()), "Invoice B");
        assert!(session_rx.recv().await.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn it_skips_ahead_when_lagging() -> Result<()> {
        let (tx, rx) = broadcast::channel(2);
        let (session_tx, mut session_rx) = mpsc::channel(8);

        for i in 0..4 {
            tx.send(created(&format!("Invoice {}", i)))?;
        }
        drop(tx);

        forward_broadcasts(rx, session_tx).await;

        assert_eq!(title_of(session_rx.recv().await.unwrap()), "Invoice 2");
        assert_eq!(title_of(session_rx.recv().await.unwrap()), "Invoice 3");
        assert!(session_rx.recv().await.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn it_stops_forwarding_when_session_closes() -> Result<()> {
        let (tx, rx) = broadcast::channel(8);
        let (session_tx, session_rx) = mpsc::channel(8);
        drop(session_rx);

        let forwarding = tokio::spawn(forward_broadcasts(rx, session_tx));
        tx.send(created("Invoice A"))?;

        forwarding.await?;

        assert_eq!(tx.receiver_count(), 0);

        Ok(())
    }

    #[test]
    fn it_parses_ping() -> Result<()> {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>("\"ping\"")?,
            ClientMessage::Ping
        ));

        Ok(())
    }
}
