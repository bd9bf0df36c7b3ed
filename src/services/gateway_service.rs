use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{dto::gateway::GatewayReply, state::SharedState};

/// Serve the gateway connection: commands flow out through the bridge, replies flow back in.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let session = state.bridge().attach(outbound_tx.clone()).await;

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&state, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(session = %session, error = %err, "gateway websocket receive error");
                break;
            }
        }
    }

    state.bridge().detach(session).await;
    finalize(writer_task, outbound_tx).await;
    info!(session = %session, "gateway connection closed");
}

fn handle_text(state: &SharedState, text: &str) {
    match serde_json::from_str::<GatewayReply>(text) {
        Ok(reply) => state.bridge().resolve(reply),
        Err(err) => debug!(error = %err, "ignoring malformed gateway frame"),
    }
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
