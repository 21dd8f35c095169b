use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::SinkExt;
use tokio::sync::mpsc;

use crate::models::{ResearchRequest, Stage, StageEvent};
use crate::state::AppState;

/// Events buffered between the orchestrator and the socket writer.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// GET /ws/research — upgrade to the streaming research protocol.
pub async fn research_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection loop: one pipeline run per received query.
///
/// Waiting for the next query is bounded by the idle timeout; exceeding it
/// (or a client close) ends the connection silently — no error event. After
/// an error event the connection closes; after a completed run the loop
/// waits for the next query on the same connection.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let idle_timeout = Duration::from_secs(state.config.ws_idle_timeout_secs);

    loop {
        let frame = match tokio::time::timeout(idle_timeout, socket.recv()).await {
            // Idle timeout: normal termination, nothing is sent
            Err(_) => {
                tracing::info!("Client idle past {}s, closing", idle_timeout.as_secs());
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(_))) => break,
            Ok(Some(Ok(msg))) => msg,
        };

        let text = match frame {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            // Ping/pong are handled by axum; binary frames carry nothing here
            _ => continue,
        };

        let request: ResearchRequest = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                send_error(&mut socket, format!("Invalid request: {e}")).await;
                break;
            }
        };

        tracing::info!("Starting research run for query: {}", request.query);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = state.pipeline.clone();
        let query = request.query;
        tokio::spawn(async move {
            pipeline.run(query, tx).await;
        });

        if forward_events(&mut socket, rx).await == RunOutcome::CloseConnection {
            break;
        }
    }

    let _ = socket.close().await;
}

#[derive(PartialEq)]
enum RunOutcome {
    /// The run finished cleanly; the connection stays open for another query.
    KeepConnection,
    /// An error event was sent or the client is gone; close the connection.
    CloseConnection,
}

/// Forward pipeline events to the client until the run ends.
///
/// Dropping the receiver on a failed socket send is what cancels the run:
/// the orchestrator stops at its next stage boundary once its sender fails.
async fn forward_events(
    socket: &mut WebSocket,
    mut rx: mpsc::Receiver<StageEvent>,
) -> RunOutcome {
    let mut outcome = RunOutcome::KeepConnection;

    while let Some(event) = rx.recv().await {
        if event.stage == Stage::Error {
            outcome = RunOutcome::CloseConnection;
        }

        match serde_json::to_string(&event) {
            Ok(json) => {
                if socket.send(Message::Text(json.into())).await.is_err() {
                    tracing::info!("Client disconnected mid-run");
                    return RunOutcome::CloseConnection;
                }
            }
            Err(e) => {
                // Serialization failure of the outgoing message is itself an
                // error event
                send_error(socket, format!("Failed to serialize event: {e}")).await;
                return RunOutcome::CloseConnection;
            }
        }
    }

    outcome
}

async fn send_error(socket: &mut WebSocket, message: String) {
    let event = StageEvent {
        stage: Stage::Error,
        status: message,
        data: None,
    };
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
}
