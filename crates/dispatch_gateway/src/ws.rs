//! WebSocket endpoint: one reader loop and one writer task per socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::session::Session;
use crate::state::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    tracing::debug!(%conn_id, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(conn_id, tx);
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                // Coordinator calls block, so each frame runs on the blocking pool.
                let user = session.user_id().cloned();
                let worker_state = state.clone();
                let handled = tokio::task::spawn_blocking(move || {
                    session.handle_text(&worker_state, &text);
                    session
                })
                .await;
                match handled {
                    Ok(returned) => session = returned,
                    Err(error) => {
                        tracing::error!(%conn_id, %error, "frame handler failed");
                        if let Some(user) = user {
                            let _ = tokio::task::spawn_blocking(move || {
                                Session::release(&state, &user, conn_id);
                            })
                            .await;
                        }
                        return;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(%conn_id, %error, "socket error");
                break;
            }
        }
    }

    // Dropping the session releases the last sender, which ends the writer.
    if let Err(error) = tokio::task::spawn_blocking(move || session.close(&state)).await {
        tracing::error!(%conn_id, %error, "connection cleanup failed");
    }
    if let Err(error) = writer.await {
        tracing::warn!(%conn_id, %error, "writer task failed");
    }
}
