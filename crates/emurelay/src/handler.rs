//! Per-connection handler: registration, event routing, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Derive a PlayerId from the connection id
//!   2. Register the player's event sink → the `connected` ack goes out
//!   3. Spawn a writer task draining the sink onto the socket
//!   4. Loop: receive frames → decode → dispatch to the registry
//!
//! Request-scoped failures become `error` events on the same
//! connection; only transport failures end the handler.

use std::sync::Arc;

use emurelay_protocol::{
    ClientEvent, Codec, GameMeta, PlayerId, ServerEvent,
};
use emurelay_registry::NewSession;
use emurelay_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RelayError;
use crate::server::HubState;

/// Drop guard that removes a player from the registry when the handler
/// exits. This ensures cleanup (room departure, host failover, session
/// teardown) happens even if the handler errors out or panics. Since
/// `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async lock.
struct ConnectionGuard {
    player_id: PlayerId,
    state: Arc<HubState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.registry.lock().await.disconnect(player_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<HubState>,
) -> Result<(), RelayError> {
    let player_id = PlayerId(conn.id().into_inner());
    tracing::debug!(%player_id, "handling new connection");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Registering the sink also queues the `connected` ack, so the
    // writer must be running before anything can pile up.
    let writer_conn = conn.clone();
    let writer_codec = state.codec;
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match writer_codec.encode(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if writer_conn.send(&text).await.is_err() {
                // Peer is gone; the read side will notice and clean up.
                break;
            }
        }
    });

    state.registry.lock().await.connect(player_id, tx.clone());
    let guard = ConnectionGuard {
        player_id,
        state: Arc::clone(&state),
    };

    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&text) {
            Ok(event) => event,
            Err(e) => {
                // A malformed frame is the client's problem, not a
                // reason to drop the connection.
                tracing::debug!(%player_id, error = %e, "undecodable frame");
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                    context: None,
                });
                continue;
            }
        };

        dispatch(&state, player_id, event, &tx).await;
    }

    // The guard's disconnect drops the registry's sink; dropping our
    // local handle too lets the writer drain out and finish.
    drop(guard);
    drop(tx);
    let _ = writer.await;
    let _ = conn.close().await;
    Ok(())
}

/// Routes one decoded event to the registry, reporting request-scoped
/// failures back on the sender's own sink.
async fn dispatch(
    state: &Arc<HubState>,
    player_id: PlayerId,
    event: ClientEvent,
    tx: &mpsc::UnboundedSender<ServerEvent>,
) {
    let mut registry = state.registry.lock().await;

    let result = match event {
        ClientEvent::CreateRoom { game, username } => registry
            .create_room(player_id, game, username)
            .map(drop)
            .map_err(|e| ("create-room", e)),

        ClientEvent::JoinRoom { room_code, username } => registry
            .join_room(player_id, &room_code, username)
            .map_err(|e| ("join-room", e)),

        ClientEvent::CreateSession {
            session_name,
            game_id,
            game_title,
            game_platform,
            game_cover,
            max_players,
            is_public,
            host_user_id,
            host_name,
        } => registry
            .create_session(
                player_id,
                NewSession {
                    session_name,
                    game: GameMeta {
                        id: game_id,
                        title: game_title,
                        platform: game_platform,
                        cover: game_cover,
                        extra: Default::default(),
                    },
                    max_players,
                    is_public,
                    host_user_id,
                    host_name,
                },
            )
            .map(drop)
            .map_err(|e| ("create-session", e)),

        ClientEvent::JoinSession {
            session_id,
            user_id,
            user_name,
            game_id: _,
        } => registry
            .join_session(player_id, &session_id, user_id, user_name)
            .map_err(|e| ("join-session", e)),

        ClientEvent::JoinOrCreateSession {
            session_id,
            game,
            username,
        } => registry
            .join_or_create_session(player_id, &session_id, game, username)
            .map_err(|e| ("join-or-create-session", e)),

        ClientEvent::LeaveRoom => {
            registry.leave_room(player_id);
            Ok(())
        }

        ClientEvent::Input(payload) => {
            registry.relay_input(player_id, payload);
            Ok(())
        }

        ClientEvent::GuestInput(payload) => {
            registry.relay_guest_input(player_id, payload);
            Ok(())
        }

        ClientEvent::SyncState(payload) => {
            registry.relay_sync_state(player_id, payload);
            Ok(())
        }

        ClientEvent::ChatMessage { message } => {
            registry.relay_chat(player_id, message);
            Ok(())
        }

        ClientEvent::CheckRoom { room_code } => {
            registry.check_room(player_id, &room_code);
            Ok(())
        }

        ClientEvent::GetLobbySessions => {
            registry.lobby_sessions(player_id);
            Ok(())
        }

        ClientEvent::Heartbeat => {
            registry.heartbeat(player_id);
            Ok(())
        }
    };

    if let Err((context, e)) = result {
        tracing::debug!(%player_id, context, error = %e, "request failed");
        let _ = tx.send(ServerEvent::Error {
            message: e.to_string(),
            context: Some(context.to_string()),
        });
    }
}
