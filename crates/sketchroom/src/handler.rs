//! Per-connection handler: decode client events and route them to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound channel. The
//! room actor pushes into that channel directly, so fan-out never waits
//! on this task's pending `recv`.

use std::sync::Arc;

use sketchroom_protocol::{ClientEvent, Codec, ErrorKind, RoomId, ServerEvent, UserId};
use sketchroom_room::{ClientHandle, RoomError, RoomHandle, RoomStore, WordSource};
use sketchroom_transport::{
    Connection, ConnectionId, FrameReceiver, FrameSender, WebSocketConnection, WebSocketSender,
};
use tokio::sync::mpsc;

use crate::SketchroomError;
use crate::server::ServerState;

/// The room and user this connection speaks for, fixed on join.
struct Binding {
    room: RoomHandle,
    user_id: UserId,
}

impl Binding {
    fn room_id(&self) -> &RoomId {
        self.room.room_id()
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, W, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, W, C>>,
) -> Result<(), SketchroomError>
where
    S: RoomStore,
    W: WordSource,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (sink, mut stream) = conn.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(sink, rx, state.codec.clone()));

    let mut binding: Option<Binding> = None;

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, stream.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, dropping");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode client event");
                let _ = tx.send(ServerEvent::ErrorMessage {
                    kind: ErrorKind::Protocol,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = handle_event(&state, conn_id, &tx, &mut binding, event).await {
            tracing::debug!(%conn_id, error = %e, "request rejected");
            let _ = tx.send(ServerEvent::ErrorMessage {
                kind: e.kind(),
                message: e.to_string(),
            });
        }
    }

    if let Some(binding) = binding {
        if let Err(e) = binding.room.disconnect(binding.user_id, conn_id).await {
            tracing::debug!(%conn_id, error = %e, "room gone before disconnect");
        }
    }
    writer.abort();
    Ok(())
}

/// Encodes and writes outbound events until every sender is gone or the
/// socket fails.
async fn write_loop<C: Codec>(
    mut sink: WebSocketSender,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    codec: C,
) {
    let conn_id = sink.id();
    while let Some(event) = rx.recv().await {
        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode server event");
                continue;
            }
        };
        if let Err(e) = sink.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    let _ = sink.close().await;
}

/// Routes one decoded event.
async fn handle_event<S, W, C>(
    state: &Arc<ServerState<S, W, C>>,
    conn_id: ConnectionId,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    binding: &mut Option<Binding>,
    event: ClientEvent,
) -> Result<(), RoomError>
where
    S: RoomStore,
    W: WordSource,
    C: Codec,
{
    match event {
        ClientEvent::CreateRoom {
            user_id,
            username,
            name,
            settings,
        } => {
            if let Some(b) = binding {
                return Err(RoomError::Invalid(format!(
                    "connection is already in room {}",
                    b.room_id()
                )));
            }
            let rooms = &state.rooms;
            let room_id = rooms.create_room(user_id.clone(), &name, settings).await?;
            let _ = tx.send(ServerEvent::RoomCreated {
                room_id: room_id.clone(),
            });
            let client = ClientHandle::new(conn_id, tx.clone());
            match rooms.join(&room_id, user_id.clone(), &username, client).await {
                Ok(room) => *binding = Some(Binding { room, user_id }),
                Err(e) => {
                    let _ = rooms.destroy_room(&room_id).await;
                    return Err(e);
                }
            }
        }

        ClientEvent::JoinRoom {
            room_id,
            user_id,
            username,
        } => {
            if let Some(b) = binding {
                if b.room_id() != &room_id || b.user_id != user_id {
                    return Err(RoomError::Invalid(format!(
                        "connection is bound to {} in room {}",
                        b.user_id,
                        b.room_id()
                    )));
                }
            }
            let client = ClientHandle::new(conn_id, tx.clone());
            let room = state
                .rooms
                .join(&room_id, user_id.clone(), &username, client)
                .await?;
            *binding = Some(Binding { room, user_id });
        }

        ClientEvent::ListRooms => {
            let rooms = state.rooms.list_rooms().await;
            let _ = tx.send(ServerEvent::RoomList { rooms });
        }

        event => {
            let b = bound(binding, &event)?;
            let room = b.room.clone();
            let user_id = b.user_id.clone();
            match event {
                ClientEvent::StartGame { .. } => room.start(user_id).await?,
                ClientEvent::SubmitGuess { text, .. } => room.guess(user_id, text).await?,
                ClientEvent::EndGame { .. } => room.end_game(user_id).await?,
                ClientEvent::Draw { stroke, .. } => room.draw(user_id, stroke).await?,
                ClientEvent::ClearCanvas { .. } => room.clear_canvas(user_id).await?,
                ClientEvent::LeaveRoom { .. } => {
                    room.leave(user_id).await?;
                    *binding = None;
                }
                ClientEvent::CreateRoom { .. }
                | ClientEvent::JoinRoom { .. }
                | ClientEvent::ListRooms => {}
            }
        }
    }
    Ok(())
}

/// The binding a room-scoped event must match.
fn bound<'a>(
    binding: &'a Option<Binding>,
    event: &ClientEvent,
) -> Result<&'a Binding, RoomError> {
    let Some(b) = binding else {
        return Err(RoomError::Invalid("join a room first".into()));
    };
    if event.room_id().is_some_and(|id| id != b.room_id()) {
        return Err(RoomError::Invalid(format!(
            "connection is bound to room {}",
            b.room_id()
        )));
    }
    if event.user_id().is_some_and(|id| id != &b.user_id) {
        return Err(RoomError::Invalid(format!(
            "connection is bound to user {}",
            b.user_id
        )));
    }
    Ok(b)
}
