//! Room coordinator: an isolated Tokio task that owns one room.
//!
//! Every command for a room, and every timer or alarm that comes due,
//! is applied by this task one at a time. Nothing else touches the
//! [`RoomSession`], so there is no locking around game state.

use std::sync::Arc;

use sketchroom_protocol::{GamePhase, RoomId, RoomSummary, ServerEvent, UserId};
use sketchroom_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot, watch};

use crate::gateway::{BroadcastGateway, ClientHandle};
use crate::session::{Outbound, RoomSession};
use crate::store::{RoomStore, backoff_delay};
use crate::{RoomError, WordSource};

type Reply = oneshot::Sender<Result<(), RoomError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        user_id: UserId,
        username: String,
        client: ClientHandle,
        reply: Reply,
    },
    Start {
        caller: UserId,
        reply: Reply,
    },
    Guess {
        user_id: UserId,
        text: String,
        reply: Reply,
    },
    Leave {
        user_id: UserId,
        reply: Reply,
    },
    EndGame {
        caller: UserId,
        reply: Reply,
    },
    Draw {
        user_id: UserId,
        stroke: String,
        reply: Reply,
    },
    ClearCanvas {
        user_id: UserId,
        reply: Reply,
    },
    /// A transport dropped. Fire-and-forget.
    Disconnect {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Room metadata, without the game itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub name: String,
    pub phase: GamePhase,
    pub participant_count: usize,
    /// Participants with a live transport.
    pub connected_count: usize,
    pub max_players: usize,
}

impl RoomInfo {
    fn of(session: &RoomSession) -> Self {
        let participants = session.participants();
        Self {
            room_id: session.room_id().clone(),
            name: session.name().to_string(),
            phase: session.phase(),
            participant_count: participants.len(),
            connected_count: participants.iter().filter(|p| p.connected).count(),
            max_players: session.config().max_players,
        }
    }

    /// The lobby-list form of this info.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            phase: self.phase,
            participant_count: self.participant_count,
            max_players: self.max_players,
        }
    }
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    info: watch::Receiver<RoomInfo>,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Start { .. } => "Start",
            Self::Guess { .. } => "Guess",
            Self::Leave { .. } => "Leave",
            Self::EndGame { .. } => "EndGame",
            Self::Draw { .. } => "Draw",
            Self::ClearCanvas { .. } => "ClearCanvas",
            Self::Disconnect { .. } => "Disconnect",
            Self::GetInfo { .. } => "GetInfo",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Whether the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// The info the actor last published. Never waits on the actor, so
    /// it stays cheap while the room is busy (loading words, retrying a
    /// save); use [`get_info`](Self::get_info) for a fresh answer.
    pub fn latest_info(&self) -> RoomInfo {
        self.info.borrow().clone()
    }

    /// Whether both handles address the same actor.
    pub fn same_actor(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    async fn request(&self, build: impl FnOnce(Reply) -> RoomCommand) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Joins (or rejoins) the room, binding `client` for outbound events.
    pub async fn join(
        &self,
        user_id: UserId,
        username: impl Into<String>,
        client: ClientHandle,
    ) -> Result<(), RoomError> {
        let username = username.into();
        self.request(|reply| RoomCommand::Join {
            user_id,
            username,
            client,
            reply,
        })
        .await
    }

    /// Starts the game. Host only.
    pub async fn start(&self, caller: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { caller, reply }).await
    }

    /// Submits a guess.
    pub async fn guess(&self, user_id: UserId, text: impl Into<String>) -> Result<(), RoomError> {
        let text = text.into();
        self.request(|reply| RoomCommand::Guess {
            user_id,
            text,
            reply,
        })
        .await
    }

    /// Leaves the room for good.
    pub async fn leave(&self, user_id: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { user_id, reply }).await
    }

    /// Ends the game early. Host only.
    pub async fn end_game(&self, caller: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::EndGame { caller, reply }).await
    }

    /// Relays a stroke. Drawer only.
    pub async fn draw(&self, user_id: UserId, stroke: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Draw {
            user_id,
            stroke,
            reply,
        })
        .await
    }

    /// Clears the canvas. Drawer only.
    pub async fn clear_canvas(&self, user_id: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ClearCanvas { user_id, reply })
            .await
    }

    /// Reports that `connection_id` stopped speaking for `user_id`.
    pub async fn disconnect(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnect {
                user_id,
                connection_id,
            })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to tear down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S, W> {
    session: RoomSession,
    gateway: BroadcastGateway,
    store: Arc<S>,
    words: Arc<W>,
    receiver: mpsc::Receiver<RoomCommand>,
    info_tx: watch::Sender<RoomInfo>,
    closing: bool,
}

impl<S: RoomStore, W: WordSource> RoomActor<S, W> {
    async fn run(mut self) {
        let room_id = self.session.room_id().clone();
        tracing::info!(%room_id, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Shutdown) => {
                        tracing::info!(%room_id, "room shutting down");
                        self.teardown().await;
                    }
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                due = self.session.next_scheduled() => {
                    let out = self.session.on_scheduled(due);
                    if let Err(e) = self.apply(out).await {
                        tracing::warn!(%room_id, error = %e, "scheduled transition not persisted");
                    }
                }
            }
            if self.closing {
                break;
            }
            self.publish();
        }

        tracing::info!(%room_id, "room actor stopped");
    }

    async fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                user_id,
                username,
                client,
                reply,
            } => {
                let result = self.handle_join(user_id, &username, client).await;
                self.respond(reply, result);
            }
            RoomCommand::Start { caller, reply } => {
                let result = self.handle_start(&caller).await;
                self.respond(reply, result);
            }
            RoomCommand::Guess {
                user_id,
                text,
                reply,
            } => {
                let result = self.session.submit_guess(&user_id, &text);
                let result = self.settle(result).await;
                self.respond(reply, result);
            }
            RoomCommand::Leave { user_id, reply } => {
                self.gateway.remove(&user_id);
                let result = self.session.leave(&user_id);
                let result = self.settle(result).await;
                self.respond(reply, result);
            }
            RoomCommand::EndGame { caller, reply } => {
                let result = self.session.end_game(&caller);
                let result = self.settle(result).await;
                self.respond(reply, result);
            }
            RoomCommand::Draw {
                user_id,
                stroke,
                reply,
            } => {
                let result = self.session.draw(&user_id, stroke);
                let result = self.settle(result).await;
                self.respond(reply, result);
            }
            RoomCommand::ClearCanvas { user_id, reply } => {
                let result = self.session.clear_canvas(&user_id);
                let result = self.settle(result).await;
                self.respond(reply, result);
            }
            RoomCommand::Disconnect {
                user_id,
                connection_id,
            } => {
                if self.gateway.detach(&user_id, connection_id) {
                    let out = self.session.disconnect(&user_id);
                    if let Err(e) = self.apply(out).await {
                        tracing::warn!(
                            room_id = %self.session.room_id(),
                            %user_id,
                            error = %e,
                            "disconnect not persisted"
                        );
                    }
                }
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => self.teardown().await,
        }
    }

    async fn handle_join(
        &mut self,
        user_id: UserId,
        username: &str,
        client: ClientHandle,
    ) -> Result<(), RoomError> {
        let out = self.session.join(&user_id, username)?;
        self.gateway.attach(user_id, client);
        self.apply(out).await
    }

    async fn handle_start(&mut self, caller: &UserId) -> Result<(), RoomError> {
        let request = self.session.prepare_start(caller)?;
        let timeout = self.session.config().word_source_timeout;
        let words = match tokio::time::timeout(
            timeout,
            self.words
                .generate(request.difficulty, &request.category, request.count),
        )
        .await
        {
            Ok(words) => words,
            Err(_) => {
                tracing::warn!(
                    room_id = %self.session.room_id(),
                    timeout_ms = timeout.as_millis() as u64,
                    "word source timed out"
                );
                Vec::new()
            }
        };
        let out = self.session.start(caller, words)?;
        self.apply(out).await
    }

    async fn settle(&mut self, result: Result<Vec<Outbound>, RoomError>) -> Result<(), RoomError> {
        self.apply(result?).await
    }

    /// Delivers a batch of deltas, then persists it if it changed state.
    async fn apply(&mut self, out: Vec<Outbound>) -> Result<(), RoomError> {
        if out.is_empty() {
            return Ok(());
        }
        let persist = out.iter().any(Outbound::changes_state);
        let close = out.iter().any(|o| matches!(o, Outbound::Close));
        self.dispatch(out);

        if close {
            self.teardown().await;
            Ok(())
        } else if persist {
            self.persist().await
        } else {
            Ok(())
        }
    }

    /// Fans deltas out through the gateway. Snapshots are rendered per
    /// recipient so only the drawer ever receives the word.
    fn dispatch(&self, out: Vec<Outbound>) {
        for item in out {
            match item {
                Outbound::Event(recipient, event) => {
                    for p in self.session.participants() {
                        if recipient.includes(&p.user_id) {
                            self.gateway.send(&p.user_id, event.clone());
                        }
                    }
                }
                Outbound::Snapshot(recipient) => {
                    for p in self.session.participants() {
                        if recipient.includes(&p.user_id) && self.gateway.is_connected(&p.user_id) {
                            let snapshot = self.session.snapshot_for(&p.user_id);
                            self.gateway
                                .send(&p.user_id, ServerEvent::RoomSnapshot(snapshot));
                        }
                    }
                }
                Outbound::Close => {}
            }
        }
    }

    /// Saves the room, retrying transient failures with backoff.
    async fn persist(&self) -> Result<(), RoomError> {
        let doc = self.session.document();
        let attempts = self.session.config().store_retry_attempts;
        let mut attempt = 1;
        loop {
            match self.store.save(&doc).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        room_id = %doc.room_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "room save failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        room_id = %doc.room_id,
                        attempts,
                        error = %e,
                        "room save failed, giving up"
                    );
                    return Err(RoomError::Store {
                        room_id: doc.room_id,
                        source: e,
                    });
                }
            }
        }
    }

    async fn teardown(&mut self) {
        let room_id = self.session.room_id().clone();
        if let Err(e) = self.store.delete(&room_id).await {
            tracing::warn!(%room_id, error = %e, "could not delete room document");
        }
        self.closing = true;
    }

    fn info(&self) -> RoomInfo {
        RoomInfo::of(&self.session)
    }

    /// Publishes the current info for [`RoomHandle::latest_info`].
    fn publish(&self) {
        let current = self.info();
        self.info_tx.send_if_modified(|published| {
            if *published == current {
                return false;
            }
            *published = current;
            true
        });
    }

    /// Publishes first so the caller observes its own change.
    fn respond(&self, reply: Reply, result: Result<(), RoomError>) {
        self.publish();
        let _ = reply.send(result);
    }
}

/// Spawns a room actor for `session` and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it fills.
pub fn spawn_room<S: RoomStore, W: WordSource>(
    session: RoomSession,
    store: Arc<S>,
    words: Arc<W>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room_id = session.room_id().clone();
    let (info_tx, info_rx) = watch::channel(RoomInfo::of(&session));

    let actor = RoomActor {
        session,
        gateway: BroadcastGateway::new(),
        store,
        words,
        receiver: rx,
        info_tx,
        closing: false,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        info: info_rx,
    }
}
