use crate::domain::{AvatarId, Vec2, WorldError};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::{AppState, ConnectionSlot};
use crate::interface_adapters::utils::ids::{next_conn_id, next_player_id};
use crate::use_cases::{GameEvent, Outbound};

use axum::{
    Error, Json,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    JoinRequired,
    JoinTimeout,
    #[allow(dead_code)]
    JoinRejected(WorldError),
    ClosedBeforeJoin,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const CHAT_MIN_INTERVAL: Duration = Duration::from_millis(500);
const MAX_NAME_CHARS: usize = 16;
const MAX_CHAT_CHARS: usize = 200;
const DEFAULT_NAME: &str = "Player";

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<Outbound>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each outbound message once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(outbound) => {
                let is_snapshot = matches!(outbound, Outbound::World(_));
                let msg = ServerMessage::from(outbound);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize outbound message");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                if is_snapshot {
                    // Only full snapshots are useful for lag recovery.
                    world_latest_tx.send_replace(bytes.clone());
                }
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_world_serializer(state: &AppState) {
    tokio::spawn(world_update_serializer(
        state.world_tx.subscribe(),
        state.world_bytes_tx.clone(),
        state.world_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(slot) = ConnectionSlot::acquire(&state) else {
        warn!(
            connections = state.connection_count(),
            "connection limit reached; refusing upgrade"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "server full".to_string(),
            }),
        )
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, slot))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, slot: ConnectionSlot) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = next_conn_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    serve_connection(socket, state, slot).instrument(span).await;
}

// `_slot` keeps the connection counted until the socket is fully torn down.
async fn serve_connection(mut socket: WebSocket, state: Arc<AppState>, _slot: ConnectionSlot) {
    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e @ (NetError::JoinRequired | NetError::JoinTimeout | NetError::JoinRejected(_))) => {
            // Close frame already sent with the specific reason.
            warn!(error = ?e, "join handshake failed");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = send_close_with_reason(&mut socket, close_code::POLICY, "bootstrap failed").await;
            return;
        }
    };

    tracing::Span::current().record("player_id", ctx.player_id);
    info!(player_id = ctx.player_id, name = %ctx.name, "client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: AvatarId,
    pub name: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,
    pub last_chat_at: Option<Instant>,

    pub last_input_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    name: String,
    bytes_in: u64,
    msgs_in: u64,
    invalid_json: u32,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
) -> Result<ConnCtx, NetError> {
    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let player_id = next_player_id();
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .input_tx
        .send(GameEvent::Join {
            player_id,
            name: join.name.clone(),
            reply: reply_tx,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let init = match reply_rx.await {
        Ok(Ok(init)) => init,
        Ok(Err(err)) => {
            // Nothing was inserted, so there is nothing to Leave.
            let _ = send_close_with_reason(socket, close_code::POLICY, "join rejected").await;
            return Err(NetError::JoinRejected(err));
        }
        Err(_) => return Err(NetError::InputClosed),
    };

    // Subscribe once `init` is in hand: anything broadcast earlier is already part of it.
    let world_bytes_rx = state.world_bytes_tx.subscribe();
    let world_latest_rx = state.world_latest_tx.subscribe();

    let init_bytes = match send_message(socket, &ServerMessage::Init(init.into())).await {
        Ok(bytes) => bytes,
        Err(err) => {
            // The avatar exists now; compensate so it does not linger without a session.
            state
                .input_tx
                .send(GameEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
            return Err(err);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        name: join.name,
        input_tx: state.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 1,
        bytes_in: join.bytes_in,
        bytes_out: init_bytes as u64,

        invalid_json: join.invalid_json,
        last_chat_at: None,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    let mut bytes_in = 0;
    let mut msgs_in = 0;
    let mut invalid_json = 0;
    let mut last_invalid_log = Instant::now() - LOG_THROTTLE;

    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                bytes_in += text.len() as u64;
                msgs_in += 1;
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => {
                        return Ok(JoinHandshake {
                            name: sanitize_name(&payload.name),
                            bytes_in,
                            msgs_in,
                            invalid_json,
                        });
                    }
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(parse_err) => {
                        // Malformed text is dropped; the handshake timeout bounds the wait.
                        invalid_json += 1;
                        if should_log(&mut last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse message before join"
                            );
                        }
                    }
                }
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Trimmed, control-free and at most `MAX_NAME_CHARS` long; blank names become `DEFAULT_NAME`.
fn sanitize_name(raw: &str) -> String {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_CHARS)
        .collect();
    let name = name.trim_end();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name.to_string()
    }
}

// Chat is relayed verbatim up to `MAX_CHAT_CHARS`; blank messages are dropped.
fn sanitize_chat(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    Some(raw.chars().take(MAX_CHAT_CHARS).collect())
}

fn chat_allowed(last: Option<Instant>, now: Instant) -> bool {
    last.is_none_or(|at| now.saturating_duration_since(at) >= CHAT_MIN_INTERVAL)
}

// Rejects NaN/inf anywhere; movement components are clamped to [-1, 1].
fn sanitize_intent(
    movement: Option<Vec2>,
    aim: Option<f32>,
) -> Option<(Option<Vec2>, Option<f32>)> {
    if movement.is_some_and(|m| !m.is_finite()) || aim.is_some_and(|a| !a.is_finite()) {
        return None;
    }

    let movement = movement.map(|m| Vec2::new(m.x.clamp(-1.0, 1.0), m.y.clamp(-1.0, 1.0)));
    Some((movement, aim))
}

// Maps a gameplay message to a world command, or `None` if it should be dropped here.
fn to_game_event(ctx: &mut ConnCtx, msg: ClientMessage) -> Option<GameEvent> {
    let player_id = ctx.player_id;
    match msg {
        ClientMessage::Join(_) => {
            // Ignore repeated Join packets after bootstrap to keep the session stable.
            if should_log(&mut ctx.last_invalid_input_log) {
                warn!(player_id, "duplicate join ignored");
            }
            None
        }
        ClientMessage::Input(input) => match sanitize_intent(input.movement(), input.angle) {
            Some((movement, aim)) => Some(GameEvent::Input {
                player_id,
                movement,
                aim,
            }),
            None => {
                if should_log(&mut ctx.last_invalid_input_log) {
                    warn!(player_id, "invalid input values (NaN/inf); dropping");
                }
                None
            }
        },
        ClientMessage::Move(payload) => {
            match sanitize_intent(Some(payload.movement()), payload.direction) {
                Some((movement, aim)) => Some(GameEvent::Input {
                    player_id,
                    movement,
                    aim,
                }),
                None => {
                    if should_log(&mut ctx.last_invalid_input_log) {
                        warn!(player_id, "invalid move direction; dropping");
                    }
                    None
                }
            }
        }
        ClientMessage::Shoot(payload) => {
            let target = payload.target.map(Vec2::from);
            if target.is_some_and(|t| !t.is_finite()) {
                if should_log(&mut ctx.last_invalid_input_log) {
                    warn!(player_id, "invalid shoot target; dropping");
                }
                return None;
            }
            Some(GameEvent::Shoot {
                player_id,
                target,
                at: Instant::now(),
            })
        }
        ClientMessage::Chat(payload) => {
            let text = sanitize_chat(&payload.text)?;
            let now = Instant::now();
            if !chat_allowed(ctx.last_chat_at, now) {
                debug!(player_id, "chat rate limited");
                return None;
            }
            ctx.last_chat_at = Some(now);
            Some(GameEvent::Chat { player_id, text })
        }
    }
}

// A full queue drops the command: the world task is behind and the next input supersedes it.
fn forward_event(ctx: &mut ConnCtx, event: GameEvent) -> Result<LoopControl, NetError> {
    match ctx.input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(player_id = ctx.player_id, "input channel full; dropping command");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing snapshot or notice
            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => {
                        match forward_world_bytes(bytes, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await {
                            LoopControl::Continue => false,
                            LoopControl::Disconnect => true,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        matches!(recover_from_lag(n, socket, ctx).await, LoopControl::Disconnect)
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(player_id, error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => match to_game_event(ctx, msg) {
                        Some(event) => forward_event(ctx, event),
                        None => Ok(LoopControl::Continue),
                    },
                    Err(parse_err) => {
                        // Malformed messages are counted and dropped; the session stays open.
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

// Resync strategy: the receiver already skipped ahead; also send the newest snapshot.
async fn recover_from_lag(missed: u64, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    if should_log(&mut ctx.last_world_lag_log) {
        warn!(missed, "world updates lagged; sending snapshot");
    }

    let latest = ctx.world_latest_rx.borrow().clone();
    if latest.is_empty() {
        return LoopControl::Continue;
    }

    let bytes_len = latest.len();
    ctx.lag_recovery_count += 1;
    let outcome = forward_world_bytes(latest, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await;
    debug!(
        player_id = ctx.player_id,
        bytes = bytes_len,
        count = ctx.lag_recovery_count,
        "sent lag recovery snapshot"
    );
    outcome
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    ctx.input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}
