use crate::domain::{client_id_or_new, is_valid_game_id, ClientId, Envelope, COOKIE_NAME};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::EnvelopeDto;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{AddOutcome, HubCommand, HubHandle};

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{info, info_span, warn};

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ConnectQuery {
    // Overrides the clientID cookie when present.
    #[serde(default)]
    id: Option<String>,
    // Requests replay of everything after this Num.
    #[serde(default)]
    lastnum: Option<u64>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    jar: CookieJar,
) -> impl IntoResponse {
    if !is_valid_game_id(&game_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid game id".to_string(),
            }),
        )
            .into_response();
    }

    let cookie_value = jar.get(COOKIE_NAME).map(|c| c.value().to_string());
    let client_id = query
        .id
        .clone()
        .unwrap_or_else(|| client_id_or_new(cookie_value.as_deref()));

    let mut cookie = Cookie::new(COOKIE_NAME, client_id.clone());
    cookie.set_max_age(time::Duration::seconds(state.cookie_max_age_secs));
    cookie.set_path("/");
    let jar = jar.add(cookie);

    let lastnum = query.lastnum;
    let state = state.clone();
    let response = ws.on_upgrade(move |socket| handle_socket(socket, state, game_id, client_id, lastnum));
    (jar, response).into_response()
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    game_id: String,
    client_id: ClientId,
    lastnum: Option<u64>,
) {
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, game_id = %game_id, client_id = %client_id);
    let _enter = span.enter();

    let hub = state.registry.get_or_create(&game_id).await;

    let (outbound_tx, outbound_rx) = mpsc::channel(state.client_inbound_queue_capacity);
    let (reply_tx, reply_rx) = oneshot::channel();

    if hub
        .input_tx
        .send(HubCommand::Add {
            client_id: client_id.clone(),
            lastnum,
            outbound_tx,
            reply_tx,
        })
        .await
        .is_err()
    {
        warn!("hub input queue closed before admission");
        let _ = send_close(&mut socket, close_code::ERROR, "hub unavailable").await;
        return;
    }

    let outcome = match reply_rx.await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("hub dropped admission reply");
            let _ = send_close(&mut socket, close_code::ERROR, "hub unavailable").await;
            return;
        }
    };

    let (token, replaced_signal) = match outcome {
        AddOutcome::Admitted {
            token,
            replaced_signal,
        } => (token, replaced_signal),
        AddOutcome::RejectedLastNum => {
            let _ = send_close(&mut socket, 4000, "lastnum too old, reconnect without it").await;
            return;
        }
    };

    state.registry.register_connection(&hub);
    info!("client connected");

    run_client_loop(&mut socket, &hub, &client_id, token, outbound_rx, replaced_signal).await;

    state
        .registry
        .register_disconnect(&game_id, &hub.active_connections)
        .await;
    info!("client disconnected");
}

async fn send_close(socket: &mut WebSocket, code: u16, reason: &'static str) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await?;
    socket.close().await?;
    Ok(())
}

async fn send_envelope(socket: &mut WebSocket, env: &Envelope) -> Result<(), NetError> {
    let dto = EnvelopeDto::from(env);
    let txt = serde_json::to_string(&dto).map_err(NetError::Serialization)?;
    socket.send(Message::Text(txt.into())).await?;
    Ok(())
}

/// The read loop (socket -> hub) and write loop (hub -> socket) as a single
/// select!-driven task. A dead queue, a replaced connection, or a socket
/// error all converge on the same drain-then-close teardown so the socket
/// closes exactly once and the hub never blocks delivering to us.
async fn run_client_loop(
    socket: &mut WebSocket,
    hub: &HubHandle,
    client_id: &ClientId,
    token: u64,
    mut outbound_rx: mpsc::Receiver<Envelope>,
    replaced_signal: Arc<Notify>,
) {
    let mut close_frame: Option<CloseFrame> = None;
    let mut stop_already_posted = false;

    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        relay_message(hub, client_id, token, text.as_bytes().to_vec()).await;
                        false
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        relay_message(hub, client_id, token, bytes.to_vec()).await;
                        false
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => false,
                    Some(Ok(Message::Close(_))) => true,
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket recv error");
                        true
                    }
                    None => true,
                }
            }

            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(env) => {
                        if let Err(e) = send_envelope(socket, &env).await {
                            warn!(error = ?e, "failed to write envelope");
                            true
                        } else {
                            false
                        }
                    }
                    None => {
                        // Hub closed our queue: it already evicted us.
                        stop_already_posted = true;
                        true
                    }
                }
            }

            _ = replaced_signal.notified() => {
                close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                });
                stop_already_posted = true;
                info!("connection replaced by newer session");
                true
            }
        };

        if disconnect {
            break;
        }
    }

    if !stop_already_posted {
        let _ = hub
            .input_tx
            .send(HubCommand::Stop {
                client_id: client_id.clone(),
                token,
            })
            .await;
    }

    if let Some(frame) = close_frame.take() {
        let _ = socket.send(Message::Close(Some(frame))).await;
    }
    // Drain phase: discard anything still queued until the hub closes us,
    // guaranteeing the hub never blocks delivering to a dead client.
    while outbound_rx.recv().await.is_some() {}
    let _ = socket.close().await;
}

async fn relay_message(hub: &HubHandle, client_id: &ClientId, token: u64, body: Vec<u8>) {
    // Enqueue blocks if the hub is saturated; backpressure propagates to the socket.
    let _ = hub
        .input_tx
        .send(HubCommand::Message {
            client_id: client_id.clone(),
            token,
            body,
        })
        .await;
}
