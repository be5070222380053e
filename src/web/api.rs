//! Axum routes: plot submission, pause/resume/cancel, status, and a
//! WebSocket carrying both the event broadcast and the control channel.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::events::{ControlMessage, Event};
use crate::motion::Plan;
use crate::supervisor::{PlotSupervisor, SupervisorError};

use super::models::{ErrorResponse, OkResponse, PlotStatusResponse};

pub fn create_router<T>(supervisor: PlotSupervisor<T>) -> Router
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    Router::new()
        .route("/plot", post(post_plot::<T>))
        .route("/cancel", post(post_cancel::<T>))
        .route("/pause", post(post_pause::<T>))
        .route("/resume", post(post_resume::<T>))
        .route("/plot/status", get(get_status::<T>))
        .route("/ws", get(ws_upgrade::<T>))
        .with_state(supervisor)
}

/// Body is parsed by hand rather than via the `Json<Plan>` extractor: a
/// malformed or invariant-violating plan is `InvalidPlan` (spec §7), which
/// is a `500` at ingest with nothing executed — distinct from axum's
/// default `400` rejection for a `Json` extractor failure, and from this
/// handler's own `400` for `PlotInProgress`.
async fn post_plot<T>(State(supervisor): State<PlotSupervisor<T>>, body: Bytes) -> impl IntoResponse
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let plan: Plan = match serde_json::from_slice(&body) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(error = %e, "rejecting invalid plan");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: format!("invalid plan: {e}") }))
                .into_response();
        }
    };

    match supervisor.submit(plan) {
        Ok(()) => (StatusCode::OK, Json(OkResponse::OK)).into_response(),
        Err(e @ SupervisorError::PlotInProgress) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

async fn post_cancel<T>(State(supervisor): State<PlotSupervisor<T>>) -> impl IntoResponse
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    supervisor.request_cancel();
    Json(OkResponse::OK)
}

async fn post_pause<T>(State(supervisor): State<PlotSupervisor<T>>) -> impl IntoResponse
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    supervisor.request_pause();
    Json(OkResponse::OK)
}

async fn post_resume<T>(State(supervisor): State<PlotSupervisor<T>>) -> impl IntoResponse
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    supervisor.request_resume();
    Json(OkResponse::OK)
}

async fn get_status<T>(State(supervisor): State<PlotSupervisor<T>>) -> impl IntoResponse
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let progress = supervisor.progress();
    Json(PlotStatusResponse {
        plotting: progress.is_some(),
        current_motion_index: progress.map(|(idx, _)| idx),
        total_motions: progress.map(|(_, total)| total),
    })
}

async fn ws_upgrade<T>(ws: WebSocketUpgrade, State(supervisor): State<PlotSupervisor<T>>) -> impl IntoResponse
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    ws.on_upgrade(move |socket| handle_socket(socket, supervisor))
}

async fn handle_socket<T>(mut socket: WebSocket, supervisor: PlotSupervisor<T>)
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut events = supervisor.subscribe();

    let (dev, plan) = supervisor.subscribe_snapshot();
    for event in [dev, plan].into_iter().flatten() {
        if !send_event(&mut socket, &event).await {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "client fell behind on event stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_control_message(&mut socket, &text, &supervisor).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &Event) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to serialize event");
            true
        }
    }
}

/// Returns `false` if the socket should be closed.
async fn handle_control_message<T>(socket: &mut WebSocket, text: &str, supervisor: &PlotSupervisor<T>) -> bool
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let msg: ControlMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, raw = %text, "ignoring malformed control message");
            return true;
        }
    };
    match msg {
        ControlMessage::Ping => send_event(socket, &Event::Pong).await,
        ControlMessage::Limp => {
            supervisor.request_limp();
            true
        }
        ControlMessage::SetPenHeight { height, rate } => {
            if supervisor.is_plotting() {
                warn!("setPenHeight rejected: a plot is in progress");
            } else {
                supervisor.request_set_pen_height(height, rate);
            }
            true
        }
    }
}
