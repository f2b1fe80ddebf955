use crate::broadcast::BroadcastEvent;
use crate::counters::CountersSnapshot;
use crate::error::IngestError;
use crate::session::SessionConfig;
use crate::state::AppState;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub directory_entries: usize,
    pub counters: CountersSnapshot,
}

pub(crate) async fn start_session(
    State(state): State<AppState>,
    Json(config): Json<SessionConfig>,
) -> Result<Json<ControlResponse>, (StatusCode, String)> {
    match state.sessions.clone().start(config) {
        Ok(()) => Ok(Json(ControlResponse {
            status: "started".to_string(),
            message: "noise sample session started".to_string(),
        })),
        Err(err @ IngestError::InvalidConfig(_)) => {
            Err((StatusCode::BAD_REQUEST, err.to_string()))
        }
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

pub(crate) async fn stop_session(State(state): State<AppState>) -> Json<ControlResponse> {
    state.sessions.stop();
    Json(ControlResponse {
        status: "stopped".to_string(),
        message: "noise sample session stopped".to_string(),
    })
}

pub(crate) async fn session_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (running, counters) = state.sessions.status();
    Json(StatusResponse {
        running,
        directory_entries: state.directory.len(),
        counters,
    })
}

/// Outbound frames on the observer socket.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ObserverFrame<'a> {
    Result { data: &'a CountersSnapshot },
    Error { message: &'a str },
}

/// Inbound toggle: `{"result": true}` opts the observer into counter events.
/// Error events are delivered regardless.
#[derive(Debug, Deserialize)]
struct ObserverToggle {
    result: bool,
}

pub(crate) async fn live_observer(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state))
}

async fn observe(mut socket: WebSocket, state: AppState) {
    let (observer_id, mut events) = state.broadcaster.subscribe();
    tracing::debug!(observer = %observer_id, "observer connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let frame = match &event {
                    BroadcastEvent::Counters(snapshot) => ObserverFrame::Result { data: snapshot },
                    BroadcastEvent::Error(message) => ObserverFrame::Error { message },
                };
                let Ok(json) = serde_json::to_string(&frame) else { continue };
                if socket.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ObserverToggle>(text.as_str()) {
                        Ok(toggle) => {
                            state.broadcaster.set_wants_counters(observer_id, toggle.result);
                        }
                        Err(err) => {
                            tracing::debug!(observer = %observer_id, error = %err, "ignoring malformed observer frame");
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    }

    state.broadcaster.unsubscribe(observer_id);
    tracing::debug!(observer = %observer_id, "observer disconnected");
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/noise/start", post(start_session))
        .route("/noise/stop", post(stop_session))
        .route("/noise/status", get(session_status))
        .route("/noise/live", get(live_observer))
}
