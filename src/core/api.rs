//! HTTP + WebSocket API for a running scoring box
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /score - Current scoreboard and settings
//! - POST /settings - Apply new settings (422 if invalid)
//! - POST /reset - New game under the current settings
//! - WS /ws - Live events

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::core::controller::{ControlError, Controller};
use crate::core::monitor::EventReceiver;
use crate::types::{Event, Scoreboard, Settings, SettingsInput};

/// Live events buffered per WebSocket client
const BROADCAST_CAPACITY: usize = 256;

/// Controller facts readable while a restart holds the controller
#[derive(Debug, Clone, Copy)]
struct ControllerInfo {
    settings: Settings,
    sessions_started: u64,
}

impl ControllerInfo {
    fn of(controller: &Controller) -> Self {
        Self {
            settings: controller.settings(),
            sessions_started: controller.sessions_started(),
        }
    }
}

/// App state
pub struct AppState {
    controller: Mutex<Controller>,
    info: RwLock<ControllerInfo>,
    pub board: RwLock<Scoreboard>,
    pub updates: broadcast::Sender<Event>,
}

impl AppState {
    /// Wrap a controller and fold its events into the scoreboard.
    /// Must be called inside a tokio runtime.
    pub fn start(controller: Controller, events: EventReceiver) -> Arc<Self> {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        let state = Arc::new(Self {
            board: RwLock::new(Scoreboard::new(&controller.settings())),
            info: RwLock::new(ControllerInfo::of(&controller)),
            controller: Mutex::new(controller),
            updates,
        });
        tokio::spawn(pump_events(Arc::clone(&state), events));
        state
    }

    fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// None while another request is restarting the session
    fn try_controller(&self) -> Option<MutexGuard<'_, Controller>> {
        match self.controller.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Refresh the snapshot; call from blocking context only
    fn publish_info(&self, controller: &Controller) {
        *self.info.blocking_write() = ControllerInfo::of(controller);
    }

    /// Shut the controller down
    pub fn shutdown(&self) {
        self.controller().shutdown();
    }
}

/// Drain the session queue into the scoreboard and the broadcast
async fn pump_events(state: Arc<AppState>, mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        state.board.write().await.apply(&event);
        // No subscribers is fine
        let _ = state.updates.send(event);
    }
    debug!("event queue closed");
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub monitoring: bool,
    pub sessions_started: u64,
}

/// Score response
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub scoreboard: Scoreboard,
    pub settings: Settings,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/score", get(score))
        .route("/settings", post(apply_settings))
        .route("/reset", post(reset))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let info = *state.info.read().await;
    // A restart in progress has no running monitor
    let monitoring = state.try_controller().is_some_and(|c| c.is_running());
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        monitoring,
        sessions_started: info.sessions_started,
    })
}

/// Current scoreboard
async fn score(State(state): State<Arc<AppState>>) -> Json<ScoreResponse> {
    let settings = state.info.read().await.settings;
    let scoreboard = state.board.read().await.clone();
    Json(ScoreResponse {
        scoreboard,
        settings,
    })
}

/// Apply new settings; the controller joins a worker thread, so run it off
/// the async executor
async fn apply_settings(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SettingsInput>,
) -> Result<Json<Settings>, ApiError> {
    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        let mut controller = worker.controller();
        let result = controller.apply_settings(&input);
        worker.publish_info(&controller);
        result
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    match result {
        Ok(settings) => {
            info!("settings applied over API");
            Ok(Json(settings))
        }
        Err(ControlError::Settings(e)) => Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e)),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

/// New game, same settings
async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<Settings>, ApiError> {
    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || -> Result<Settings, ControlError> {
        let mut controller = worker.controller();
        let result = controller.reset();
        worker.publish_info(&controller);
        let settings = controller.settings();
        result.map(|_| settings)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    result
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
}

/// WebSocket handler for live events
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.updates.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward events until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<Event>) {
    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("websocket client lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("fencehp API running on {}", addr);
    println!("  GET  /health   - Health check");
    println!("  GET  /score    - Current scoreboard");
    println!("  POST /settings - Apply settings");
    println!("  POST /reset    - New game");
    println!("  WS   /ws       - Live events");
    axum::serve(listener, router).await?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
