//! 랜덤 영상 채팅 매칭 및 시그널링 서버

mod config;
mod error;
mod handlers;
mod matchmaking;
mod protocol;
mod state;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderValue,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use config::Config;
use futures::{SinkExt, StreamExt};
use matchmaking::Delivery;
use protocol::{ClientMessage, PeerId, Signal};
use serde::Deserialize;
use state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new(config.clone()));

    // 상태 점검 스케줄러
    if config.maintenance_interval_secs > 0 {
        let maintenance_state = state.clone();
        let period = tokio::time::Duration::from_secs(config.maintenance_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                handlers::run_maintenance(&maintenance_state).await;
            }
        });
    }

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("🚀 Roulette Signaling Server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/presence", get(presence_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// CORS 설정
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allows_any_origin() {
        cors.allow_origin(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse::<HeaderValue>().ok())
            .collect::<Vec<_>>();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>Roulette Signaling Server</h1><p>WebSocket endpoint: /ws?name=...</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.stats().await;

    Json(serde_json::json!({
        "status": "ok",
        "server": "roulette-signaling-rs",
        "timestamp": std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
        "peers": stats.peers,
        "waiting": stats.waiting,
        "rooms": stats.rooms,
    }))
}

async fn presence_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "count": state.presence_count().await }))
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    name: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.name))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, name: Option<String>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();

    // 연결 처리
    let peer_id = handlers::handle_connection(&state, tx.clone(), name.as_deref()).await;

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(delivery) = rx.recv().await {
            match delivery {
                Delivery::Message(msg) => match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode message"),
                },
                Delivery::Close => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // 수신 처리
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(&state, peer_id, &tx, msg).await,
                Err(e) => {
                    tracing::warn!(peer_id = %peer_id, error = %e, "Malformed message dropped");
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(&state, peer_id).await;
    send_task.abort();
}

async fn handle_client_message(
    state: &AppState,
    peer_id: PeerId,
    sender: &mpsc::UnboundedSender<Delivery>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Heartbeat => {
            handlers::handle_heartbeat(sender);
        }
        ClientMessage::Offer { room_id, sdp } => {
            handlers::handle_signal(state, peer_id, room_id, Signal::Offer { sdp }).await;
        }
        ClientMessage::Answer { room_id, sdp } => {
            handlers::handle_signal(state, peer_id, room_id, Signal::Answer { sdp }).await;
        }
        ClientMessage::IceCandidate {
            room_id,
            candidate,
            role,
        } => {
            handlers::handle_signal(
                state,
                peer_id,
                room_id,
                Signal::IceCandidate { candidate, role },
            )
            .await;
        }
        ClientMessage::EndSession { reason } => {
            handlers::handle_end_session(state, peer_id, reason).await;
        }
    }
}
