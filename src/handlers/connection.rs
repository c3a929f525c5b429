//! 연결 핸들러

use crate::config::PeerConfig;
use crate::matchmaking::Delivery;
use crate::protocol::{PeerId, ServerMessage};
use crate::state::{AppState, PeerSession};
use tokio::sync::mpsc::UnboundedSender;

/// 새 연결 처리
pub async fn handle_connection(
    state: &AppState,
    sender: UnboundedSender<Delivery>,
    raw_name: Option<&str>,
) -> PeerId {
    let peer_id = PeerId::new();
    let display_name = sanitize_display_name(raw_name, &state.config.peer);

    // 등록 알림(lobby)을 받을 수 있도록 세션 먼저
    state.sessions.insert(peer_id, PeerSession::new(sender));

    tracing::info!(peer_id = %peer_id, name = %display_name, "New connection established");

    state
        .apply(|matchmaker| matchmaker.register(peer_id, display_name))
        .await;

    peer_id
}

/// 연결 해제 처리 (quit과 동일하게 취급)
pub async fn handle_disconnect(state: &AppState, peer_id: PeerId) {
    state
        .apply(|matchmaker| matchmaker.unregister(peer_id))
        .await;

    if let Some((_, session)) = state.sessions.remove(&peer_id) {
        tracing::info!(
            peer_id = %peer_id,
            connected_secs = session.connected_at.elapsed().as_secs(),
            "Connection closed"
        );
    }
}

/// Heartbeat 처리
pub fn handle_heartbeat(sender: &UnboundedSender<Delivery>) {
    let _ = sender.send(Delivery::Message(ServerMessage::HeartbeatAck));
}

/// 사용자 입력 이름 정리: 제어 문자 제거, 공백 trim, 길이 제한
pub fn sanitize_display_name(raw: Option<&str>, config: &PeerConfig) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let truncated: String = cleaned
        .trim()
        .chars()
        .take(config.max_name_length)
        .collect();
    let name = truncated.trim_end();

    if name.is_empty() {
        config.default_name.clone()
    } else {
        name.to_string()
    }
}
