//! WebRTC 시그널링 핸들러

use crate::protocol::{PeerId, RoomId, Signal};
use crate::state::AppState;

/// Offer / Answer / ICE Candidate 중계
pub async fn handle_signal(state: &AppState, from_peer_id: PeerId, room_id: RoomId, signal: Signal) {
    state
        .apply(|matchmaker| matchmaker.relay(room_id, from_peer_id, signal))
        .await;
}
