//! 방 종료 및 정리 핸들러

use crate::protocol::{EndReason, PeerId};
use crate::state::AppState;

/// skip / quit 처리
pub async fn handle_end_session(state: &AppState, peer_id: PeerId, reason: EndReason) {
    state
        .apply(|matchmaker| matchmaker.end_session(peer_id, reason))
        .await;
}

/// 주기적 상태 점검 및 통계 로그
pub async fn run_maintenance(state: &AppState) {
    state.apply(|matchmaker| matchmaker.audit()).await;

    let stats = state.stats().await;
    tracing::info!(
        peers = stats.peers,
        waiting = stats.waiting,
        rooms = stats.rooms,
        "Matchmaking stats"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handlers::test_support::{connect, received};
    use crate::matchmaking::{Delivery, MatchStats, PeerState};
    use crate::protocol::ServerMessage;

    #[tokio::test]
    async fn test_skip_returns_both_to_lobby() {
        let state = AppState::new(Config::default());
        let (a, _tx_a, mut rx_a) = connect(&state, "Alice").await;
        let (b, _tx_b, mut rx_b) = connect(&state, "Bob").await;
        received(&mut rx_a);
        received(&mut rx_b);

        handle_end_session(&state, b, EndReason::Skip).await;

        assert_eq!(
            received(&mut rx_a),
            vec![
                Delivery::Message(ServerMessage::SessionEnded),
                Delivery::Message(ServerMessage::Lobby),
            ]
        );
        assert_eq!(
            received(&mut rx_b),
            vec![Delivery::Message(ServerMessage::Lobby)]
        );

        let matchmaker = state.matchmaker.lock().await;
        assert_eq!(matchmaker.peer_state(a), Some(PeerState::Waiting));
        assert_eq!(matchmaker.peer_state(b), Some(PeerState::Waiting));
    }

    #[tokio::test]
    async fn test_quit_closes_connection() {
        let state = AppState::new(Config::default());
        let (a, _tx_a, mut rx_a) = connect(&state, "Alice").await;
        let (_b, _tx_b, mut rx_b) = connect(&state, "Bob").await;
        received(&mut rx_a);
        received(&mut rx_b);

        handle_end_session(&state, a, EndReason::Quit).await;

        assert_eq!(received(&mut rx_a), vec![Delivery::Close]);
        assert_eq!(
            received(&mut rx_b).first(),
            Some(&Delivery::Message(ServerMessage::SessionEnded))
        );
        assert_eq!(
            state.stats().await,
            MatchStats {
                peers: 1,
                waiting: 1,
                rooms: 0
            }
        );
    }

    #[tokio::test]
    async fn test_maintenance_keeps_healthy_state() {
        let state = AppState::new(Config::default());
        let (_a, _tx_a, mut rx_a) = connect(&state, "Alice").await;
        let (_b, _tx_b, _rx_b) = connect(&state, "Bob").await;
        let (_c, _tx_c, _rx_c) = connect(&state, "Carol").await;
        received(&mut rx_a);

        run_maintenance(&state).await;

        assert!(received(&mut rx_a).is_empty());
        assert_eq!(
            state.stats().await,
            MatchStats {
                peers: 3,
                waiting: 1,
                rooms: 1
            }
        );
    }
}
