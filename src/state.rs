//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::matchmaking::{Delivery, Envelope, MatchStats, Matchmaker, Outbox};
use crate::protocol::PeerId;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc::UnboundedSender, Mutex};

/// 전역 애플리케이션 상태
pub struct AppState {
    /// 매칭 엔진 (레지스트리, 대기열, 방). 모든 이벤트는 이 락 안에서 직렬화된다
    pub matchmaker: Mutex<Matchmaker>,
    /// 연결별 전송 채널 (peer_id -> PeerSession)
    pub sessions: DashMap<PeerId, PeerSession>,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            matchmaker: Mutex::new(Matchmaker::new(config.matching)),
            sessions: DashMap::new(),
            config: Arc::new(config),
        }
    }

    /// 엔진에 이벤트 하나를 적용하고 결과를 전송한다.
    ///
    /// 전송까지 락을 쥐고 있으므로 연결별 메시지 순서가 이벤트 순서와 같다.
    pub async fn apply<F>(&self, f: F)
    where
        F: FnOnce(&mut Matchmaker) -> Outbox,
    {
        let mut matchmaker = self.matchmaker.lock().await;
        let outbox = f(&mut *matchmaker);
        self.deliver(outbox);
    }

    pub async fn stats(&self) -> MatchStats {
        self.matchmaker.lock().await.stats()
    }

    pub async fn presence_count(&self) -> usize {
        self.matchmaker.lock().await.presence_count()
    }

    fn deliver(&self, outbox: Outbox) {
        for Envelope { to, delivery } in outbox.into_envelopes() {
            match self.sessions.get(&to) {
                Some(session) => {
                    if session.sender.send(delivery).is_err() {
                        tracing::debug!(peer_id = %to, "Delivery dropped, connection closing");
                    }
                }
                None => {
                    tracing::debug!(peer_id = %to, "Delivery dropped, no session");
                }
            }
        }
    }
}

/// 연결 세션 정보
pub struct PeerSession {
    pub sender: UnboundedSender<Delivery>,
    pub connected_at: Instant,
}

impl PeerSession {
    pub fn new(sender: UnboundedSender<Delivery>) -> Self {
        Self {
            sender,
            connected_at: Instant::now(),
        }
    }
}
