//! 엔진이 만들어 내는 전송 목록

use crate::protocol::{PeerId, ServerMessage};

/// 연결 하나에 전달할 항목
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Message(ServerMessage),
    /// 연결을 닫는다 (Gone 상태가 된 피어)
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: PeerId,
    pub delivery: Delivery,
}

/// 한 번의 이벤트 처리로 발생한 전송들 (순서 유지)
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, to: PeerId, message: ServerMessage) {
        self.envelopes.push(Envelope {
            to,
            delivery: Delivery::Message(message),
        });
    }

    pub fn close(&mut self, to: PeerId) {
        self.envelopes.push(Envelope {
            to,
            delivery: Delivery::Close,
        });
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn into_envelopes(self) -> Vec<Envelope> {
        self.envelopes
    }

    /// 특정 피어에게 보낸 메시지만 순서대로
    #[cfg(test)]
    pub fn messages_for(&self, peer_id: PeerId) -> Vec<ServerMessage> {
        self.envelopes
            .iter()
            .filter(|e| e.to == peer_id)
            .filter_map(|e| match &e.delivery {
                Delivery::Message(m) => Some(m.clone()),
                Delivery::Close => None,
            })
            .collect()
    }

    #[cfg(test)]
    pub fn closes(&self, peer_id: PeerId) -> bool {
        self.envelopes
            .iter()
            .any(|e| e.to == peer_id && e.delivery == Delivery::Close)
    }
}
