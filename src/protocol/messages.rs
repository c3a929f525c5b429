//! 클라이언트-서버 메시지 프로토콜 정의

use super::types::{EndReason, IceRole, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    // Connection
    Heartbeat,

    // WebRTC Signaling
    Offer {
        room_id: RoomId,
        sdp: Value,
    },
    Answer {
        room_id: RoomId,
        sdp: Value,
    },
    IceCandidate {
        room_id: RoomId,
        candidate: Value,
        role: IceRole,
    },

    // Session
    EndSession {
        reason: EndReason,
    },
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    // Connection
    HeartbeatAck,
    Presence {
        count: usize,
    },

    // Matchmaking
    Lobby,
    Matched {
        room_id: RoomId,
        partner_name: String,
    },
    SessionEnded,

    // WebRTC Signaling
    Offer {
        room_id: RoomId,
        sdp: Value,
    },
    Answer {
        room_id: RoomId,
        sdp: Value,
    },
    IceCandidate {
        candidate: Value,
        role: IceRole,
    },
}

/// 상대에게 그대로 중계되는 핸드셰이크 페이로드
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Offer { sdp: Value },
    Answer { sdp: Value },
    IceCandidate { candidate: Value, role: IceRole },
}

impl Signal {
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Offer { .. } => "offer",
            Signal::Answer { .. } => "answer",
            Signal::IceCandidate { .. } => "ice-candidate",
        }
    }

    /// 상대 피어에게 보낼 메시지로 변환
    pub fn into_message(self, room_id: RoomId) -> ServerMessage {
        match self {
            Signal::Offer { sdp } => ServerMessage::Offer { room_id, sdp },
            Signal::Answer { sdp } => ServerMessage::Answer { room_id, sdp },
            Signal::IceCandidate { candidate, role } => {
                ServerMessage::IceCandidate { candidate, role }
            }
        }
    }
}
