//! 매칭 엔진 에러 정의

use crate::protocol::{PeerId, RoomId};
use thiserror::Error;

/// 매칭 엔진 내부 에러
///
/// 클라이언트에게 전달되지 않는다. 경계에서 로그 후 버리거나
/// (stale reference) 해당 피어를 강제 퇴장시킨다 (invariant violation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// 등록되지 않은 피어
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    /// 이미 닫힌 방
    #[error("unknown room {0}")]
    UnknownRoom(RoomId),

    /// 방의 구성원이 아닌 피어
    #[error("peer {peer_id} is not a member of room {room_id}")]
    NotInRoom { peer_id: PeerId, room_id: RoomId },

    /// 대기열/방 상태 불일치 (엔진 로직 결함)
    #[error("invariant violation for peer {peer_id}: {detail}")]
    InvariantViolation { peer_id: PeerId, detail: String },
}

impl MatchError {
    /// 동시 연결 해제와의 경쟁으로 생긴 에러인지 여부
    pub fn is_stale(&self) -> bool {
        !matches!(self, MatchError::InvariantViolation { .. })
    }
}
