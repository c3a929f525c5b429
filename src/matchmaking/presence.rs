//! 접속자 수 브로드캐스트

use super::outbox::Outbox;
use super::registry::Registry;
use crate::protocol::ServerMessage;

/// 등록된 모든 피어에게 현재 접속자 수 전송
pub fn broadcast(registry: &Registry, out: &mut Outbox) {
    let count = registry.len();
    for id in registry.ids() {
        out.send(*id, ServerMessage::Presence { count });
    }
    tracing::debug!(count = count, "Presence broadcast");
}
