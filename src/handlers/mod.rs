//! 핸들러 모듈

pub mod connection;
pub mod room;
pub mod signaling;

pub use connection::*;
pub use room::*;
pub use signaling::*;

#[cfg(test)]
pub(crate) mod test_support {
    use super::handle_connection;
    use crate::matchmaking::Delivery;
    use crate::protocol::PeerId;
    use crate::state::AppState;
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

    /// 가짜 소켓(채널)으로 연결
    pub async fn connect(
        state: &AppState,
        name: &str,
    ) -> (PeerId, UnboundedSender<Delivery>, UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer_id = handle_connection(state, tx.clone(), Some(name)).await;
        (peer_id, tx, rx)
    }

    /// 지금까지 받은 전송 전부
    pub fn received(rx: &mut UnboundedReceiver<Delivery>) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            out.push(delivery);
        }
        out
    }
}
