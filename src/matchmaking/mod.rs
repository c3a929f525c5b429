//! 매칭 및 시그널링 중계 엔진

mod engine;
mod outbox;
mod presence;
mod queue;
mod registry;
mod rooms;

pub use engine::{MatchStats, Matchmaker};
pub use outbox::{Delivery, Envelope, Outbox};
#[cfg(test)]
pub use registry::PeerState;
