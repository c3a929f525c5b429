//! 연결 레지스트리

use crate::protocol::{PeerId, RoomId};
use std::collections::HashMap;
use std::time::Instant;

/// 피어의 현재 상태 (Gone은 레지스트리에서 제거된 상태)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Waiting,
    Matched { room_id: RoomId },
}

/// 연결된 피어
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    pub display_name: String,
    pub state: PeerState,
    /// 직전에 skip으로 헤어진 상대
    pub last_partner: Option<PeerId>,
    pub connected_at: Instant,
}

impl Peer {
    pub fn new(id: PeerId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            state: PeerState::Waiting,
            last_partner: None,
            connected_at: Instant::now(),
        }
    }
}

/// connection id → Peer
#[derive(Debug, Default)]
pub struct Registry {
    peers: HashMap<PeerId, Peer>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이미 등록된 id면 false
    pub fn insert(&mut self, peer: Peer) -> bool {
        if self.peers.contains_key(&peer.id) {
            return false;
        }
        self.peers.insert(peer.id, peer);
        true
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<Peer> {
        self.peers.remove(id)
    }

    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn get_mut(&mut self, id: &PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.keys()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// 둘 중 한쪽이라도 상대를 직전 파트너로 기억하는지
    pub fn are_last_partners(&self, a: &PeerId, b: &PeerId) -> bool {
        let remembers = |x: &PeerId, y: &PeerId| {
            self.peers
                .get(x)
                .is_some_and(|p| p.last_partner.as_ref() == Some(y))
        };
        remembers(a, b) || remembers(b, a)
    }

    /// 떠난 피어를 직전 파트너로 기억하는 항목을 모두 지운다
    pub fn forget_partner(&mut self, gone: &PeerId) {
        for peer in self.peers.values_mut() {
            if peer.last_partner.as_ref() == Some(gone) {
                peer.last_partner = None;
            }
        }
    }
}
