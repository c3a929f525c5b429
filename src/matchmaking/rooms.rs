//! 1:1 방 관리

use crate::error::MatchError;
use crate::protocol::{PeerId, RoomId};
use std::collections::HashMap;
use std::time::Instant;

/// 매칭된 두 피어
#[derive(Debug, Clone)]
pub struct Room {
    pub members: [PeerId; 2],
    pub created_at: Instant,
}

impl Room {
    /// `from`이 아닌 쪽
    pub fn counterpart(&self, from: &PeerId) -> Option<PeerId> {
        match self.members {
            [a, b] if a == *from => Some(b),
            [a, b] if b == *from => Some(a),
            _ => None,
        }
    }
}

/// 활성 방 목록. 피어의 상대가 누구인지에 대한 유일한 기준
#[derive(Debug)]
pub struct RoomManager {
    rooms: HashMap<RoomId, Room>,
    by_peer: HashMap<PeerId, RoomId>,
    next_id: u64,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self {
            rooms: HashMap::new(),
            by_peer: HashMap::new(),
            next_id: 1,
        }
    }
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 방 생성. 이미 방에 있는 피어는 거부
    pub fn create_room(&mut self, a: PeerId, b: PeerId) -> Result<RoomId, MatchError> {
        if a == b {
            return Err(MatchError::InvariantViolation {
                peer_id: a,
                detail: "paired with itself".to_string(),
            });
        }
        for id in [a, b] {
            if let Some(existing) = self.by_peer.get(&id) {
                return Err(MatchError::InvariantViolation {
                    peer_id: id,
                    detail: format!("already in room {existing}"),
                });
            }
        }

        let id = RoomId(self.next_id);
        self.next_id += 1;

        self.rooms.insert(
            id,
            Room {
                members: [a, b],
                created_at: Instant::now(),
            },
        );
        self.by_peer.insert(a, id);
        self.by_peer.insert(b, id);

        Ok(id)
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<RoomId> {
        self.by_peer.get(peer_id).copied()
    }

    /// 방 안에서 `from`의 상대
    pub fn counterpart(&self, room_id: RoomId, from: &PeerId) -> Result<PeerId, MatchError> {
        let room = self
            .rooms
            .get(&room_id)
            .ok_or(MatchError::UnknownRoom(room_id))?;
        room.counterpart(from).ok_or(MatchError::NotInRoom {
            peer_id: *from,
            room_id,
        })
    }

    /// 피어가 속한 방을 닫고 (방 id, 남은 상대)를 돌려준다
    pub fn close_room_by_peer(&mut self, peer_id: &PeerId) -> Option<(RoomId, PeerId)> {
        let room_id = self.by_peer.remove(peer_id)?;
        let room = self.rooms.remove(&room_id)?;
        let other = room.counterpart(peer_id)?;
        self.by_peer.remove(&other);

        tracing::info!(
            room_id = %room_id,
            closed_by = %peer_id,
            age_ms = room.created_at.elapsed().as_millis() as u64,
            "Room closed"
        );

        Some((room_id, other))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_ids_are_monotonic() {
        let mut rooms = RoomManager::new();
        let (a, b, c, d) = (PeerId::new(), PeerId::new(), PeerId::new(), PeerId::new());

        let first = rooms.create_room(a, b).unwrap();
        rooms.close_room_by_peer(&a);
        let second = rooms.create_room(c, d).unwrap();

        assert_eq!(first, RoomId(1));
        assert!(second > first);
    }

    #[test]
    fn test_counterpart_lookup() {
        let mut rooms = RoomManager::new();
        let (a, b, outsider) = (PeerId::new(), PeerId::new(), PeerId::new());
        let room_id = rooms.create_room(a, b).unwrap();

        assert_eq!(rooms.counterpart(room_id, &a), Ok(b));
        assert_eq!(rooms.counterpart(room_id, &b), Ok(a));
        assert_eq!(
            rooms.counterpart(room_id, &outsider),
            Err(MatchError::NotInRoom {
                peer_id: outsider,
                room_id
            })
        );
        assert_eq!(
            rooms.counterpart(RoomId(99), &a),
            Err(MatchError::UnknownRoom(RoomId(99)))
        );
    }

    #[test]
    fn test_close_room_frees_both_members() {
        let mut rooms = RoomManager::new();
        let (a, b) = (PeerId::new(), PeerId::new());
        let room_id = rooms.create_room(a, b).unwrap();

        assert_eq!(rooms.close_room_by_peer(&b), Some((room_id, a)));
        assert_eq!(rooms.room_of(&a), None);
        assert_eq!(rooms.room_of(&b), None);
        assert_eq!(rooms.len(), 0);

        // 이미 닫힌 방
        assert_eq!(rooms.close_room_by_peer(&a), None);
    }

    #[test]
    fn test_peer_cannot_join_two_rooms() {
        let mut rooms = RoomManager::new();
        let (a, b, c) = (PeerId::new(), PeerId::new(), PeerId::new());
        rooms.create_room(a, b).unwrap();

        let err = rooms.create_room(c, a).unwrap_err();
        assert!(matches!(err, MatchError::InvariantViolation { peer_id, .. } if peer_id == a));
        assert!(rooms.create_room(c, c).is_err());
        assert_eq!(rooms.len(), 1);
    }
}
