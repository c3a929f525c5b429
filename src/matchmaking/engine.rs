//! 매칭 엔진
//!
//! 레지스트리, 대기열, 방 목록을 단독으로 소유한다. 모든 연산은 동기적으로
//! 상태를 바꾸고, 보낼 메시지를 [`Outbox`]로 돌려준다 (I/O 없음).

use super::outbox::Outbox;
use super::presence;
use super::queue::{MatchQueue, Pairing};
use super::registry::{Peer, PeerState, Registry};
use super::rooms::RoomManager;
use crate::config::MatchingConfig;
use crate::error::MatchError;
use crate::protocol::{EndReason, PeerId, RoomId, ServerMessage, Signal};
use serde::Serialize;

/// 현재 매칭 현황
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub peers: usize,
    pub waiting: usize,
    pub rooms: usize,
}

pub struct Matchmaker {
    registry: Registry,
    queue: MatchQueue,
    rooms: RoomManager,
    config: MatchingConfig,
}

impl Matchmaker {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            registry: Registry::new(),
            queue: MatchQueue::new(),
            rooms: RoomManager::new(),
            config,
        }
    }

    /// 새 연결 등록 → 대기열 추가, lobby 알림, 접속자 수 갱신
    pub fn register(&mut self, peer_id: PeerId, display_name: impl Into<String>) -> Outbox {
        let mut out = Outbox::new();

        if !self
            .registry
            .insert(Peer::new(peer_id, display_name.into()))
        {
            tracing::debug!(peer_id = %peer_id, "Duplicate registration ignored");
            return out;
        }

        self.enter_waiting(peer_id, &mut out);
        presence::broadcast(&self.registry, &mut out);
        tracing::info!(peer_id = %peer_id, peers = self.registry.len(), "Peer registered");

        self.drain_pairs(&mut out);
        out
    }

    /// 연결 해제. 방에 있었다면 방을 닫고 상대를 대기열로 돌려보낸다
    pub fn unregister(&mut self, peer_id: PeerId) -> Outbox {
        let mut out = Outbox::new();

        let Some(peer) = self.remove_peer(peer_id, &mut out) else {
            tracing::debug!(peer_id = %peer_id, "Unregister of unknown peer ignored");
            return out;
        };

        tracing::info!(
            peer_id = %peer_id,
            session_secs = peer.connected_at.elapsed().as_secs(),
            "Peer unregistered"
        );

        self.drain_pairs(&mut out);
        out
    }

    /// skip / quit 처리
    pub fn end_session(&mut self, peer_id: PeerId, reason: EndReason) -> Outbox {
        let mut out = Outbox::new();

        if let Err(err) = self.verify(peer_id) {
            self.handle_error(err, &mut out);
            self.drain_pairs(&mut out);
            return out;
        }

        match self.rooms.close_room_by_peer(&peer_id) {
            // 대기 중이던 피어
            None => match reason {
                EndReason::Skip => self.enter_waiting(peer_id, &mut out),
                EndReason::Quit => self.depart(peer_id, &mut out),
            },
            Some((room_id, other)) => {
                let remember = reason == EndReason::Skip && self.config.avoid_repeat_match;

                out.send(other, ServerMessage::SessionEnded);
                self.return_to_queue(other, remember.then_some(peer_id), &mut out);

                match reason {
                    EndReason::Quit => self.depart(peer_id, &mut out),
                    EndReason::Skip => {
                        self.return_to_queue(peer_id, remember.then_some(other), &mut out)
                    }
                }

                tracing::info!(
                    peer_id = %peer_id,
                    counterpart = %other,
                    room_id = %room_id,
                    reason = %reason,
                    "Session ended"
                );
            }
        }

        self.drain_pairs(&mut out);
        out
    }

    /// 핸드셰이크 메시지를 같은 방의 상대에게 그대로 전달
    pub fn relay(&mut self, room_id: RoomId, from: PeerId, signal: Signal) -> Outbox {
        let mut out = Outbox::new();

        if let Err(err) = self.try_relay(room_id, from, signal, &mut out) {
            self.handle_error(err, &mut out);
            self.drain_pairs(&mut out);
        }

        out
    }

    /// 전체 피어 상태 점검. 불일치 피어는 강제 퇴장
    pub fn audit(&mut self) -> Outbox {
        let mut out = Outbox::new();

        let dangling: Vec<PeerId> = self
            .queue
            .iter()
            .filter(|id| !self.registry.contains(id))
            .copied()
            .collect();
        for id in dangling {
            tracing::error!(peer_id = %id, "Unregistered peer found in queue");
            self.queue.remove(&id);
        }

        let ids: Vec<PeerId> = self.registry.ids().copied().collect();
        for id in ids {
            if let Err(err) = self.verify(id) {
                self.handle_error(err, &mut out);
            }
        }

        self.drain_pairs(&mut out);
        out
    }

    pub fn presence_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> MatchStats {
        MatchStats {
            peers: self.registry.len(),
            waiting: self.queue.len(),
            rooms: self.rooms.len(),
        }
    }

    #[cfg(test)]
    pub fn peer_state(&self, peer_id: PeerId) -> Option<PeerState> {
        self.registry.get(&peer_id).map(|p| p.state)
    }

    fn try_relay(
        &mut self,
        room_id: RoomId,
        from: PeerId,
        signal: Signal,
        out: &mut Outbox,
    ) -> Result<(), MatchError> {
        self.verify(from)?;
        let to = self.rooms.counterpart(room_id, &from)?;
        if !self.registry.contains(&to) {
            return Err(MatchError::InvariantViolation {
                peer_id: to,
                detail: format!("in room {room_id} but not registered"),
            });
        }

        let kind = signal.kind();
        out.send(to, signal.into_message(room_id));

        tracing::debug!(
            from = %from,
            to = %to,
            room_id = %room_id,
            kind = kind,
            "Relayed signal"
        );
        Ok(())
    }

    /// 대기열에서 짝을 지을 수 있는 만큼 방을 만든다
    fn drain_pairs(&mut self, out: &mut Outbox) {
        let avoid_repeat = self.config.avoid_repeat_match;

        while let Some(pairing) = self
            .queue
            .pop_pair_where(|x, y| !avoid_repeat || !self.registry.are_last_partners(x, y))
        {
            self.create_room(pairing, out);
        }
    }

    fn create_room(&mut self, pairing: Pairing, out: &mut Outbox) {
        let (a, b) = (pairing.first, pairing.second);
        let names = (
            self.registry.get(&a).map(|p| p.display_name.clone()),
            self.registry.get(&b).map(|p| p.display_name.clone()),
        );
        let (name_a, name_b) = match names {
            (Some(name_a), Some(name_b)) => (name_a, name_b),
            (name_a, name_b) => {
                // 등록되지 않은 쪽은 버리고 나머지는 원래 자리로
                for (id, name) in [(a, &name_a), (b, &name_b)] {
                    if name.is_none() {
                        tracing::error!(peer_id = %id, "Unregistered peer dequeued for pairing");
                    }
                }
                self.queue.restore(pairing, name_a.is_some(), name_b.is_some());
                return;
            }
        };

        let room_id = match self.rooms.create_room(a, b) {
            Ok(room_id) => room_id,
            Err(err) => {
                let keep = |id: PeerId| {
                    !matches!(&err, MatchError::InvariantViolation { peer_id, .. } if *peer_id == id)
                };
                self.queue.restore(pairing, keep(a), keep(b));
                self.handle_error(err, out);
                return;
            }
        };

        for (id, partner_name) in [(a, name_b), (b, name_a)] {
            if let Some(peer) = self.registry.get_mut(&id) {
                peer.state = PeerState::Matched { room_id };
                peer.last_partner = None;
            }
            out.send(
                id,
                ServerMessage::Matched {
                    room_id,
                    partner_name,
                },
            );
        }

        tracing::info!(room_id = %room_id, peer_a = %a, peer_b = %b, "Room created");
    }

    /// Waiting 상태로 전환 후 대기열 추가 (이미 있으면 유지)
    fn enter_waiting(&mut self, peer_id: PeerId, out: &mut Outbox) {
        let Some(peer) = self.registry.get_mut(&peer_id) else {
            return;
        };
        peer.state = PeerState::Waiting;
        self.queue.enqueue(peer_id);
        out.send(peer_id, ServerMessage::Lobby);
    }

    fn return_to_queue(&mut self, peer_id: PeerId, last_partner: Option<PeerId>, out: &mut Outbox) {
        match self.registry.get_mut(&peer_id) {
            Some(peer) => peer.last_partner = last_partner,
            None => {
                tracing::error!(peer_id = %peer_id, "Room member missing from registry");
                return;
            }
        }
        self.enter_waiting(peer_id, out);
    }

    /// 서비스를 떠나는 피어 (quit)
    fn depart(&mut self, peer_id: PeerId, out: &mut Outbox) {
        if self.remove_peer(peer_id, out).is_some() {
            tracing::info!(peer_id = %peer_id, "Peer quit");
        }
        out.close(peer_id);
    }

    /// 대기열, 방, 레지스트리에서 제거. 상대가 있었다면 세션 종료 알림
    fn remove_peer(&mut self, peer_id: PeerId, out: &mut Outbox) -> Option<Peer> {
        let peer = self.registry.remove(&peer_id)?;
        self.queue.remove(&peer_id);
        // 같은 id가 다시 등록되면 새 피어이므로 남은 기억도 지운다
        self.registry.forget_partner(&peer_id);

        if let Some((room_id, other)) = self.rooms.close_room_by_peer(&peer_id) {
            tracing::info!(peer_id = %peer_id, counterpart = %other, room_id = %room_id, "Counterpart left");
            out.send(other, ServerMessage::SessionEnded);
            self.return_to_queue(other, None, out);
        }

        presence::broadcast(&self.registry, out);
        Some(peer)
    }

    /// 피어가 정확히 한 곳(대기열 또는 방 하나)에만 있는지 확인
    fn verify(&self, peer_id: PeerId) -> Result<(), MatchError> {
        let peer = self
            .registry
            .get(&peer_id)
            .ok_or(MatchError::UnknownPeer(peer_id))?;
        let queued = self.queue.contains(&peer_id);
        let room = self.rooms.room_of(&peer_id);

        let consistent = match peer.state {
            PeerState::Waiting => queued && room.is_none(),
            PeerState::Matched { room_id } => !queued && room == Some(room_id),
        };

        if consistent {
            Ok(())
        } else {
            Err(MatchError::InvariantViolation {
                peer_id,
                detail: format!("state={:?} queued={} room={:?}", peer.state, queued, room),
            })
        }
    }

    fn handle_error(&mut self, err: MatchError, out: &mut Outbox) {
        if err.is_stale() {
            tracing::debug!(error = %err, "Dropped stale reference");
            return;
        }

        tracing::error!(error = %err, "Evicting peer");
        if let MatchError::InvariantViolation { peer_id, .. } = err {
            self.evict(peer_id, out);
        }
    }

    /// 강제 Gone 처리
    fn evict(&mut self, peer_id: PeerId, out: &mut Outbox) {
        if self.remove_peer(peer_id, out).is_none() {
            self.queue.remove(&peer_id);
            if let Some((_, other)) = self.rooms.close_room_by_peer(&peer_id) {
                out.send(other, ServerMessage::SessionEnded);
                self.return_to_queue(other, None, out);
            }
        }
        out.close(peer_id);
    }
}
