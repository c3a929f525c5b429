//! 매칭 대기열 (도착 순서 FIFO)

use crate::protocol::PeerId;
use std::collections::VecDeque;

/// 대기열에서 꺼낸 한 쌍. 되돌릴 때를 위해 원래 위치를 기억한다
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub first: PeerId,
    pub second: PeerId,
    slots: (usize, usize),
}

#[derive(Debug, Default)]
pub struct MatchQueue {
    order: VecDeque<PeerId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 뒤에 추가. 이미 있으면 false
    pub fn enqueue(&mut self, id: PeerId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    pub fn remove(&mut self, id: &PeerId) -> bool {
        match self.order.iter().position(|queued| queued == id) {
            Some(pos) => {
                self.order.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.order.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.order.iter()
    }

    /// 가장 오래 기다린 피어와, 그와 짝지을 수 있는 가장 오래된 피어를 꺼낸다.
    ///
    /// `compatible`이 항상 true면 앞의 두 항목을 꺼내는 순수 FIFO.
    pub fn pop_pair_where<F>(&mut self, compatible: F) -> Option<Pairing>
    where
        F: Fn(&PeerId, &PeerId) -> bool,
    {
        let len = self.order.len();
        for i in 0..len {
            for j in (i + 1)..len {
                if compatible(&self.order[i], &self.order[j]) {
                    // j > i 이므로 j를 먼저 제거
                    let second = self.order.remove(j)?;
                    let first = self.order.remove(i)?;
                    return Some(Pairing {
                        first,
                        second,
                        slots: (i, j),
                    });
                }
            }
        }
        None
    }

    /// 방을 만들지 못한 쌍을 꺼내기 전 위치로 되돌린다.
    ///
    /// 꺼낸 뒤 대기열이 바뀌지 않았다면 다른 대기자의 순서는 그대로다.
    pub fn restore(&mut self, pairing: Pairing, keep_first: bool, keep_second: bool) {
        let (i, j) = pairing.slots;

        let first_back = keep_first && !self.contains(&pairing.first);
        if first_back {
            self.order.insert(i.min(self.order.len()), pairing.first);
        }

        if keep_second && !self.contains(&pairing.second) {
            // first가 빠진 채라면 second의 자리도 한 칸 앞
            let pos = if first_back { j } else { j - 1 };
            self.order.insert(pos.min(self.order.len()), pairing.second);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<PeerId> {
        (0..n).map(|_| PeerId::new()).collect()
    }

    fn queue_of(p: &[PeerId]) -> MatchQueue {
        let mut queue = MatchQueue::new();
        for id in p {
            queue.enqueue(*id);
        }
        queue
    }

    fn order(queue: &MatchQueue) -> Vec<PeerId> {
        queue.iter().copied().collect()
    }

    fn pop_pair<F>(queue: &mut MatchQueue, compatible: F) -> Option<(PeerId, PeerId)>
    where
        F: Fn(&PeerId, &PeerId) -> bool,
    {
        queue
            .pop_pair_where(compatible)
            .map(|pairing| (pairing.first, pairing.second))
    }

    #[test]
    fn test_enqueue_rejects_duplicates() {
        let mut queue = MatchQueue::new();
        let id = PeerId::new();

        assert!(queue.enqueue(id));
        assert!(!queue.enqueue(id));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_fifo_pairs() {
        let p = ids(5);
        let mut queue = queue_of(&p);

        assert_eq!(pop_pair(&mut queue, |_, _| true), Some((p[0], p[1])));
        assert_eq!(pop_pair(&mut queue, |_, _| true), Some((p[2], p[3])));
        // 남은 한 명은 다음 도착을 기다린다
        assert_eq!(pop_pair(&mut queue, |_, _| true), None);
        assert_eq!(order(&queue), vec![p[4]]);
    }

    #[test]
    fn test_incompatible_head_pairs_with_next_oldest() {
        let p = ids(3);
        let mut queue = queue_of(&p);

        let (a, b) = (p[0], p[1]);
        let pair = pop_pair(&mut queue, |x, y| {
            !((*x == a && *y == b) || (*x == b && *y == a))
        });

        assert_eq!(pair, Some((p[0], p[2])));
        assert_eq!(order(&queue), vec![p[1]]);
    }

    #[test]
    fn test_no_compatible_pair() {
        let p = ids(2);
        let mut queue = queue_of(&p);

        assert_eq!(pop_pair(&mut queue, |_, _| false), None);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove() {
        let p = ids(3);
        let mut queue = queue_of(&p);

        assert!(queue.remove(&p[1]));
        assert!(!queue.remove(&p[1]));
        assert_eq!(order(&queue), vec![p[0], p[2]]);
    }

    #[test]
    fn test_restore_keeps_original_order() {
        let p = ids(5);
        // p[1]은 p[2], p[3]과 짝지을 수 없다 → (p[1], p[4])가 꺼내진다
        let blocked = |x: &PeerId, y: &PeerId| {
            *x == p[0] || *y == p[0] || (*x == p[1] && (*y == p[2] || *y == p[3]))
        };
        let compatible = |x: &PeerId, y: &PeerId| !blocked(x, y);

        // 둘 다 되돌림
        let mut queue = queue_of(&p);
        let pairing = queue.pop_pair_where(compatible).unwrap();
        assert_eq!((pairing.first, pairing.second), (p[1], p[4]));
        queue.restore(pairing, true, true);
        assert_eq!(order(&queue), p);

        // first만 되돌림
        let mut queue = queue_of(&p);
        let pairing = queue.pop_pair_where(compatible).unwrap();
        queue.restore(pairing, true, false);
        assert_eq!(order(&queue), vec![p[0], p[1], p[2], p[3]]);

        // second만 되돌림
        let mut queue = queue_of(&p);
        let pairing = queue.pop_pair_where(compatible).unwrap();
        queue.restore(pairing, false, true);
        assert_eq!(order(&queue), vec![p[0], p[2], p[3], p[4]]);
    }

    #[test]
    fn test_restore_skips_already_queued() {
        let p = ids(3);
        let mut queue = queue_of(&p);

        let pairing = queue.pop_pair_where(|_, _| true).unwrap();
        queue.enqueue(p[0]);
        queue.restore(pairing, true, true);

        // p[0]은 중복 추가하지 않고 p[1]만 원래 자리로
        assert_eq!(order(&queue), vec![p[1], p[2], p[0]]);
    }
}
