/// ----- CALL REGISTRY -----
/// Hall calls that no car has claimed yet. One registry is shared by every
/// car controller; a call leaves it exactly once, when some car commits to
/// serving it.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Unbounded};
use std::rc::Rc;

use log::trace;
use shared_resources::direction::Direction;

/// Handle through which the dispatcher and every controller reach the one
/// registry. Handlers run one at a time, so borrows never overlap.
pub type SharedRegistry = Rc<RefCell<CallRegistry>>;

#[derive(Debug, Clone)]
pub struct CallRegistry {
    pending_up: BTreeSet<u8>,
    pending_down: BTreeSet<u8>,
    top_floor: u8,
}

impl CallRegistry {
    pub fn new(top_floor: u8) -> Self {
        CallRegistry {
            pending_up: BTreeSet::new(),
            pending_down: BTreeSet::new(),
            top_floor,
        }
    }

    pub fn shared(top_floor: u8) -> SharedRegistry {
        Rc::new(RefCell::new(Self::new(top_floor)))
    }

    pub fn top_floor(&self) -> u8 {
        self.top_floor
    }

    fn calls(&self, direction: Direction) -> &BTreeSet<u8> {
        match direction {
            Direction::Up => &self.pending_up,
            Direction::Down => &self.pending_down,
        }
    }

    fn calls_mut(&mut self, direction: Direction) -> &mut BTreeSet<u8> {
        match direction {
            Direction::Up => &mut self.pending_up,
            Direction::Down => &mut self.pending_down,
        }
    }

    pub fn register(&mut self, direction: Direction, floor: u8) {
        debug_assert!(floor <= self.top_floor, "floor {} above top floor {}", floor, self.top_floor);
        if self.calls_mut(direction).insert(floor) {
            trace!("registered {} call at floor {}", direction, floor);
        }
    }

    pub fn register_up(&mut self, floor: u8) {
        self.register(Direction::Up, floor);
    }

    pub fn register_down(&mut self, floor: u8) {
        self.register(Direction::Down, floor);
    }

    pub fn contains(&self, direction: Direction, floor: u8) -> bool {
        self.calls(direction).contains(&floor)
    }

    pub fn contains_up(&self, floor: u8) -> bool {
        self.contains(Direction::Up, floor)
    }

    pub fn contains_down(&self, floor: u8) -> bool {
        self.contains(Direction::Down, floor)
    }

    pub fn higher_up(&self, floor: u8) -> bool {
        self.pending_up.range((Excluded(floor), Unbounded)).next().is_some()
    }

    pub fn lower_up(&self, floor: u8) -> bool {
        self.pending_up.range(..floor).next().is_some()
    }

    pub fn higher_down(&self, floor: u8) -> bool {
        self.pending_down.range((Excluded(floor), Unbounded)).next().is_some()
    }

    pub fn lower_down(&self, floor: u8) -> bool {
        self.pending_down.range(..floor).next().is_some()
    }

    /// Removes the call if present. Returns whether this caller got it.
    pub fn claim(&mut self, direction: Direction, floor: u8) -> bool {
        let claimed = self.calls_mut(direction).remove(&floor);
        if claimed {
            trace!("claimed {} call at floor {}", direction, floor);
        }
        claimed
    }

    pub fn claim_up(&mut self, floor: u8) -> bool {
        self.claim(Direction::Up, floor)
    }

    pub fn claim_down(&mut self, floor: u8) -> bool {
        self.claim(Direction::Down, floor)
    }

    // The dispatch operations expect the caller to have checked
    // `has_pending_up`/`has_pending_down` first.

    pub fn dispatch_highest_up(&mut self) -> Option<u8> {
        self.pending_up.pop_last()
    }

    pub fn dispatch_lowest_up(&mut self) -> Option<u8> {
        self.pending_up.pop_first()
    }

    pub fn dispatch_highest_down(&mut self) -> Option<u8> {
        self.pending_down.pop_last()
    }

    pub fn dispatch_lowest_down(&mut self) -> Option<u8> {
        self.pending_down.pop_first()
    }

    /// Nearest up call at or above `floor`.
    pub fn dispatch_up_from(&mut self, floor: u8) -> Option<u8> {
        let found = self.pending_up.range(floor..).next().copied()?;
        self.pending_up.remove(&found);
        Some(found)
    }

    /// Nearest down call at or below `floor`.
    pub fn dispatch_down_from(&mut self, floor: u8) -> Option<u8> {
        let found = self.pending_down.range(..=floor).next_back().copied()?;
        self.pending_down.remove(&found);
        Some(found)
    }

    pub fn has_pending(&self, direction: Direction) -> bool {
        !self.calls(direction).is_empty()
    }

    pub fn has_pending_up(&self) -> bool {
        self.has_pending(Direction::Up)
    }

    pub fn has_pending_down(&self) -> bool {
        self.has_pending(Direction::Down)
    }

    pub fn has_pending_work(&self) -> bool {
        self.has_pending_up() || self.has_pending_down()
    }

    pub fn pending(&self, direction: Direction) -> impl Iterator<Item = u8> + '_ {
        self.calls(direction).iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_calls_up_to_its_top_floor() {
        let mut registry = CallRegistry::new(5);
        registry.register_down(5);
        registry.register_up(0);
        assert_eq!(registry.top_floor(), 5);
        assert!(registry.contains_down(5));
        assert!(registry.contains_up(0));
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = CallRegistry::new(5);
        registry.register_up(2);
        registry.register_up(2);
        assert_eq!(registry.pending(Direction::Up).collect::<Vec<_>>(), vec![2]);
        assert!(registry.contains_up(2));
        assert!(!registry.contains_down(2));
    }

    #[test]
    fn up_and_down_are_independent() {
        let mut registry = CallRegistry::new(5);
        registry.register_up(3);
        registry.register_down(3);
        assert!(registry.claim_up(3));
        assert!(registry.contains_down(3));
        assert!(!registry.contains_up(3));
    }

    #[test]
    fn claim_happens_once() {
        let mut registry = CallRegistry::new(5);
        registry.register_down(4);
        assert!(registry.claim_down(4));
        assert!(!registry.claim_down(4));
        assert!(!registry.has_pending_work());
    }

    #[test]
    fn claiming_absent_call_is_noop() {
        let mut registry = CallRegistry::new(5);
        registry.register_up(1);
        assert!(!registry.claim_up(2));
        assert!(registry.contains_up(1));
    }

    #[test]
    fn higher_and_lower_are_strict() {
        let mut registry = CallRegistry::new(5);
        registry.register_up(3);
        registry.register_down(1);

        assert!(registry.higher_up(2));
        assert!(!registry.higher_up(3));
        assert!(registry.lower_up(4));
        assert!(!registry.lower_up(3));

        assert!(registry.higher_down(0));
        assert!(!registry.higher_down(1));
        assert!(registry.lower_down(2));
        assert!(!registry.lower_down(1));
    }

    #[test]
    fn dispatch_extracts_extremes() {
        let mut registry = CallRegistry::new(5);
        for floor in [1, 4, 2] {
            registry.register_up(floor);
        }
        for floor in [5, 3] {
            registry.register_down(floor);
        }

        assert!(registry.has_pending_up());
        assert_eq!(registry.dispatch_lowest_up(), Some(1));
        assert_eq!(registry.dispatch_highest_up(), Some(4));
        assert_eq!(registry.pending(Direction::Up).collect::<Vec<_>>(), vec![2]);

        assert!(registry.has_pending_down());
        assert_eq!(registry.dispatch_highest_down(), Some(5));
        assert_eq!(registry.dispatch_lowest_down(), Some(3));
        assert!(!registry.has_pending_down());
        assert!(registry.has_pending_work());
    }

    #[test]
    fn dispatch_from_takes_nearest_ahead() {
        let mut registry = CallRegistry::new(5);
        for floor in [1, 3, 4] {
            registry.register_up(floor);
            registry.register_down(floor);
        }

        assert_eq!(registry.dispatch_up_from(3), Some(3));
        assert_eq!(registry.dispatch_up_from(3), Some(4));
        assert_eq!(registry.dispatch_up_from(3), None);
        assert!(registry.contains_up(1));

        assert_eq!(registry.dispatch_down_from(2), Some(1));
        assert_eq!(registry.dispatch_down_from(0), None);
        assert_eq!(registry.dispatch_down_from(5), Some(4));
    }
}
