use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound::{Excluded, Unbounded};

use shared_resources::direction::Direction;

use crate::call_registry::CallRegistry;

/// Where a car is and which way it leans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub floor: u8,
    pub direction: Direction,
    pub top_floor: u8,
}

impl Position {
    /// The bias after boundary reversal: a car on the bottom floor can only
    /// go up and a car on the top floor can only go down.
    pub fn bounded_direction(&self) -> Direction {
        if self.floor == 0 {
            Direction::Up
        } else if self.floor >= self.top_floor {
            Direction::Down
        } else {
            self.direction
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub direction: Direction,
    pub floor: Option<u8>,
}

/// Policy deciding where a car goes next. Controllers hold it behind an `Rc`
/// so every car in a dispatcher can share one instance.
pub trait StopSelection: fmt::Debug {
    /// Chooses among the car's committed stops. The returned direction is
    /// applied even when there is no stop to go to.
    fn next_stop(&self, position: Position, stops: &BTreeSet<u8>) -> Selection;

    /// Takes a hall call out of the registry for a car with nothing to do.
    /// Returns the call's direction and floor.
    fn claim_idle_call(&self, position: Position, registry: &mut CallRegistry) -> Option<(Direction, u8)>;
}

/// Keeps going the way the car is heading while there is work that way,
/// then reverses rather than idling.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContinuationBias;

fn nearest_above(stops: &BTreeSet<u8>, floor: u8) -> Option<u8> {
    stops.range((Excluded(floor), Unbounded)).next().copied()
}

fn nearest_below(stops: &BTreeSet<u8>, floor: u8) -> Option<u8> {
    stops.range(..floor).next_back().copied()
}

impl StopSelection for ContinuationBias {
    fn next_stop(&self, position: Position, stops: &BTreeSet<u8>) -> Selection {
        let direction = position.bounded_direction();
        let above = nearest_above(stops, position.floor);
        let below = nearest_below(stops, position.floor);

        let (direction, floor) = match (direction, above, below) {
            (Direction::Up, Some(floor), _) => (Direction::Up, Some(floor)),
            (Direction::Down, _, Some(floor)) => (Direction::Down, Some(floor)),
            (Direction::Up, None, Some(floor)) => (Direction::Down, Some(floor)),
            (Direction::Down, Some(floor), None) => (Direction::Up, Some(floor)),
            (direction, None, None) => (direction, None),
        };
        Selection { direction, floor }
    }

    fn claim_idle_call(&self, position: Position, registry: &mut CallRegistry) -> Option<(Direction, u8)> {
        let preferred = position.bounded_direction();
        for direction in [preferred, preferred.opposite()] {
            if !registry.has_pending(direction) {
                continue;
            }
            // Calls ahead in the preferred direction come first. Otherwise start
            // a sweep from the far end so the calls left behind can be picked
            // up while passing.
            let ahead = if direction == preferred {
                match direction {
                    Direction::Up => registry.dispatch_up_from(position.floor),
                    Direction::Down => registry.dispatch_down_from(position.floor),
                }
            } else {
                None
            };
            let floor = ahead.or_else(|| match direction {
                Direction::Up => registry.dispatch_lowest_up(),
                Direction::Down => registry.dispatch_highest_down(),
            });
            if let Some(floor) = floor {
                return Some((direction, floor));
            }
        }
        None
    }
}
