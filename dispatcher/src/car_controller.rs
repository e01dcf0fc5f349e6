/// ----- CAR CONTROLLER -----
/// Drives a single car. It keeps the floors the car has committed to, leans
/// up or down, and reacts to the car's events by picking the next stop or
/// claiming hall calls from the shared registry.

use std::collections::BTreeSet;
use std::rc::Rc;

use log::{debug, trace};
use shared_resources::config::DispatchConfig;
use shared_resources::direction::Direction;

use crate::call_registry::SharedRegistry;
use crate::car::Car;
use crate::stop_selection::{Position, StopSelection};

pub struct CarController<C: Car> {
    id: usize,
    car: C,
    registry: SharedRegistry,
    strategy: Rc<dyn StopSelection>,
    settings: DispatchConfig,
    top_floor: u8,
    direction: Direction,
    stops: BTreeSet<u8>,
    // Floor last commanded and not yet reached.
    target: Option<u8>,
    idle: bool,
}

impl<C: Car> CarController<C> {
    pub fn new(
        id: usize,
        car: C,
        registry: SharedRegistry,
        strategy: Rc<dyn StopSelection>,
        settings: DispatchConfig,
    ) -> Self {
        let top_floor = registry.borrow().top_floor();
        let mut controller = CarController {
            id,
            car,
            registry,
            strategy,
            settings,
            top_floor,
            direction: Direction::Up,
            stops: BTreeSet::new(),
            target: None,
            idle: true,
        };
        controller.apply_direction(Direction::Up);
        controller
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn car(&self) -> &C {
        &self.car
    }

    pub fn car_mut(&mut self) -> &mut C {
        &mut self.car
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn stops(&self) -> &BTreeSet<u8> {
        &self.stops
    }

    pub fn target(&self) -> Option<u8> {
        self.target
    }

    /// True when the car rests with no command and nothing left to claim.
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn add_stop(&mut self, floor: u8) {
        debug_assert!(floor <= self.top_floor, "floor {} above top floor {}", floor, self.top_floor);
        self.stops.insert(floor);
    }

    pub fn remove_stop(&mut self, floor: u8) {
        self.stops.remove(&floor);
    }

    fn position(&self) -> Position {
        Position {
            floor: self.car.current_floor(),
            direction: self.direction,
            top_floor: self.top_floor,
        }
    }

    fn apply_direction(&mut self, direction: Direction) {
        if direction != self.direction {
            debug!("car {} reversing to {}", self.id, direction);
        }
        self.direction = direction;
        self.car.set_going_up_indicator(direction.is_up());
        self.car.set_going_down_indicator(!direction.is_up());
    }

    fn commit(&mut self, floor: u8) {
        if let Some(previous) = self.target.replace(floor) {
            if previous != floor {
                self.stops.insert(previous);
            }
        }
        debug!("car {} heading {} to floor {}", self.id, self.direction, floor);
        self.car.go_to_floor(floor, true);
        self.idle = false;
    }

    fn merge_pressed_floors(&mut self, here: u8) {
        for floor in self.car.pressed_floors() {
            if floor != here {
                self.stops.insert(floor);
            }
        }
    }

    /// Commands the car to its next committed stop, if any, and returns it.
    pub fn select_next_stop(&mut self) -> Option<u8> {
        let selection = self.strategy.next_stop(self.position(), &self.stops);
        self.apply_direction(selection.direction);
        let floor = selection.floor?;
        self.stops.remove(&floor);
        self.commit(floor);
        Some(floor)
    }

    pub fn on_floor_button_pressed(&mut self, floor: u8) {
        trace!("car {} cab button {}", self.id, floor);
        self.add_stop(floor);
        if self.idle {
            let here = self.car.current_floor();
            self.stops.remove(&here);
            self.select_next_stop();
        }
    }

    /// Returns whether the car was told to stop at `floor`.
    pub fn on_passing_floor(&mut self, floor: u8, direction: Direction) -> bool {
        trace!("car {} passing floor {} going {}", self.id, floor, direction);
        if direction != self.direction {
            return false;
        }

        if self.settings.stop_for_cab_requests_en_route && self.stops.remove(&floor) {
            debug!("car {} stopping en route for cab request at floor {}", self.id, floor);
            self.commit(floor);
            return true;
        }

        if self.car.load_factor() >= self.settings.max_pickup_load {
            return false;
        }
        if self.registry.borrow_mut().claim(direction, floor) {
            debug!("car {} picking up {} call at floor {}", self.id, direction, floor);
            self.commit(floor);
            return true;
        }
        false
    }

    pub fn on_stopped_at_floor(&mut self, floor: u8) {
        trace!("car {} stopped at floor {}", self.id, floor);
        self.stops.remove(&floor);
        if let Some(target) = self.target.take() {
            if target != floor {
                self.stops.insert(target);
            }
        }
        self.merge_pressed_floors(floor);
        self.select_next_stop();
        self.serve_hall_call_at(floor);
    }

    // Riders waiting here in our direction board now, so their call needs no
    // other car.
    fn serve_hall_call_at(&mut self, floor: u8) {
        if self.car.load_factor() >= self.settings.max_pickup_load {
            return;
        }
        if self.registry.borrow_mut().claim(self.direction, floor) {
            debug!("car {} serving {} call at floor {} on arrival", self.id, self.direction, floor);
        }
    }

    pub fn on_idle(&mut self) {
        trace!("car {} idle event", self.id);
        self.target = None;
        let here = self.car.current_floor();
        self.merge_pressed_floors(here);
        self.stops.remove(&here);

        if !self.stops.is_empty() && self.select_next_stop().is_some() {
            return;
        }

        let position = self.position();
        let claimed = self
            .strategy
            .claim_idle_call(position, &mut self.registry.borrow_mut());
        match claimed {
            Some((direction, floor)) => {
                debug!("car {} claimed {} call at floor {}", self.id, direction, floor);
                self.apply_direction(direction);
                self.commit(floor);
            }
            None => {
                if !self.idle {
                    debug!("car {} resting at floor {}", self.id, here);
                }
                self.idle = true;
            }
        }
    }
}
