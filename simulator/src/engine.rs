/// ----- ENGINE MODULE -----
/// Moves the cars, spawns riders and turns what happens into the events the
/// dispatcher reacts to. Events are queued on a channel during a step and
/// delivered one at a time once every car has moved.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use dispatcher::car::{Car, CarEvent, Floor, FloorEvent};
use dispatcher::Dispatcher;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_resources::config::Config;
use shared_resources::direction::Direction;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    Car(usize, CarEvent),
    Floor(u8, FloorEvent),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Passenger {
    pub origin: u8,
    pub destination: u8,
    pub spawned_at: f64,
    pub boarded_at: Option<f64>,
}

impl Passenger {
    pub fn direction(&self) -> Direction {
        Direction::between(self.origin, self.destination).unwrap_or(Direction::Up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Stopped,
    Moving(Direction),
    DoorsOpen { remaining: f64, boarded: bool },
}

#[derive(Debug)]
pub struct CarBody {
    pub position: f64,
    pub floor: u8,
    pub going_up: bool,
    pub going_down: bool,
    pub destinations: VecDeque<u8>,
    pub riders: Vec<Passenger>,
    pub capacity: usize,
    pub motion: Motion,
    idle_reported: bool,
}

impl CarBody {
    fn new(capacity: usize) -> Self {
        CarBody {
            position: 0.0,
            floor: 0,
            going_up: false,
            going_down: false,
            destinations: VecDeque::new(),
            riders: Vec::new(),
            capacity,
            motion: Motion::Stopped,
            idle_reported: true,
        }
    }

    pub fn pressed_floors(&self) -> Vec<u8> {
        let mut floors: Vec<u8> = self.riders.iter().map(|p| p.destination).collect();
        floors.sort_unstable();
        floors.dedup();
        floors
    }

    pub fn load_factor(&self) -> f64 {
        self.riders.len() as f64 / self.capacity as f64
    }

    fn indicated_direction(&self) -> Option<Direction> {
        match (self.going_up, self.going_down) {
            (true, false) => Some(Direction::Up),
            (false, true) => Some(Direction::Down),
            _ => None,
        }
    }
}

/// The dispatcher's handle on a simulated car.
#[derive(Debug, Clone)]
pub struct SimCar {
    body: Rc<RefCell<CarBody>>,
}

impl Car for SimCar {
    fn current_floor(&self) -> u8 {
        self.body.borrow().floor
    }

    fn going_up_indicator(&self) -> bool {
        self.body.borrow().going_up
    }

    fn set_going_up_indicator(&mut self, on: bool) {
        self.body.borrow_mut().going_up = on;
    }

    fn going_down_indicator(&self) -> bool {
        self.body.borrow().going_down
    }

    fn set_going_down_indicator(&mut self, on: bool) {
        self.body.borrow_mut().going_down = on;
    }

    fn go_to_floor(&mut self, floor: u8, priority: bool) {
        let mut body = self.body.borrow_mut();
        body.destinations.retain(|queued| *queued != floor);
        if priority {
            body.destinations.push_front(floor);
        } else {
            body.destinations.push_back(floor);
        }
        body.idle_reported = false;
    }

    fn pressed_floors(&self) -> Vec<u8> {
        self.body.borrow().pressed_floors()
    }

    fn load_factor(&self) -> f64 {
        self.body.borrow().load_factor()
    }
}

pub struct SimFloor(pub u8);

impl Floor for SimFloor {
    fn floor_num(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct FloorState {
    pub waiting: Vec<Passenger>,
    pub up_lit: bool,
    pub down_lit: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stats {
    pub spawned: usize,
    pub boarded: usize,
    pub delivered: usize,
    pub max_wait: f64,
    total_wait: f64,
    total_ride: f64,
}

impl Stats {
    pub fn average_wait(&self) -> f64 {
        if self.boarded == 0 { 0.0 } else { self.total_wait / self.boarded as f64 }
    }

    pub fn average_ride(&self) -> f64 {
        if self.delivered == 0 { 0.0 } else { self.total_ride / self.delivered as f64 }
    }
}

pub struct Simulation {
    config: Config,
    clock: f64,
    bodies: Vec<Rc<RefCell<CarBody>>>,
    floors: Vec<FloorState>,
    dispatcher: Dispatcher<SimCar>,
    events_tx: Sender<SimEvent>,
    events_rx: Receiver<SimEvent>,
    rng: StdRng,
    stats: Stats,
    // Set when a hall button lights, so resting cars report idle again.
    recall_resting: bool,
}

impl Simulation {
    pub fn new(config: Config) -> Self {
        let capacity = config.elevator.capacity as usize;
        let bodies: Vec<Rc<RefCell<CarBody>>> = (0..config.elevator.num_cars)
            .map(|_| Rc::new(RefCell::new(CarBody::new(capacity))))
            .collect();
        let cars: Vec<SimCar> = bodies.iter().map(|body| SimCar { body: Rc::clone(body) }).collect();
        let floor_handles: Vec<SimFloor> = (0..config.elevator.num_floors).map(SimFloor).collect();
        let dispatcher = Dispatcher::init(cars, &floor_handles, config.dispatch.clone());

        let (events_tx, events_rx) = unbounded();
        let simulation = Simulation {
            clock: 0.0,
            floors: (0..config.elevator.num_floors).map(|_| FloorState::default()).collect(),
            rng: StdRng::seed_from_u64(config.simulation.seed),
            stats: Stats::default(),
            recall_resting: false,
            config,
            bodies,
            dispatcher,
            events_tx,
            events_rx,
        };
        for car in 0..simulation.bodies.len() {
            simulation.emit(SimEvent::Car(car, CarEvent::Idle));
        }
        simulation
    }

    fn emit(&self, event: SimEvent) {
        if self.events_tx.send(event).is_err() {
            warn!("event queue closed, dropping {:?}", event);
        }
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn floors(&self) -> &[FloorState] {
        &self.floors
    }

    pub fn car(&self, car: usize) -> Ref<'_, CarBody> {
        self.bodies[car].borrow()
    }

    pub fn dispatcher(&self) -> &Dispatcher<SimCar> {
        &self.dispatcher
    }

    pub fn finished(&self) -> bool {
        self.clock >= self.config.simulation.duration_s
    }

    pub fn step(&mut self) {
        let dt = self.config.simulation.dt();
        self.clock += dt;
        self.spawn_passengers(dt);
        if std::mem::take(&mut self.recall_resting) {
            self.recall_resting_cars();
        }
        for car in 0..self.bodies.len() {
            self.advance_car(car, dt);
        }
        self.deliver_events();
        self.dispatcher.tick(dt);
    }

    pub fn run_for(&mut self, seconds: f64) {
        let end = self.clock + seconds;
        while self.clock < end {
            self.step();
        }
    }

    // A resting car only hears about new hall calls through the dispatcher's
    // wake-up, which may be disabled. Reporting idle again lets it look.
    fn recall_resting_cars(&mut self) {
        for body in &self.bodies {
            let mut body = body.borrow_mut();
            if body.motion == Motion::Stopped && body.destinations.is_empty() {
                body.idle_reported = false;
            }
        }
    }

    fn deliver_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SimEvent::Car(car, event) => self.dispatcher.handle_car_event(car, event),
                SimEvent::Floor(floor, event) => self.dispatcher.handle_floor_event(&SimFloor(floor), event),
            }
        }
    }

    fn spawn_passengers(&mut self, dt: f64) {
        let probability = (self.config.simulation.spawn_rate * dt).min(1.0);
        if !self.rng.gen_bool(probability) {
            return;
        }
        let num_floors = self.floors.len() as u8;
        let origin = self.rng.gen_range(0..num_floors);
        let mut destination = self.rng.gen_range(0..num_floors - 1);
        if destination >= origin {
            destination += 1;
        }
        self.add_passenger(origin, destination);
    }

    pub fn add_passenger(&mut self, origin: u8, destination: u8) {
        debug_assert!(origin != destination, "passenger going nowhere at floor {}", origin);
        let passenger = Passenger {
            origin,
            destination,
            spawned_at: self.clock,
            boarded_at: None,
        };
        debug!("passenger at floor {} wants floor {}", origin, destination);
        self.stats.spawned += 1;
        self.floors[origin as usize].waiting.push(passenger);
        self.press_hall_button(origin, passenger.direction());
    }

    fn press_hall_button(&mut self, floor: u8, direction: Direction) {
        let state = &mut self.floors[floor as usize];
        let lit = match direction {
            Direction::Up => &mut state.up_lit,
            Direction::Down => &mut state.down_lit,
        };
        if *lit {
            return;
        }
        *lit = true;
        self.recall_resting = true;
        let event = match direction {
            Direction::Up => FloorEvent::UpButtonPressed,
            Direction::Down => FloorEvent::DownButtonPressed,
        };
        self.emit(SimEvent::Floor(floor, event));
    }

    fn advance_car(&mut self, car: usize, dt: f64) {
        let body = Rc::clone(&self.bodies[car]);
        let mut body = body.borrow_mut();

        match body.motion {
            Motion::DoorsOpen { remaining, boarded } => {
                if !boarded {
                    self.board(car, &mut body);
                }
                let remaining = remaining - dt;
                body.motion = if remaining > 0.0 {
                    Motion::DoorsOpen { remaining, boarded: true }
                } else {
                    Motion::Stopped
                };
            }
            Motion::Stopped | Motion::Moving(_) => {
                if body.destinations.is_empty() {
                    body.motion = Motion::Stopped;
                    if !body.idle_reported {
                        body.idle_reported = true;
                        self.emit(SimEvent::Car(car, CarEvent::Idle));
                    }
                } else {
                    self.drive(car, &mut body, dt);
                }
            }
        }
    }

    fn drive(&mut self, car: usize, body: &mut CarBody, dt: f64) {
        let Some(target) = body.destinations.front().copied() else {
            return;
        };
        if (body.position - target as f64).abs() < EPSILON {
            self.arrive(car, body, target);
            return;
        }

        let direction = if target as f64 > body.position { Direction::Up } else { Direction::Down };
        let travelled = dt / self.config.simulation.floor_travel_s;
        let (next_floor, position) = match direction {
            Direction::Up => {
                let next = (body.position + EPSILON).floor() + 1.0;
                (next, (body.position + travelled).min(next))
            }
            Direction::Down => {
                let next = (body.position - EPSILON).ceil() - 1.0;
                (next, (body.position - travelled).max(next))
            }
        };
        body.position = position;
        body.motion = Motion::Moving(direction);

        if (position - next_floor).abs() < EPSILON {
            body.position = next_floor;
            let floor = next_floor as u8;
            body.floor = floor;
            if floor == target {
                self.arrive(car, body, floor);
            } else {
                self.emit(SimEvent::Car(car, CarEvent::PassingFloor { floor, direction }));
            }
        }
    }

    fn arrive(&mut self, car: usize, body: &mut CarBody, floor: u8) {
        body.destinations.retain(|queued| *queued != floor);
        body.motion = Motion::DoorsOpen {
            remaining: self.config.simulation.door_open_s,
            boarded: false,
        };

        let clock = self.clock;
        let (leaving, staying): (Vec<Passenger>, Vec<Passenger>) =
            body.riders.drain(..).partition(|p| p.destination == floor);
        body.riders = staying;
        for passenger in leaving {
            self.stats.delivered += 1;
            self.stats.total_ride += clock - passenger.boarded_at.unwrap_or(clock);
        }

        debug!("car {} doors open at floor {}", car, floor);
        self.emit(SimEvent::Car(car, CarEvent::StoppedAtFloor(floor)));
    }

    // Runs once the dispatcher has seen the arrival, so the indicators show
    // which way the car is about to leave.
    fn board(&mut self, car: usize, body: &mut CarBody) {
        let Some(direction) = body.indicated_direction() else {
            return;
        };
        let floor = body.floor;
        let clock = self.clock;
        let waiting = std::mem::take(&mut self.floors[floor as usize].waiting);

        let mut left_behind = Vec::new();
        let mut pressed = Vec::new();
        for passenger in waiting {
            if passenger.direction() != direction || body.riders.len() >= body.capacity {
                left_behind.push(passenger);
                continue;
            }
            let wait = clock - passenger.spawned_at;
            self.stats.boarded += 1;
            self.stats.total_wait += wait;
            self.stats.max_wait = self.stats.max_wait.max(wait);
            if !body.riders.iter().any(|r| r.destination == passenger.destination) {
                pressed.push(passenger.destination);
            }
            body.riders.push(Passenger {
                boarded_at: Some(clock),
                ..passenger
            });
        }

        let still_waiting = left_behind.iter().any(|p| p.direction() == direction);
        let state = &mut self.floors[floor as usize];
        state.waiting = left_behind;
        match direction {
            Direction::Up => state.up_lit = false,
            Direction::Down => state.down_lit = false,
        }

        for destination in pressed {
            self.emit(SimEvent::Car(car, CarEvent::FloorButtonPressed(destination)));
        }
        if still_waiting {
            self.press_hall_button(floor, direction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config(num_floors: u8, num_cars: u8) -> Config {
        let mut config = Config::default();
        config.elevator.num_floors = num_floors;
        config.elevator.num_cars = num_cars;
        config.simulation.spawn_rate = 0.0;
        config
    }

    #[test]
    fn go_to_floor_dedups_and_prioritises() {
        let body = Rc::new(RefCell::new(CarBody::new(4)));
        let mut car = SimCar { body: Rc::clone(&body) };
        car.go_to_floor(3, false);
        car.go_to_floor(5, false);
        car.go_to_floor(5, true);
        car.go_to_floor(1, false);

        assert_eq!(body.borrow().destinations, VecDeque::from(vec![5, 3, 1]));
    }

    #[test]
    fn pressed_floors_are_sorted_and_unique() {
        let mut body = CarBody::new(4);
        for destination in [4, 1, 4] {
            body.riders.push(Passenger {
                origin: 0,
                destination,
                spawned_at: 0.0,
                boarded_at: Some(0.0),
            });
        }
        assert_eq!(body.pressed_floors(), vec![1, 4]);
        assert_eq!(body.load_factor(), 0.75);
    }

    #[test]
    fn delivers_single_passenger() {
        let mut simulation = Simulation::new(quiet_config(4, 1));
        simulation.add_passenger(2, 0);
        simulation.run_for(60.0);

        let stats = simulation.stats();
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.delivered, 1);
        assert!(stats.average_wait() > 0.0);
        assert!(simulation.floors().iter().all(|f| f.waiting.is_empty()));
    }

    #[test]
    fn delivers_everyone_with_two_cars() {
        let mut simulation = Simulation::new(quiet_config(6, 2));
        for (origin, destination) in [(0, 5), (3, 1), (5, 0), (2, 4), (4, 2), (1, 3)] {
            simulation.add_passenger(origin, destination);
        }
        simulation.run_for(300.0);

        assert_eq!(simulation.stats().delivered, 6);
        assert!(!simulation.dispatcher().registry().has_pending_work());
        for car in 0..simulation.dispatcher().controllers().len() {
            assert!(simulation.car(car).riders.is_empty());
        }
    }

    #[test]
    fn resting_car_serves_calls_without_wake_up() {
        let mut config = quiet_config(4, 1);
        config.dispatch.wake_idle_cars = false;
        let mut simulation = Simulation::new(config);
        simulation.run_for(5.0);

        simulation.add_passenger(2, 0);
        simulation.add_passenger(3, 1);
        simulation.run_for(60.0);

        assert_eq!(simulation.stats().delivered, 2);
        assert!(!simulation.dispatcher().registry().has_pending_work());
    }

    #[test]
    fn full_car_leaves_riders_calling() {
        let mut config = quiet_config(4, 1);
        config.elevator.capacity = 1;
        let mut simulation = Simulation::new(config);
        simulation.add_passenger(1, 3);
        simulation.add_passenger(1, 2);
        simulation.run_for(120.0);

        assert_eq!(simulation.stats().delivered, 2);
    }

    #[test]
    fn same_seed_spawns_same_passengers() {
        let mut config = Config::default();
        config.simulation.spawn_rate = 2.0;
        let mut first = Simulation::new(config.clone());
        let mut second = Simulation::new(config);
        first.run_for(20.0);
        second.run_for(20.0);

        assert!(first.stats().spawned > 0);
        assert_eq!(first.stats(), second.stats());
    }
}
