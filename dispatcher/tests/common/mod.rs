#![allow(dead_code)]

use std::rc::Rc;

use dispatcher::call_registry::{CallRegistry, SharedRegistry};
use dispatcher::car::{Car, Floor};
use dispatcher::car_controller::CarController;
use dispatcher::stop_selection::ContinuationBias;
use shared_resources::config::DispatchConfig;

pub const TOP_FLOOR: u8 = 5;

/// Car that stays where the test puts it and records every command.
#[derive(Debug, Default, Clone)]
pub struct MockCar {
    pub floor: u8,
    pub going_up: bool,
    pub going_down: bool,
    pub commands: Vec<(u8, bool)>,
    pub pressed: Vec<u8>,
    pub load: f64,
}

impl MockCar {
    pub fn at(floor: u8) -> Self {
        MockCar { floor, ..Default::default() }
    }

    pub fn last_command(&self) -> Option<u8> {
        self.commands.last().map(|(floor, _)| *floor)
    }

    pub fn commanded_floors(&self) -> Vec<u8> {
        self.commands.iter().map(|(floor, _)| *floor).collect()
    }
}

impl Car for MockCar {
    fn current_floor(&self) -> u8 {
        self.floor
    }

    fn going_up_indicator(&self) -> bool {
        self.going_up
    }

    fn set_going_up_indicator(&mut self, on: bool) {
        self.going_up = on;
    }

    fn going_down_indicator(&self) -> bool {
        self.going_down
    }

    fn set_going_down_indicator(&mut self, on: bool) {
        self.going_down = on;
    }

    fn go_to_floor(&mut self, floor: u8, priority: bool) {
        self.commands.push((floor, priority));
    }

    fn pressed_floors(&self) -> Vec<u8> {
        self.pressed.clone()
    }

    fn load_factor(&self) -> f64 {
        self.load
    }
}

pub struct MockFloor(pub u8);

impl Floor for MockFloor {
    fn floor_num(&self) -> u8 {
        self.0
    }
}

pub fn floors() -> Vec<MockFloor> {
    (0..=TOP_FLOOR).map(MockFloor).collect()
}

pub fn controller(car: MockCar) -> (CarController<MockCar>, SharedRegistry) {
    controller_with(car, DispatchConfig::default())
}

pub fn controller_with(car: MockCar, settings: DispatchConfig) -> (CarController<MockCar>, SharedRegistry) {
    let registry = CallRegistry::shared(TOP_FLOOR);
    let controller = CarController::new(0, car, Rc::clone(&registry), Rc::new(ContinuationBias), settings);
    (controller, registry)
}
