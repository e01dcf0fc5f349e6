use shared_resources::direction::Direction;

/// A physical elevator car as seen by the controller. Implemented by whatever
/// engine moves the cars.
pub trait Car {
    /// The floor the car is at, or the last floor it passed while moving.
    fn current_floor(&self) -> u8;

    fn going_up_indicator(&self) -> bool;
    fn set_going_up_indicator(&mut self, on: bool);
    fn going_down_indicator(&self) -> bool;
    fn set_going_down_indicator(&mut self, on: bool);

    /// Queue `floor` as a destination. With `priority` the car heads there
    /// before anything already queued.
    fn go_to_floor(&mut self, floor: u8, priority: bool);

    /// Destinations pressed inside the cabin, lowest first.
    fn pressed_floors(&self) -> Vec<u8>;

    /// How full the car is, from 0.0 (empty) to 1.0 (full).
    fn load_factor(&self) -> f64;
}

pub trait Floor {
    fn floor_num(&self) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarEvent {
    /// About to pass `floor` while travelling in `direction`.
    PassingFloor { floor: u8, direction: Direction },
    FloorButtonPressed(u8),
    StoppedAtFloor(u8),
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorEvent {
    UpButtonPressed,
    DownButtonPressed,
}

impl FloorEvent {
    pub fn direction(self) -> Direction {
        match self {
            FloorEvent::UpButtonPressed => Direction::Up,
            FloorEvent::DownButtonPressed => Direction::Down,
        }
    }
}
