use std::cell::Ref;
use std::rc::Rc;

use log::{info, trace, warn};
use shared_resources::config::DispatchConfig;

pub mod call_registry;
pub mod car;
pub mod car_controller;
pub mod stop_selection;

use call_registry::{CallRegistry, SharedRegistry};
use car::{Car, CarEvent, Floor, FloorEvent};
use car_controller::CarController;
use stop_selection::{ContinuationBias, StopSelection};

/// Owns the shared call registry and one controller per car, and routes the
/// events the engine delivers to them.
pub struct Dispatcher<C: Car> {
    registry: SharedRegistry,
    controllers: Vec<CarController<C>>,
    settings: DispatchConfig,
}

impl<C: Car> Dispatcher<C> {
    pub fn init<F: Floor>(cars: Vec<C>, floors: &[F], settings: DispatchConfig) -> Self {
        Self::with_strategy(cars, floors, settings, Rc::new(ContinuationBias))
    }

    pub fn with_strategy<F: Floor>(
        cars: Vec<C>,
        floors: &[F],
        settings: DispatchConfig,
        strategy: Rc<dyn StopSelection>,
    ) -> Self {
        let top_floor = floors.iter().map(Floor::floor_num).max().unwrap_or(0);
        let registry = CallRegistry::shared(top_floor);

        let controllers: Vec<CarController<C>> = cars
            .into_iter()
            .enumerate()
            .map(|(id, car)| {
                CarController::new(id, car, Rc::clone(&registry), Rc::clone(&strategy), settings.clone())
            })
            .collect();

        info!(
            "dispatcher started with {} cars serving floors 0..={} ({:?})",
            controllers.len(),
            top_floor,
            strategy
        );

        Dispatcher {
            registry,
            controllers,
            settings,
        }
    }

    pub fn handle_car_event(&mut self, car: usize, event: CarEvent) {
        let Some(controller) = self.controllers.get_mut(car) else {
            warn!("dropping {:?} for unknown car {}", event, car);
            return;
        };

        match event {
            CarEvent::PassingFloor { floor, direction } => {
                controller.on_passing_floor(floor, direction);
            }
            CarEvent::FloorButtonPressed(floor) => controller.on_floor_button_pressed(floor),
            CarEvent::StoppedAtFloor(floor) => controller.on_stopped_at_floor(floor),
            CarEvent::Idle => controller.on_idle(),
        }
    }

    pub fn handle_floor_event<F: Floor>(&mut self, floor: &F, event: FloorEvent) {
        let floor_num = floor.floor_num();
        trace!("floor {} {:?}", floor_num, event);
        self.registry.borrow_mut().register(event.direction(), floor_num);
        if self.settings.wake_idle_cars {
            self.wake_idle_cars();
        }
    }

    // Resting cars get no further idle event from the engine, so offer them
    // new work here, in car order.
    fn wake_idle_cars(&mut self) {
        for controller in self.controllers.iter_mut().filter(|c| c.is_idle()) {
            if !self.registry.borrow().has_pending_work() {
                break;
            }
            controller.on_idle();
        }
    }

    /// Periodic hook. The controllers only react to events, so there is
    /// nothing to do between them.
    pub fn tick(&mut self, _dt: f64) {}

    pub fn registry(&self) -> Ref<'_, CallRegistry> {
        self.registry.borrow()
    }

    pub fn controllers(&self) -> &[CarController<C>] {
        &self.controllers
    }

    pub fn controller(&self, car: usize) -> Option<&CarController<C>> {
        self.controllers.get(car)
    }

    pub fn controller_mut(&mut self, car: usize) -> Option<&mut CarController<C>> {
        self.controllers.get_mut(car)
    }
}
