use std::fs;
use std::io;
use std::path::Path;

use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ElevatorConfig {
    pub num_floors: u8,
    pub num_cars: u8,
    pub capacity: u8,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        ElevatorConfig {
            num_floors: 6,
            num_cars: 2,
            capacity: 6,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchConfig {
    /// A car at or above this load factor passes hall calls by.
    pub max_pickup_load: f64,
    pub wake_idle_cars: bool,
    pub stop_for_cab_requests_en_route: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            max_pickup_load: 1.0,
            wake_idle_cars: true,
            stop_for_cab_requests_en_route: true,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    pub duration_s: f64,
    pub tick_ms: u64,
    pub floor_travel_s: f64,
    pub door_open_s: f64,
    /// Expected passengers per second.
    pub spawn_rate: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            duration_s: 120.0,
            tick_ms: 50,
            floor_travel_s: 1.5,
            door_open_s: 1.0,
            spawn_rate: 0.4,
            seed: 1,
        }
    }
}

impl SimulationConfig {
    pub fn dt(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub elevator: ElevatorConfig,
    pub dispatch: DispatchConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Reads `path`, falling back to the defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("No configuration file at {}, using default settings...", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elevator.num_floors < 2 {
            return Err(ConfigError::Invalid(format!(
                "numFloors must be at least 2, got {}",
                self.elevator.num_floors
            )));
        }
        if self.elevator.num_cars == 0 {
            return Err(ConfigError::Invalid(String::from("numCars must be at least 1")));
        }
        if self.elevator.capacity == 0 {
            return Err(ConfigError::Invalid(String::from("capacity must be at least 1")));
        }
        let load = self.dispatch.max_pickup_load;
        if !(load > 0.0 && load <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "maxPickupLoad must be in (0, 1], got {}",
                load
            )));
        }
        let sim = &self.simulation;
        if sim.tick_ms == 0 || sim.floor_travel_s <= 0.0 || sim.door_open_s < 0.0 || sim.duration_s < 0.0 {
            return Err(ConfigError::Invalid(String::from("simulation timings must be positive")));
        }
        if sim.spawn_rate < 0.0 {
            return Err(ConfigError::Invalid(String::from("spawnRate must not be negative")));
        }
        Ok(())
    }
}
