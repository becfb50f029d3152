pub mod stage;
pub mod config;

pub use stage::{Stage, StageBuilder};
pub use config::{ConfigError, Fairing, Payload, VehicleConfigBuilder, VehicleConfiguration};
