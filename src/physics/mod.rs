pub mod atmosphere;
pub mod aerodynamics;
pub mod propulsion;
pub mod mass_properties;
pub mod gravity;

pub use atmosphere::{isa, Atmo};
pub use aerodynamics::{aero_loads, AeroLoads};
pub use propulsion::{engine_output, EngineOutput};
pub use mass_properties::MassProperties;
pub use gravity::gravity_accel;
