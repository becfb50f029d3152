pub mod state;
pub mod attitude;

pub use state::{VehicleState, G0, MU, PLANET_RADIUS, PLANET_ROTATION};
pub use attitude::{integrate_rotation, slew_gimbal, TorqueInputs};
