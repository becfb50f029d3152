pub mod elements;
pub mod maneuvers;

pub use elements::{predict_orbit, ApsisTiming, OrbitElements};
pub use maneuvers::{burn_duration, circular_velocity, remaining_delta_v};
