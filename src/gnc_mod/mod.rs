pub mod controller;
pub mod guidance;
pub mod tvc;

pub use controller::{AttitudeHold, BurnMode, Controller, SteeringCommand};
pub use guidance::{GuidanceConfig, GuidanceOutput, GuidancePhase, GuidanceStateMachine};
pub use tvc::TvcController;
