pub mod breath;
pub mod calibrate;
pub mod constants;
pub mod gesture;
pub mod normalize;
pub mod session;
pub mod stats;
pub mod types;
