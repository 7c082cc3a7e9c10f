pub mod ids;
pub mod range;
pub mod telemetry;

pub use ids::*;
pub use range::*;
pub use telemetry::*;
