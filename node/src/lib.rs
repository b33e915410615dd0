pub mod clock;
pub mod pipeline;
pub mod retry;
pub mod sampler;
pub mod sensors;
pub mod server;
pub mod state;

pub use pipeline::TelemetryPipeline;
pub use server::{NodeContext, NodeServer};
pub use state::{SensorHealth, TelemetryState};
