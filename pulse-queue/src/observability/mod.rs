pub mod metrics;
pub mod layer;

#[cfg(feature = "tracing-basic")]
pub mod logging;

pub use metrics::{QueueStats, StatsAggregator, DEFAULT_LATENCY_WINDOW};
pub use layer::{BoxStream, ObservabilityLayer};

#[cfg(feature = "tracing-basic")]
pub use logging::init_tracing;
