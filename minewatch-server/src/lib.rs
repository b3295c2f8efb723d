//! Minewatch - game server monitor
//!
//! Scrapes a game server's metrics exporter, samples the local host and
//! probes the game port, then serves the merged view as JSON for a dashboard.

pub mod config;
pub mod error;
pub mod exposition;
pub mod http;
pub mod minecraft;
pub mod probe;
pub mod state;
pub mod system;
pub mod units;

pub use config::{load_config, MonitorConfig};
pub use exposition::MetricTable;
pub use http::build_router;
pub use minecraft::{normalize, MetricsSource, MinecraftStatus, NormalizedSnapshot, OfflineMarker};
pub use probe::{Prober, ReachabilityResult};
pub use state::AppState;
pub use system::HostSnapshot;
