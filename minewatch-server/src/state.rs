use crate::config::MonitorConfig;
use crate::minecraft::MetricsSource;
use crate::probe::Prober;
use std::sync::Arc;

/// Handler state. Built once at startup and never mutated, so requests share
/// it without locking.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<MonitorConfig>,
    pub metrics: MetricsSource,
    pub prober: Prober,
}

impl AppState {
    pub fn new(cfg: MonitorConfig) -> Self {
        Self::with_client(cfg, reqwest::Client::new())
    }

    pub fn with_client(cfg: MonitorConfig, client: reqwest::Client) -> Self {
        let metrics = MetricsSource::new(client, &cfg);
        let prober = Prober::new(&cfg);
        Self {
            cfg: Arc::new(cfg),
            metrics,
            prober,
        }
    }
}
