//! Raw TCP reachability check against the game port.

use crate::config::MonitorConfig;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReachabilityResult {
    pub reachable: bool,
}

#[derive(Debug, Clone)]
pub struct Prober {
    addr: String,
    timeout: Duration,
}

impl Prober {
    pub fn new(cfg: &MonitorConfig) -> Self {
        Self {
            addr: cfg.game_addr(),
            timeout: cfg.probe_timeout(),
        }
    }

    /// Connect and immediately close. Timeouts and connection errors both
    /// resolve to `reachable: false`; this never fails.
    pub async fn probe(&self) -> ReachabilityResult {
        let reachable = match timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!("game port {} refused: {e}", self.addr);
                false
            }
            Err(_) => {
                debug!("game port {} timed out after {:?}", self.addr, self.timeout);
                false
            }
        };

        ReachabilityResult { reachable }
    }
}
