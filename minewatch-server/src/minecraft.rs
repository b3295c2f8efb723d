//! Game server metrics
//!
//! Scrapes the exporter's `/metrics` endpoint and normalizes the resulting
//! [`MetricTable`] into the dashboard's [`NormalizedSnapshot`]. Every field
//! reads one fixed key through [`MetricTable::get_or`]:
//!
//! | field                         | key                                     | fallback |
//! |-------------------------------|-----------------------------------------|----------|
//! | tps                           | `minecraft_tps`                         | 20       |
//! | players.online                | `minecraft_players_online_total`        | 0        |
//! | players.max                   | `minecraft_players_max`                 | 20       |
//! | memory.used / max             | `jvm_memory_bytes_{used,max}_heap`      | 0        |
//! | world.entities                | `minecraft_entities_total`              | 0        |
//! | world.chunks                  | `minecraft_loaded_chunks_total`         | 0        |
//! | world.tickTime, mspt.mean     | `minecraft_mspt_mean`                   | 0        |
//! | mspt.min / max                | `minecraft_mspt_{min,max}`              | 0        |
//! | jvm.threads.*                 | `jvm_threads_{current,peak,deadlocked}` | 0        |
//! | jvm.threads.states.*          | `jvm_threads_state_<STATE>`             | 0        |
//! | jvm.gc.<gen>                  | `jvm_gc_collection_seconds_{count,sum}_<gen>` | 0  |
//! | jvm.classesLoaded             | `jvm_classes_currently_loaded`          | 0        |
//! | system.fileDescriptors.open   | `process_open_fds`                      | 0        |
//! | system.fileDescriptors.max    | `process_max_fds`                       | 1        |
//! | dimensions.<dim>.*            | `minecraft_{players_online,loaded_chunks,total_loaded_chunks}_<dim>` | 0 |
//! | connections.statusPings       | `minecraft_handshakes_total_status`     | 0        |
//! | connections.logins            | `minecraft_handshakes_total_login`      | 0        |
//! | uptime                        | `process_start_time_seconds`            | 0        |

use crate::config::MonitorConfig;
use crate::error::FetchError;
use crate::exposition::MetricTable;
use crate::units::{epoch_secs_f64, fixed2, format_gib};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const GC_YOUNG: &str = "G1 Young Generation";
const GC_CONCURRENT: &str = "G1 Concurrent GC";
const GC_OLD: &str = "G1 Old Generation";

/// Result of one scrape: a full snapshot, or the offline marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MinecraftStatus {
    Online(Box<NormalizedSnapshot>),
    Offline(OfflineMarker),
}

impl MinecraftStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, MinecraftStatus::Online(_))
    }
}

/// `{online: false, error}` and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineMarker {
    pub online: bool,
    pub error: String,
}

impl OfflineMarker {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            online: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSnapshot {
    pub online: bool,
    pub tps: f64,
    pub players: Players,
    pub memory: HeapMemory,
    pub world: World,
    pub performance: Performance,
    pub jvm: Jvm,
    pub system: ProcessStats,
    pub dimensions: Dimensions,
    pub connections: Connections,
    /// Seconds since the server process started.
    pub uptime: u64,
    pub raw_metrics: MetricTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Players {
    pub online: f64,
    pub max: f64,
}

/// Heap figures in GiB, already formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapMemory {
    pub used: String,
    pub max: String,
    pub free: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub entities: f64,
    pub chunks: f64,
    pub tick_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub mspt: Mspt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mspt {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Jvm {
    pub threads: Threads,
    pub gc: GcStats,
    pub classes_loaded: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threads {
    pub current: f64,
    pub peak: f64,
    pub deadlocked: f64,
    pub states: ThreadStates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStates {
    pub runnable: f64,
    pub waiting: f64,
    pub timed_waiting: f64,
    pub blocked: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcStats {
    pub young_gen: GcGeneration,
    pub concurrent: GcGeneration,
    pub old_gen: GcGeneration,
    pub total_collections: f64,
    pub total_time_seconds: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcGeneration {
    pub collections: f64,
    pub time_seconds: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStats {
    pub file_descriptors: FileDescriptors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptors {
    pub open: f64,
    pub max: f64,
    pub percent_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimensions {
    pub overworld: DimensionStats,
    pub nether: DimensionStats,
    pub end: DimensionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionStats {
    pub players: f64,
    pub chunks: f64,
    pub total_chunks: f64,
}

impl DimensionStats {
    fn read(table: &MetricTable, dimension: &str) -> Self {
        Self {
            players: table.get_or(&format!("minecraft_players_online_{dimension}"), 0.0),
            chunks: table.get_or(&format!("minecraft_loaded_chunks_{dimension}"), 0.0),
            total_chunks: table.get_or(&format!("minecraft_total_loaded_chunks_{dimension}"), 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connections {
    pub status_pings: f64,
    pub logins: f64,
}

/// Per-generation counters: (collections, seconds spent).
fn gc_generation(table: &MetricTable, generation: &str) -> (f64, f64) {
    (
        table.get_or(&format!("jvm_gc_collection_seconds_count_{generation}"), 0.0),
        table.get_or(&format!("jvm_gc_collection_seconds_sum_{generation}"), 0.0),
    )
}

fn gc_stats(table: &MetricTable) -> GcStats {
    let (young_count, young_time) = gc_generation(table, GC_YOUNG);
    let (concurrent_count, concurrent_time) = gc_generation(table, GC_CONCURRENT);
    let (old_count, old_time) = gc_generation(table, GC_OLD);

    GcStats {
        young_gen: GcGeneration {
            collections: young_count,
            time_seconds: fixed2(young_time),
        },
        concurrent: GcGeneration {
            collections: concurrent_count,
            time_seconds: fixed2(concurrent_time),
        },
        old_gen: GcGeneration {
            collections: old_count,
            time_seconds: fixed2(old_time),
        },
        total_collections: young_count + concurrent_count + old_count,
        total_time_seconds: fixed2(young_time + concurrent_time + old_time),
    }
}

fn heap_memory(table: &MetricTable) -> HeapMemory {
    let used = table.get_or("jvm_memory_bytes_used_heap", 0.0);
    let max = table.get_or("jvm_memory_bytes_max_heap", 0.0);
    let free = if max > 0.0 {
        format_gib(max - used)
    } else {
        fixed2(0.0)
    };

    HeapMemory {
        used: format_gib(used),
        max: format_gib(max),
        free,
    }
}

fn uptime_seconds(table: &MetricTable, now_secs: f64) -> u64 {
    let started = table.get_or("process_start_time_seconds", 0.0);
    if started == 0.0 {
        return 0;
    }
    (now_secs - started).floor().max(0.0) as u64
}

/// Build the snapshot from a parsed table. `now_secs` is the wall clock in
/// Unix seconds, used for the uptime derivation.
pub fn normalize(table: MetricTable, now_secs: f64) -> NormalizedSnapshot {
    let open_fds = table.get_or("process_open_fds", 0.0);
    let max_fds = table.get_or("process_max_fds", 1.0);
    let mspt_mean = table.get_or("minecraft_mspt_mean", 0.0);

    NormalizedSnapshot {
        online: true,
        tps: table.get_or("minecraft_tps", 20.0),
        players: Players {
            online: table.get_or("minecraft_players_online_total", 0.0),
            max: table.get_or("minecraft_players_max", 20.0),
        },
        memory: heap_memory(&table),
        world: World {
            entities: table.get_or("minecraft_entities_total", 0.0),
            chunks: table.get_or("minecraft_loaded_chunks_total", 0.0),
            tick_time: mspt_mean,
        },
        performance: Performance {
            mspt: Mspt {
                min: table.get_or("minecraft_mspt_min", 0.0),
                mean: mspt_mean,
                max: table.get_or("minecraft_mspt_max", 0.0),
            },
        },
        jvm: Jvm {
            threads: Threads {
                current: table.get_or("jvm_threads_current", 0.0),
                peak: table.get_or("jvm_threads_peak", 0.0),
                deadlocked: table.get_or("jvm_threads_deadlocked", 0.0),
                states: ThreadStates {
                    runnable: table.get_or("jvm_threads_state_RUNNABLE", 0.0),
                    waiting: table.get_or("jvm_threads_state_WAITING", 0.0),
                    timed_waiting: table.get_or("jvm_threads_state_TIMED_WAITING", 0.0),
                    blocked: table.get_or("jvm_threads_state_BLOCKED", 0.0),
                },
            },
            gc: gc_stats(&table),
            classes_loaded: table.get_or("jvm_classes_currently_loaded", 0.0),
        },
        system: ProcessStats {
            file_descriptors: FileDescriptors {
                open: open_fds,
                max: max_fds,
                percent_used: fixed2(open_fds / max_fds * 100.0),
            },
        },
        dimensions: Dimensions {
            overworld: DimensionStats::read(&table, "overworld"),
            nether: DimensionStats::read(&table, "the_nether"),
            end: DimensionStats::read(&table, "the_end"),
        },
        connections: Connections {
            status_pings: table.get_or("minecraft_handshakes_total_status", 0.0),
            logins: table.get_or("minecraft_handshakes_total_login", 0.0),
        },
        uptime: uptime_seconds(&table, now_secs),
        raw_metrics: table,
    }
}

/// Scrapes the exporter once per call. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct MetricsSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl MetricsSource {
    pub fn new(client: reqwest::Client, cfg: &MonitorConfig) -> Self {
        Self {
            client,
            url: cfg.metrics_url(),
            timeout: cfg.fetch_timeout(),
        }
    }

    /// Fetch the raw exposition body. Non-2xx statuses are errors.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Fetch, parse and normalize. Never fails: a scrape error becomes the
    /// offline marker and nothing is parsed.
    pub async fn collect(&self) -> MinecraftStatus {
        match self.fetch().await {
            Ok(body) => {
                let table = MetricTable::parse(&body);
                debug!(samples = table.len(), "parsed exporter metrics");
                MinecraftStatus::Online(Box::new(normalize(table, epoch_secs_f64())))
            }
            Err(e) => {
                warn!("error fetching Minecraft metrics from {}: {e}", self.url);
                MinecraftStatus::Offline(OfflineMarker::new(e.to_string()))
            }
        }
    }
}
