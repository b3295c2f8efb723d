/*!
Fixtures exposition-format pour les tests

- `ExpositionBuilder` : construit un corps `/metrics` ligne par ligne
- `full_server_body()` : un exporter complet (toutes les clés lues par le
  normalizer) avec des valeurs calculables à la main, voir `expected`
*/

use std::fmt::Write;

/// Construction d'un corps exposition-format
#[derive(Debug, Default, Clone)]
pub struct ExpositionBuilder {
    text: String,
}

impl ExpositionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute les lignes `# HELP` / `# TYPE`
    pub fn help(mut self, name: &str, kind: &str, help: &str) -> Self {
        let _ = writeln!(self.text, "# HELP {name} {help}");
        let _ = writeln!(self.text, "# TYPE {name} {kind}");
        self
    }

    /// Échantillon sans labels
    pub fn sample(mut self, name: &str, value: f64) -> Self {
        let _ = writeln!(self.text, "{name} {value}");
        self
    }

    /// Échantillon labellisé, avec la virgule finale des exporters JVM
    pub fn labeled(mut self, name: &str, labels: &[(&str, &str)], value: f64) -> Self {
        let rendered: String = labels
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\","))
            .collect();
        let _ = writeln!(self.text, "{name}{{{rendered}}} {value}");
        self
    }

    /// Ligne brute (lignes malformées, valeurs non numériques...)
    pub fn raw(mut self, line: &str) -> Self {
        self.text.push_str(line);
        self.text.push('\n');
        self
    }

    pub fn blank(mut self) -> Self {
        self.text.push('\n');
        self
    }

    pub fn build(self) -> String {
        self.text
    }
}

/// Valeurs attendues après normalisation de `full_server_body`
pub mod expected {
    pub const TPS: f64 = 19.5;
    pub const PLAYERS_ONLINE: f64 = 4.0;
    pub const PLAYERS_MAX: f64 = 50.0;
    pub const HEAP_USED_GIB: &str = "2.00";
    pub const HEAP_MAX_GIB: &str = "4.00";
    pub const HEAP_FREE_GIB: &str = "2.00";
    pub const ENTITIES: f64 = 290.0;
    pub const CHUNKS: f64 = 550.0;
    pub const GC_TOTAL_COLLECTIONS: f64 = 129.0;
    pub const GC_TOTAL_TIME: &str = "5.21";
    pub const FDS_PERCENT_USED: &str = "25.00";
    pub const STATUS_PINGS: f64 = 17.0;
    pub const LOGINS: f64 = 5.0;
    /// Écart entre `process_start_time_seconds` et l'horloge passée au fixture
    pub const UPTIME_SECONDS: u64 = 3600;
}

/// Corps d'un exporter complet. `now_secs` fixe `process_start_time_seconds`
/// à `now_secs - 3600`.
pub fn full_server_body(now_secs: i64) -> String {
    ExpositionBuilder::new()
        .help("minecraft_tps", "gauge", "Server ticks per second")
        .sample("minecraft_tps", 19.5)
        .labeled("minecraft_players_online", &[("world", "overworld")], 3.0)
        .labeled("minecraft_players_online", &[("world", "the_nether")], 1.0)
        .labeled("minecraft_players_online", &[("world", "the_end")], 0.0)
        .sample("minecraft_players_max", 50.0)
        .labeled("minecraft_loaded_chunks", &[("world", "overworld")], 400.0)
        .labeled("minecraft_loaded_chunks", &[("world", "the_nether")], 120.0)
        .labeled("minecraft_loaded_chunks", &[("world", "the_end")], 30.0)
        .labeled("minecraft_total_loaded_chunks", &[("world", "overworld")], 900.0)
        .labeled("minecraft_total_loaded_chunks", &[("world", "the_nether")], 200.0)
        .labeled("minecraft_total_loaded_chunks", &[("world", "the_end")], 60.0)
        .labeled("minecraft_entities", &[("world", "overworld")], 250.0)
        .labeled("minecraft_entities", &[("world", "the_nether")], 40.0)
        .sample("minecraft_mspt_min", 2.5)
        .sample("minecraft_mspt_mean", 12.25)
        .sample("minecraft_mspt_max", 48.0)
        .labeled("minecraft_handshakes_total", &[("type", "status")], 17.0)
        .labeled("minecraft_handshakes_total", &[("type", "login")], 5.0)
        .blank()
        .help("jvm_memory_bytes_used", "gauge", "Used bytes of a given JVM memory area.")
        .labeled("jvm_memory_bytes_used", &[("area", "heap")], 2147483648.0)
        .labeled("jvm_memory_bytes_used", &[("area", "nonheap")], 157286400.0)
        .labeled("jvm_memory_bytes_max", &[("area", "heap")], 4294967296.0)
        .labeled("jvm_memory_bytes_max", &[("area", "nonheap")], -1.0)
        .sample("jvm_threads_current", 64.0)
        .sample("jvm_threads_peak", 70.0)
        .sample("jvm_threads_deadlocked", 0.0)
        .labeled("jvm_threads_state", &[("state", "RUNNABLE")], 20.0)
        .labeled("jvm_threads_state", &[("state", "WAITING")], 30.0)
        .labeled("jvm_threads_state", &[("state", "TIMED_WAITING")], 12.0)
        .labeled("jvm_threads_state", &[("state", "BLOCKED")], 2.0)
        .labeled("jvm_gc_collection_seconds_count", &[("gc", "G1 Young Generation")], 120.0)
        .labeled("jvm_gc_collection_seconds_sum", &[("gc", "G1 Young Generation")], 3.456)
        .labeled("jvm_gc_collection_seconds_count", &[("gc", "G1 Concurrent GC")], 8.0)
        .labeled("jvm_gc_collection_seconds_sum", &[("gc", "G1 Concurrent GC")], 0.5)
        .labeled("jvm_gc_collection_seconds_count", &[("gc", "G1 Old Generation")], 1.0)
        .labeled("jvm_gc_collection_seconds_sum", &[("gc", "G1 Old Generation")], 1.25)
        .sample("jvm_classes_currently_loaded", 18000.0)
        .sample("process_open_fds", 256.0)
        .sample("process_max_fds", 1024.0)
        .sample("process_start_time_seconds", (now_secs - 3600) as f64)
        .build()
}

/// Corps de `full_server_body` calé sur l'horloge courante
pub fn full_server_body_now() -> String {
    full_server_body(chrono::Utc::now().timestamp())
}
