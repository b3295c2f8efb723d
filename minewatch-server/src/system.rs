//! Host statistics for the machine running the monitor
//!
//! Static facts (cores, CPU model, memory, uptime) come from `sysinfo`.
//! CPU load and root disk usage are sampled through `top` and `df` on Linux;
//! a failing command is logged and its fields fall back to zero values so the
//! rest of the snapshot is still served.

use crate::units::{fixed2, format_gib};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use sysinfo::System;
use tokio::process::Command as AsyncCommand;
use tokio::task::JoinError;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    pub cpu: CpuInfo,
    pub memory: HostMemory,
    pub disk: DiskUsage,
    /// Host uptime in seconds.
    pub uptime: u64,
    pub platform: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuInfo {
    pub cores: usize,
    pub model: String,
    /// Percent busy, two decimals.
    pub usage: String,
    pub usage_source: UsageSource,
}

/// Where `cpu.usage` came from, so a dashboard can tell a measurement from
/// an estimate or a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    /// Sampled from `top` (Linux).
    Top,
    /// sysinfo's own counters, used where `top` is not sampled.
    Estimated,
    /// Sampling failed, usage reported as 0.
    Unavailable,
}

/// GiB, two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct HostMemory {
    pub total: String,
    pub used: String,
    pub free: String,
    pub percent: String,
}

/// Root filesystem usage, sizes as `df -h` prints them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total: String,
    pub used: String,
    pub free: String,
    pub percent: f64,
}

impl Default for DiskUsage {
    fn default() -> Self {
        Self {
            total: "0G".into(),
            used: "0G".into(),
            free: "0G".into(),
            percent: 0.0,
        }
    }
}

/// Facts read from sysinfo on a blocking thread.
struct HostFacts {
    cores: usize,
    model: String,
    total_bytes: u64,
    available_bytes: u64,
    uptime: u64,
    estimated_cpu: Option<f32>,
}

impl HostFacts {
    fn read(estimate_cpu: bool) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();

        let estimated_cpu = if estimate_cpu {
            // usage is a delta between two refreshes
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_cpu_usage();
            Some(sys.global_cpu_info().cpu_usage())
        } else {
            None
        };

        let cpus = sys.cpus();
        HostFacts {
            cores: cpus.len(),
            model: cpus
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            total_bytes: sys.total_memory(),
            available_bytes: sys.available_memory(),
            uptime: System::uptime(),
            estimated_cpu,
        }
    }
}

impl HostMemory {
    fn from_bytes(total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        let percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        HostMemory {
            total: format_gib(total as f64),
            used: format_gib(used as f64),
            free: format_gib(available as f64),
            percent: fixed2(percent),
        }
    }
}

impl HostSnapshot {
    /// Collect a fresh snapshot. Sampling failures are contained; the only
    /// error is the sysinfo blocking task itself failing to join.
    pub async fn collect() -> Result<Self, JoinError> {
        let on_linux = cfg!(target_os = "linux");

        let facts = tokio::task::spawn_blocking(move || HostFacts::read(!on_linux));
        let (facts, cpu_sample, disk) = tokio::join!(facts, sample_cpu(on_linux), sample_disk(on_linux));
        let facts = facts?;

        let (usage, usage_source) = match (cpu_sample, facts.estimated_cpu) {
            (Some(percent), _) => (percent, UsageSource::Top),
            (None, Some(estimate)) => (f64::from(estimate), UsageSource::Estimated),
            (None, None) => (0.0, UsageSource::Unavailable),
        };

        Ok(HostSnapshot {
            cpu: CpuInfo {
                cores: facts.cores,
                model: facts.model,
                usage: fixed2(usage),
                usage_source,
            },
            memory: HostMemory::from_bytes(facts.total_bytes, facts.available_bytes),
            disk,
            uptime: facts.uptime,
            platform: std::env::consts::OS.to_string(),
            hostname: gethostname::gethostname().to_string_lossy().to_string(),
        })
    }
}

async fn sample_cpu(on_linux: bool) -> Option<f64> {
    if !on_linux {
        return None;
    }
    match cpu_usage_from_top().await {
        Ok(percent) => Some(percent),
        Err(e) => {
            warn!("error getting CPU usage: {e:#}");
            None
        }
    }
}

async fn sample_disk(on_linux: bool) -> DiskUsage {
    if !on_linux {
        return DiskUsage::default();
    }
    match disk_usage_from_df().await {
        Ok(disk) => disk,
        Err(e) => {
            warn!("error getting disk usage: {e:#}");
            DiskUsage::default()
        }
    }
}

async fn run_command(program: &str, args: &[&str]) -> Result<String> {
    debug!("sampling via {program} {}", args.join(" "));
    let output = AsyncCommand::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run {program}"))?;

    if !output.status.success() {
        bail!("{program} exited with {}", output.status);
    }
    String::from_utf8(output.stdout).with_context(|| format!("{program} printed non UTF-8 output"))
}

async fn cpu_usage_from_top() -> Result<f64> {
    let stdout = run_command("top", &["-bn1"]).await?;
    parse_top_cpu_usage(&stdout).ok_or_else(|| anyhow!("no Cpu(s) idle figure in top output"))
}

async fn disk_usage_from_df() -> Result<DiskUsage> {
    // -P keeps each filesystem on one line
    let stdout = run_command("df", &["-hP", "/"]).await?;
    parse_df_root(&stdout).ok_or_else(|| anyhow!("unexpected df output"))
}

/// Busy percent (`100 - idle`) from the `Cpu(s)` summary line of `top -bn1`.
///
/// Handles both `95.6 id` and the older `95.6%id` layouts.
pub fn parse_top_cpu_usage(output: &str) -> Option<f64> {
    let line = output.lines().find(|l| l.contains("Cpu(s)"))?;
    let summary = line.split_once(':').map_or(line, |(_, rest)| rest);

    summary.split(',').find_map(|field| {
        let figure = field.trim().strip_suffix("id")?;
        let idle: f64 = figure.trim().trim_end_matches('%').trim().parse().ok()?;
        Some(100.0 - idle)
    })
}

/// Size/used/avail/use% of the last line of `df -h` output.
pub fn parse_df_root(output: &str) -> Option<DiskUsage> {
    let last = output.lines().rev().find(|l| !l.trim().is_empty())?;
    let fields: Vec<&str> = last.split_whitespace().collect();
    if fields.len() < 2 || fields[0] == "Filesystem" {
        return None;
    }

    let field = |i: usize| fields.get(i).map_or_else(|| "0G".to_string(), |s| s.to_string());
    let percent = fields
        .get(4)
        .and_then(|p| p.trim_end_matches('%').parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(DiskUsage {
        total: field(1),
        used: field(2),
        free: field(3),
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP_PROCPS: &str = "\
top - 10:15:32 up 3 days,  2:11,  1 user,  load average: 0.15, 0.20, 0.18
Tasks: 212 total,   1 running, 211 sleeping,   0 stopped,   0 zombie
%Cpu(s):  3.1 us,  1.0 sy,  0.0 ni, 95.6 id,  0.2 wa,  0.0 hi,  0.1 si,  0.0 st
MiB Mem :  15882.4 total,   8123.0 free,   4210.7 used,   3548.7 buff/cache
";

    const TOP_LEGACY: &str = "\
Cpu(s): 12.5%us,  2.5%sy,  0.0%ni, 85.0%id,  0.0%wa,  0.0%hi,  0.0%si,  0.0%st
";

    #[test]
    fn test_parse_top_procps() {
        let usage = parse_top_cpu_usage(TOP_PROCPS).unwrap();
        assert!((usage - 4.4).abs() < 1e-9);
    }

    #[test]
    fn test_parse_top_legacy_layout() {
        let usage = parse_top_cpu_usage(TOP_LEGACY).unwrap();
        assert!((usage - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_top_without_cpu_line() {
        assert_eq!(parse_top_cpu_usage("Tasks: 1 total\n"), None);
        assert_eq!(parse_top_cpu_usage("%Cpu(s): garbage\n"), None);
    }

    #[test]
    fn test_parse_df_root() {
        let output = "\
Filesystem      Size  Used Avail Use% Mounted on
/dev/nvme0n1p2  468G  201G  244G  46% /
";
        assert_eq!(
            parse_df_root(output),
            Some(DiskUsage {
                total: "468G".into(),
                used: "201G".into(),
                free: "244G".into(),
                percent: 46.0,
            })
        );
    }

    #[test]
    fn test_parse_df_short_line_uses_defaults() {
        let disk = parse_df_root("overlay 20G\n").unwrap();
        assert_eq!(disk.total, "20G");
        assert_eq!(disk.used, "0G");
        assert_eq!(disk.free, "0G");
        assert_eq!(disk.percent, 0.0);
    }

    #[test]
    fn test_parse_df_header_only() {
        assert_eq!(parse_df_root("Filesystem Size Used Avail Use% Mounted on\n"), None);
        assert_eq!(parse_df_root(""), None);
    }

    #[test]
    fn test_host_memory_from_bytes() {
        let mem = HostMemory::from_bytes(17179869184, 4294967296);
        assert_eq!(mem.total, "16.00");
        assert_eq!(mem.used, "12.00");
        assert_eq!(mem.free, "4.00");
        assert_eq!(mem.percent, "75.00");

        assert_eq!(HostMemory::from_bytes(0, 0).percent, "0.00");
    }

    #[test]
    fn test_usage_source_json() {
        assert_eq!(
            serde_json::to_value(UsageSource::Unavailable).unwrap(),
            serde_json::json!("unavailable")
        );
    }

    #[tokio::test]
    async fn test_collect_host_snapshot() {
        let snapshot = HostSnapshot::collect().await.unwrap();
        assert!(snapshot.cpu.cores > 0);
        assert_eq!(snapshot.platform, std::env::consts::OS);
        assert!(snapshot.memory.total.parse::<f64>().unwrap() > 0.0);
        assert_eq!(snapshot.cpu.usage.split('.').nth(1).map(str::len), Some(2));
    }
}
