use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub command: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    pub thread_count: Option<u32>,
    pub status: String,
    /// Unix seconds.
    pub start_time: u64,
    pub user: Option<String>,
    pub priority: Option<i32>,
    pub disk_read_bytes: u64,
    pub disk_written_bytes: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

impl MemoryInfo {
    pub fn load_percent(&self) -> f64 {
        ratio_percent(self.used, self.total)
    }

    pub fn swap_percent(&self) -> f64 {
        ratio_percent(self.swap_used, self.swap_total)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CpuInfo {
    pub brand: String,
    pub logical_cores: usize,
    pub usage_percent: f32,
    pub per_core_usage: Vec<f32>,
    pub frequency_mhz: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NetworkInfo {
    pub interface: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub send_rate_bps: u64,
    pub receive_rate_bps: u64,
    pub addresses: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiskInfo {
    pub name: String,
    pub mount_point: String,
    pub file_system: String,
    pub total_space: u64,
    pub available_space: u64,
    pub is_removable: bool,
    pub read_rate_bps: u64,
    pub write_rate_bps: u64,
}

impl DiskInfo {
    pub fn used_space(&self) -> u64 {
        self.total_space.saturating_sub(self.available_space)
    }

    pub fn usage_percent(&self) -> f64 {
        ratio_percent(self.used_space(), self.total_space)
    }
}

/// One immutable capture of every monitored metric category.
///
/// Produced by a [`Collector`](crate::metrics::collector::Collector) and never
/// mutated afterwards; readers always get their own clone.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: SystemTime,
    pub processes: Vec<ProcessInfo>,
    pub memory: MemoryInfo,
    pub cpu: CpuInfo,
    pub networks: Vec<NetworkInfo>,
    pub disks: Vec<DiskInfo>,
    pub uptime_seconds: u64,
    pub total_processes: u32,
    pub total_threads: u32,
}

impl Default for Snapshot {
    /// The empty snapshot, returned by a store that has recorded nothing.
    fn default() -> Self {
        Snapshot {
            timestamp: UNIX_EPOCH,
            processes: Vec::new(),
            memory: MemoryInfo::default(),
            cpu: CpuInfo::default(),
            networks: Vec::new(),
            disks: Vec::new(),
            uptime_seconds: 0,
            total_processes: 0,
            total_threads: 0,
        }
    }
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.timestamp == UNIX_EPOCH && self.processes.is_empty()
    }

    /// Age of this snapshot relative to `now`. Future timestamps have age zero.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.timestamp).unwrap_or_default()
    }

    pub fn total_network_rates(&self) -> (u64, u64) {
        self.networks.iter().fold((0, 0), |(tx, rx), n| {
            (tx + n.send_rate_bps, rx + n.receive_rate_bps)
        })
    }

    pub fn total_disk_rates(&self) -> (u64, u64) {
        self.disks.iter().fold((0, 0), |(r, w), d| {
            (r + d.read_rate_bps, w + d.write_rate_bps)
        })
    }
}

fn ratio_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
    }
}
