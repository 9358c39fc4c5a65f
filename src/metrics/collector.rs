use std::time::{Instant, SystemTime};

use sysinfo::{
    Disks, Networks, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users,
};

use super::platform;
use super::snapshot::{CpuInfo, DiskInfo, MemoryInfo, NetworkInfo, ProcessInfo, Snapshot};
use crate::error::CollectionError;

/// Produces one [`Snapshot`] per call.
///
/// Implementations may keep handles and previous counters between calls
/// but must be safe to call repeatedly at the refresh cadence.
pub trait Collector: Send {
    fn collect(&mut self) -> Result<Snapshot, CollectionError>;
}

impl<F> Collector for F
where
    F: FnMut() -> Result<Snapshot, CollectionError> + Send,
{
    fn collect(&mut self) -> Result<Snapshot, CollectionError> {
        self()
    }
}

/// Cross-platform collector backed by sysinfo, with per-OS extras from
/// [`platform`].
pub struct SysinfoCollector {
    sys: System,
    networks: Networks,
    disks: Disks,
    users: Users,
    last_refresh: Instant,
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCollector {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );
        SysinfoCollector {
            sys,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            users: Users::new_with_refreshed_list(),
            last_refresh: Instant::now(),
        }
    }

    fn refresh(&mut self) -> f64 {
        let _refresh_span = tracing::debug_span!("collector.refresh").entered();

        self.sys.refresh_memory();
        self.sys.refresh_cpu_all();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cpu()
                .with_disk_usage()
                .with_cmd(UpdateKind::OnlyIfNotSet)
                .with_user(UpdateKind::OnlyIfNotSet),
        );
        if self.has_unknown_users() {
            self.users.refresh();
        }
        self.networks.refresh(true);
        self.disks.refresh(true);

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refresh).as_secs_f64();
        self.last_refresh = now;
        elapsed
    }

    /// Whether some process runs as a uid missing from the cached user list.
    fn has_unknown_users(&self) -> bool {
        self.sys
            .processes()
            .values()
            .filter_map(|p| p.user_id())
            .any(|uid| self.users.get_user_by_id(uid).is_none())
    }

    fn build_processes(&self) -> Vec<ProcessInfo> {
        let pids: Vec<u32> = self.sys.processes().keys().map(|pid| pid.as_u32()).collect();
        let details = platform::process_details(&pids);

        self.sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                let pid = pid.as_u32();
                let command = process
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                let user = process.user_id().map(|uid| {
                    self.users
                        .get_user_by_id(uid)
                        .map(|u| u.name().to_string())
                        .unwrap_or_else(|| format!("{uid:?}"))
                });
                let disk = process.disk_usage();
                let extra = details.get(&pid).copied().unwrap_or_default();

                ProcessInfo {
                    pid,
                    ppid: process.parent().map(|p| p.as_u32()).unwrap_or(0),
                    name: process.name().to_string_lossy().to_string(),
                    command,
                    cpu_percent: process.cpu_usage(),
                    memory_bytes: process.memory(),
                    virtual_memory_bytes: process.virtual_memory(),
                    thread_count: extra.threads,
                    status: process.status().to_string(),
                    start_time: process.start_time(),
                    user,
                    priority: extra.priority,
                    disk_read_bytes: disk.read_bytes,
                    disk_written_bytes: disk.written_bytes,
                }
            })
            .collect()
    }

    fn build_networks(&self, elapsed_secs: f64) -> Vec<NetworkInfo> {
        let mut networks: Vec<NetworkInfo> = self
            .networks
            .iter()
            .map(|(name, data)| NetworkInfo {
                interface: name.clone(),
                bytes_sent: data.total_transmitted(),
                bytes_received: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_received: data.total_packets_received(),
                send_rate_bps: per_second(data.transmitted(), elapsed_secs),
                receive_rate_bps: per_second(data.received(), elapsed_secs),
                addresses: data
                    .ip_networks()
                    .iter()
                    .map(|ip| ip.addr.to_string())
                    .collect(),
            })
            .collect();
        networks.sort_by(|a, b| a.interface.cmp(&b.interface));
        networks
    }

    fn build_disks(&self, elapsed_secs: f64) -> Vec<DiskInfo> {
        self.disks
            .list()
            .iter()
            .map(|disk| {
                let usage = disk.usage();
                DiskInfo {
                    name: disk.name().to_string_lossy().to_string(),
                    mount_point: disk.mount_point().display().to_string(),
                    file_system: disk.file_system().to_string_lossy().to_string(),
                    total_space: disk.total_space(),
                    available_space: disk.available_space(),
                    is_removable: disk.is_removable(),
                    read_rate_bps: per_second(usage.read_bytes, elapsed_secs),
                    write_rate_bps: per_second(usage.written_bytes, elapsed_secs),
                }
            })
            .collect()
    }

    fn build_snapshot(&self, elapsed_secs: f64) -> Snapshot {
        let _snapshot_span = tracing::debug_span!("collector.build_snapshot").entered();

        let processes = self.build_processes();
        let total_threads: u32 = processes.iter().filter_map(|p| p.thread_count).sum();
        let cpus = self.sys.cpus();

        Snapshot {
            timestamp: SystemTime::now(),
            memory: MemoryInfo {
                total: self.sys.total_memory(),
                used: self.sys.used_memory(),
                available: self.sys.available_memory(),
                swap_total: self.sys.total_swap(),
                swap_used: self.sys.used_swap(),
            },
            cpu: CpuInfo {
                brand: cpus.first().map(|c| c.brand().to_string()).unwrap_or_default(),
                logical_cores: cpus.len(),
                usage_percent: self.sys.global_cpu_usage(),
                per_core_usage: cpus.iter().map(|c| c.cpu_usage()).collect(),
                frequency_mhz: cpus.first().map(|c| c.frequency()).unwrap_or(0),
            },
            networks: self.build_networks(elapsed_secs),
            disks: self.build_disks(elapsed_secs),
            uptime_seconds: System::uptime(),
            total_processes: processes.len() as u32,
            total_threads,
            processes,
        }
    }
}

impl Collector for SysinfoCollector {
    fn collect(&mut self) -> Result<Snapshot, CollectionError> {
        let elapsed = self.refresh();
        let snapshot = self.build_snapshot(elapsed);
        if snapshot.processes.is_empty() {
            return Err(CollectionError::Failed(
                "process enumeration returned no entries".to_string(),
            ));
        }
        Ok(snapshot)
    }
}

fn per_second(delta: u64, elapsed_secs: f64) -> u64 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    (delta as f64 / elapsed_secs) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_delta_over_elapsed() {
        assert_eq!(per_second(1_000, 2.0), 500);
        assert_eq!(per_second(1_000, 0.0), 0);
    }

    #[test]
    fn closures_are_collectors() {
        let mut calls = 0;
        let mut collector = move || -> Result<Snapshot, CollectionError> {
            calls += 1;
            Ok(Snapshot {
                total_processes: calls,
                ..Snapshot::default()
            })
        };
        assert_eq!(Collector::collect(&mut collector).unwrap().total_processes, 1);
        assert_eq!(Collector::collect(&mut collector).unwrap().total_processes, 2);
    }

    #[cfg(unix)]
    #[test]
    fn processes_started_later_get_command_and_user() {
        let mut collector = SysinfoCollector::new();
        let mut child = std::process::Command::new("sleep")
            .arg("5")
            .spawn()
            .unwrap();
        let snapshot = collector.collect();
        let _ = child.kill();
        let _ = child.wait();

        let snapshot = snapshot.unwrap();
        let spawned = snapshot
            .processes
            .iter()
            .find(|p| p.pid == child.id())
            .unwrap();
        assert!(spawned.command.contains("sleep"), "command: {:?}", spawned.command);
        assert!(spawned.user.is_some());
    }

    #[test]
    fn sysinfo_collector_sees_current_process() {
        let mut collector = SysinfoCollector::new();
        let snapshot = collector.collect().unwrap();
        let me = std::process::id();
        assert!(snapshot.processes.iter().any(|p| p.pid == me));
        assert_eq!(snapshot.total_processes as usize, snapshot.processes.len());
        assert!(snapshot.memory.total > 0);
        assert!(!snapshot.is_empty());
    }
}
