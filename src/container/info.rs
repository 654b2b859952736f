//! Snapshots describing a container: its capabilities and limits
//! ([`ContainerSpec`]) and its resource usage at one point in time
//! ([`ContainerStats`]).

use crate::cgroup::stats::{BlkioStat, NetworkStat};
use crate::fsinfo::{DiskStats, Fs};

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct CpuSpec {
    /// Relative weight from `cpu.shares`.
    pub limit: u64,
    /// CPU list from `cpuset.cpus`, e.g. `0-3`.
    pub mask: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemorySpec {
    /// Bytes, from `memory.limit_in_bytes`.
    pub limit: u64,
    /// Memory plus swap bytes, from `memory.memsw.limit_in_bytes`.
    pub swap_limit: u64,
}

/// Capabilities and limits of a container.
///
/// A `has_*` flag is set only when the matching subsystem directory exists.
/// Limit fields stay zero when their file is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ContainerSpec {
    pub has_cpu: bool,
    pub cpu: CpuSpec,
    pub has_memory: bool,
    pub memory: MemorySpec,
    pub has_filesystem: bool,
    pub has_network: bool,
    pub has_diskio: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct CpuStats {
    /// Total CPU time in nanoseconds.
    pub total: u64,
    /// Per-CPU time in nanoseconds.
    pub per_cpu: Vec<u64>,
    /// User time in `USER_HZ` ticks.
    pub user: u64,
    /// System time in `USER_HZ` ticks.
    pub system: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemoryStats {
    pub usage: u64,
    pub max_usage: u64,
    /// Usage minus inactive file-backed pages.
    pub working_set: u64,
    pub cache: u64,
    pub rss: u64,
    pub swap: u64,
    pub pgfault: u64,
    pub pgmajfault: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct DiskIoStats {
    /// Bytes transferred, from `blkio.io_service_bytes`.
    pub service_bytes: BlkioStat,
    /// Operations issued, from `blkio.io_serviced`.
    pub serviced: BlkioStat,
}

/// Capacity and I/O counters of one filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct FsStats {
    pub device: String,
    /// Capacity in bytes.
    pub limit: u64,
    /// Used bytes.
    pub usage: u64,
    #[serde(flatten)]
    pub disk: DiskStats,
}

impl From<&Fs> for FsStats {
    fn from(fs: &Fs) -> Self {
        Self {
            device: fs.device.clone(),
            limit: fs.capacity,
            usage: fs.capacity.saturating_sub(fs.free),
            disk: fs.disk_stats.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ContainerStats {
    /// Collection time in milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub diskio: DiskIoStats,
    /// Counters of a single network interface.
    pub network: Option<NetworkStat>,
    pub filesystem: Vec<FsStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_stats_from_fs() {
        let fs = Fs {
            device: "/dev/sda1".to_string(),
            capacity: 1000,
            free: 400,
            ..Default::default()
        };
        let stats = FsStats::from(&fs);
        assert_eq!(stats.device, "/dev/sda1");
        assert_eq!(stats.limit, 1000);
        assert_eq!(stats.usage, 600);
    }

    #[test]
    fn test_fs_stats_usage_saturates() {
        let fs = Fs {
            capacity: 10,
            free: 20,
            ..Default::default()
        };
        assert_eq!(FsStats::from(&fs).usage, 0);
    }
}
