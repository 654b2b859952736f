use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::stats::{
    BlkioStat, CpuAcctStat, CpuUsage, KeyValueStat, MemoryStat, MemoryUsage, PerCpuUsage,
    SingleLineStat,
};
use crate::container::ContainerStats;
use crate::fsutil;
use crate::hints::NetworkInterface;
use crate::network::{NetworkStatsProvider, ProcNetDev};

/// Collects cgroup resource counters for a container.
pub trait CgroupStatsCollector: Send + Sync {
    /// Reads counters from the container's subsystem directories.
    ///
    /// `paths` maps subsystem names to the container's cgroup directories.
    /// With a `network` linkage the counters of the host side of the veth
    /// pair are reported from the container's point of view.
    fn collect(
        &self,
        paths: &HashMap<String, PathBuf>,
        network: Option<&NetworkInterface>,
    ) -> io::Result<ContainerStats>;
}

/// [`CgroupStatsCollector`] reading cgroup v1 accounting files.
///
/// Missing subsystems and missing files leave their counters at zero.
/// Malformed files are errors.
#[derive(Debug, Clone)]
pub struct CgroupFsCollector {
    network: ProcNetDev,
}

impl CgroupFsCollector {
    /// Creates a collector reading interface counters from `net_dev`,
    /// usually `/proc/net/dev` of the host.
    pub fn new(net_dev: impl Into<PathBuf>) -> Self {
        Self {
            network: ProcNetDev::new(net_dev),
        }
    }
}

impl CgroupStatsCollector for CgroupFsCollector {
    fn collect(
        &self,
        paths: &HashMap<String, PathBuf>,
        network: Option<&NetworkInterface>,
    ) -> io::Result<ContainerStats> {
        let mut stats = ContainerStats {
            timestamp: now_millis()?,
            ..Default::default()
        };

        if let Some(dir) = paths.get("cpuacct") {
            if let Some(usage) = read_stat(dir, "cpuacct.usage", CpuUsage::from_reader)? {
                stats.cpu.total = usage.total_ns;
            }
            if let Some(usage) = read_stat(dir, "cpuacct.usage_percpu", PerCpuUsage::from_reader)? {
                stats.cpu.per_cpu = usage.per_cpu_ns;
            }
            if let Some(stat) = read_stat(dir, "cpuacct.stat", CpuAcctStat::from_reader)? {
                stats.cpu.user = stat.user;
                stats.cpu.system = stat.system;
            }
        }

        if let Some(dir) = paths.get("memory") {
            if let Some(usage) = read_stat(dir, "memory.usage_in_bytes", MemoryUsage::from_reader)? {
                stats.memory.usage = usage.usage_bytes;
            }
            if let Some(max) = read_stat(dir, "memory.max_usage_in_bytes", MemoryUsage::from_reader)?
            {
                stats.memory.max_usage = max.usage_bytes;
            }
            if let Some(stat) = read_stat(dir, "memory.stat", MemoryStat::from_reader)? {
                stats.memory.working_set =
                    stats.memory.usage.saturating_sub(stat.total_inactive_file);
                stats.memory.cache = stat.cache;
                stats.memory.rss = stat.rss;
                stats.memory.swap = stat.swap;
                stats.memory.pgfault = stat.pgfault;
                stats.memory.pgmajfault = stat.pgmajfault;
            } else {
                stats.memory.working_set = stats.memory.usage;
            }
        }

        if let Some(dir) = paths.get("blkio") {
            if let Some(bytes) = read_stat(dir, "blkio.io_service_bytes", BlkioStat::from_reader)? {
                stats.diskio.service_bytes = bytes;
            }
            if let Some(ops) = read_stat(dir, "blkio.io_serviced", BlkioStat::from_reader)? {
                stats.diskio.serviced = ops;
            }
        }

        if let Some(interface) = network {
            stats.network = Some(self.network.network_stats(&interface.veth_host)?.swapped());
        }

        Ok(stats)
    }
}

/// Parses `<dir>/<file>` if it exists.
///
/// Errors carry the path of the offending file and keep their kind.
fn read_stat<T>(
    dir: &Path,
    file: &str,
    parse: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> io::Result<Option<T>> {
    let path = dir.join(file);
    let with_path = |err: io::Error| io::Error::new(err.kind(), format!("`{}`: {err}", path.display()));

    match fsutil::open_optional_reader(&path).map_err(with_path)? {
        Some(mut reader) => parse(&mut reader).map(Some).map_err(with_path),
        None => Ok(None),
    }
}

fn now_millis() -> io::Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(io::Error::other)?;
    Ok(elapsed.as_millis() as u64)
}
