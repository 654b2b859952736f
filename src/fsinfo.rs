//! Filesystem capacity and block device I/O counters.
//!
//! [`HostFsInfo`] discovers block-device backed mounts from the host's
//! mountinfo once at construction. Capacity comes from `statvfs(3)` and
//! I/O counters from `/proc/diskstats`, both read on every query.

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use crate::{fsutil, mountinfo};

/// I/O counters of a block device as listed in `/proc/diskstats`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct DiskStats {
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub read_time: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub write_time: u64,
    pub io_in_progress: u64,
    pub io_time: u64,
    pub weighted_io_time: u64,
}

/// A mounted filesystem with its capacity and device counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fs {
    pub device: String,
    pub mount_point: PathBuf,
    pub major: u32,
    pub minor: u32,
    /// Total bytes.
    pub capacity: u64,
    /// Bytes available to unprivileged users.
    pub free: u64,
    pub disk_stats: DiskStats,
}

/// Provides filesystem information for containers.
pub trait FsInfo: Send + Sync {
    /// Returns every block-device backed filesystem of the host.
    fn global_fs_info(&self) -> io::Result<Vec<Fs>>;

    /// Returns the filesystems holding the given host directories.
    ///
    /// Each filesystem is reported once no matter how many paths it holds.
    fn fs_info_for_paths(&self, paths: &HashSet<PathBuf>) -> io::Result<Vec<Fs>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Partition {
    device: String,
    mount_point: PathBuf,
    major: u32,
    minor: u32,
}

/// [`FsInfo`] backed by the host's `/proc` and `statvfs(3)`.
#[derive(Debug, Clone)]
pub struct HostFsInfo {
    rootfs: PathBuf,
    partitions: Vec<Partition>,
}

impl HostFsInfo {
    /// Discovers block-device partitions from `<rootfs>/proc/1/mountinfo`.
    ///
    /// # Errors
    ///
    /// Returns a [`mountinfo::Error`] if the mountinfo file cannot be read or parsed.
    pub fn new(rootfs: impl Into<PathBuf>) -> mountinfo::Result<Self> {
        let rootfs = rootfs.into();
        let path = rootfs.join("proc/1/mountinfo");
        let reader = fsutil::open_file_reader(&path)?;
        let partitions = partitions_from_reader(reader, &path)?;
        log::debug!("Found {} block device partitions", partitions.len());

        Ok(Self { rootfs, partitions })
    }

    fn fs_for(&self, partitions: &[&Partition]) -> io::Result<Vec<Fs>> {
        let disk_stats = self.disk_stats()?;
        partitions
            .iter()
            .map(|partition| {
                let (capacity, free) =
                    capacity_of(&fsutil::rebase_path(&self.rootfs, &partition.mount_point))?;
                Ok(Fs {
                    device: partition.device.clone(),
                    mount_point: partition.mount_point.clone(),
                    major: partition.major,
                    minor: partition.minor,
                    capacity,
                    free,
                    disk_stats: disk_stats
                        .get(&(partition.major, partition.minor))
                        .cloned()
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    fn disk_stats(&self) -> io::Result<HashMap<(u32, u32), DiskStats>> {
        match fsutil::open_optional_reader(self.rootfs.join("proc/diskstats"))? {
            Some(reader) => parse_disk_stats(reader),
            None => Ok(HashMap::new()),
        }
    }
}

impl FsInfo for HostFsInfo {
    fn global_fs_info(&self) -> io::Result<Vec<Fs>> {
        let partitions: Vec<_> = self.partitions.iter().collect();
        self.fs_for(&partitions)
    }

    fn fs_info_for_paths(&self, paths: &HashSet<PathBuf>) -> io::Result<Vec<Fs>> {
        let mut seen = HashSet::new();
        let mut partitions = Vec::new();
        for path in paths {
            match partition_for_path(&self.partitions, path) {
                Some(partition) if seen.insert(&partition.device) => partitions.push(partition),
                Some(_) => {}
                None => log::debug!("No partition holds `{}`", path.display()),
            }
        }
        self.fs_for(&partitions)
    }
}

fn partitions_from_reader<R: BufRead>(
    reader: R,
    origin: &Path,
) -> mountinfo::Result<Vec<Partition>> {
    let mut partitions: Vec<Partition> = Vec::new();
    mountinfo::for_each_mount(reader, origin, |mount_info| {
        if !mount_info.source.starts_with("/dev/") {
            return;
        }
        let Some((major, minor)) = mount_info.device_numbers() else {
            return;
        };
        // A device mounted several times is reported at its first mount point.
        if partitions.iter().any(|p| p.device == mount_info.source) {
            return;
        }
        partitions.push(Partition {
            device: mount_info.source.to_owned(),
            mount_point: PathBuf::from(mount_info.mount_point),
            major,
            minor,
        });
    })?;
    Ok(partitions)
}

/// Picks the partition with the longest mount point containing `path`.
fn partition_for_path<'a>(partitions: &'a [Partition], path: &Path) -> Option<&'a Partition> {
    partitions
        .iter()
        .filter(|partition| path.starts_with(&partition.mount_point))
        .max_by_key(|partition| partition.mount_point.components().count())
}

fn parse_disk_stats<R: BufRead>(reader: R) -> io::Result<HashMap<(u32, u32), DiskStats>> {
    let mut stats = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 {
            continue;
        }
        let (Ok(major), Ok(minor)) = (fields[0].parse(), fields[1].parse()) else {
            continue;
        };
        let value = |i: usize| fields[i].parse::<u64>().unwrap_or(0);
        stats.insert(
            (major, minor),
            DiskStats {
                reads_completed: value(3),
                reads_merged: value(4),
                sectors_read: value(5),
                read_time: value(6),
                writes_completed: value(7),
                writes_merged: value(8),
                sectors_written: value(9),
                write_time: value(10),
                io_in_progress: value(11),
                io_time: value(12),
                weighted_io_time: value(13),
            },
        );
    }
    Ok(stats)
}

fn capacity_of(path: &Path) -> io::Result<(u64, u64)> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
    let fragment_size = stat.fragment_size() as u64;
    Ok((
        stat.blocks() as u64 * fragment_size,
        stat.blocks_available() as u64 * fragment_size,
    ))
}
