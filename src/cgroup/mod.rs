//! Cgroup v1 introspection.
//!
//! A container is mirrored as one directory per mounted subsystem hierarchy,
//! e.g. `/sys/fs/cgroup/memory/docker/abc` and `/sys/fs/cgroup/cpu,cpuacct/docker/abc`
//! for the logical name `/docker/abc`.
//!
//! # Key Components
//!
//! - [`CgroupSubsystems`]: the mount table mapping subsystems to hierarchy roots.
//! - [`CgroupStatsCollector`]: reads resource counters from a container's directories.
//! - [`ProcessLister`]: lists the processes attached to a container.
//! - [`stats`]: parsers for the individual accounting files.
//!
//! # Supported Stats
//!
//! The following files are read, if available:
//!
//! - `cpuacct.usage`, `cpuacct.usage_percpu` and `cpuacct.stat`
//! - `memory.usage_in_bytes`, `memory.max_usage_in_bytes` and `memory.stat`
//! - `blkio.io_service_bytes` and `blkio.io_serviced`
//! - `/proc/net/dev` for the host side of a container's veth pair
mod collector;
mod procs;
pub mod stats;
mod subsystems;

pub use collector::{CgroupFsCollector, CgroupStatsCollector};
pub use procs::{CgroupProcs, ProcessLister};
pub use subsystems::{CgroupMount, CgroupSubsystems};
