//! Parsers for cgroup v1 accounting files and `/proc/net/dev`.
//!
//! Each submodule turns one kind of kernel file into a small typed record:
//!
//! - [`CpuAcctStat`], [`CpuUsage`], [`PerCpuUsage`] from the `cpuacct` hierarchy
//! - [`MemoryStat`], [`MemoryUsage`] from the `memory` hierarchy
//! - [`BlkioStat`] from the `blkio` hierarchy
//! - [`NetworkStat`] from `/proc/net/dev`
//!
//! Parse failures surface as [`std::io::Error`]s of kind
//! [`std::io::ErrorKind::InvalidData`] wrapping a [`StatParseError`].

mod blkio;
mod cpu;
pub(crate) mod error;
mod memory;
mod net;
mod parser;

pub use blkio::BlkioStat;
pub use cpu::{CpuAcctStat, CpuUsage, PerCpuUsage};
pub use error::StatParseError;
pub use memory::{MemoryStat, MemoryUsage};
pub use net::NetworkStat;
pub use parser::{KeyValueStat, SingleLineStat};
