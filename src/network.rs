use std::io;
use std::path::PathBuf;

use crate::cgroup::stats::NetworkStat;
use crate::fsutil;

/// Provides per-interface network counters.
pub trait NetworkStatsProvider: Send + Sync {
    /// Returns the counters of `device`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`io::ErrorKind::NotFound`] if the device is unknown.
    fn network_stats(&self, device: &str) -> io::Result<NetworkStat>;
}

/// [`NetworkStatsProvider`] reading a `/proc/net/dev` formatted file.
#[derive(Debug, Clone)]
pub struct ProcNetDev {
    path: PathBuf,
}

impl ProcNetDev {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NetworkStatsProvider for ProcNetDev {
    fn network_stats(&self, device: &str) -> io::Result<NetworkStat> {
        let mut reader = fsutil::open_file_reader(&self.path)
            .map_err(|err| io::Error::new(err.source.kind(), err))?;
        NetworkStat::for_interface(&mut reader, device)?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "network interface `{device}` not found in `{}`",
                    self.path.display()
                ),
            )
        })
    }
}
