use std::collections::HashSet;

use crate::container::{ContainerStats, FsStats};
use crate::machine::NetInfo;

use super::{Error, RawContainerHandler, Result};

impl RawContainerHandler {
    /// Samples the container's resource usage.
    ///
    /// Any failing source fails the whole sample.
    pub fn stats(&self) -> Result<ContainerStats> {
        let mut stats = self
            .collaborators
            .collector
            .collect(&self.cgroup_paths, self.network.as_ref())
            .map_err(|source| Error::CollectStats {
                name: self.reference.to_string(),
                source,
            })?;

        stats.filesystem = self.fs_stats()?;

        // Only a single interface is reported.
        if let Some(device) = self.root_network_devices()?.first() {
            let network = self
                .collaborators
                .network
                .network_stats(&device.name)
                .map_err(|source| Error::NetworkStats {
                    device: device.name.clone(),
                    source,
                })?;
            stats.network = Some(network);
        }

        Ok(stats)
    }

    fn fs_stats(&self) -> Result<Vec<FsStats>> {
        let fs_err = |source: std::io::Error| Error::FsInfo {
            name: self.reference.to_string(),
            source,
        };

        let filesystems = if self.is_root() {
            self.collaborators.fs_info.global_fs_info().map_err(fs_err)?
        } else if !self.external_mounts.is_empty() {
            let host_dirs: HashSet<_> = self
                .external_mounts
                .iter()
                .map(|mount| mount.host_dir.clone())
                .collect();
            self.collaborators
                .fs_info
                .fs_info_for_paths(&host_dirs)
                .map_err(fs_err)?
        } else {
            return Ok(Vec::new());
        };

        Ok(filesystems.iter().map(FsStats::from).collect())
    }

    /// Physical network devices attributed to this container.
    ///
    /// Only the root container owns the host's devices.
    fn root_network_devices(&self) -> Result<Vec<NetInfo>> {
        if !self.is_root() {
            return Ok(Vec::new());
        }
        let machine = self
            .collaborators
            .machine
            .machine_info()
            .map_err(Error::MachineInfo)?;
        Ok(machine.network_devices)
    }
}
