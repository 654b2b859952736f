use std::sync::Arc;

use crate::cgroup::{
    CgroupFsCollector, CgroupProcs, CgroupStatsCollector, CgroupSubsystems, ProcessLister,
};
use crate::config::Config;
use crate::container::ContainerReference;
use crate::fsinfo::{FsInfo, HostFsInfo};
use crate::hints::ContainerHints;
use crate::machine::{HostMachineInfo, MachineInfoProvider};
use crate::mountinfo;
use crate::network::{NetworkStatsProvider, ProcNetDev};

use super::{RawContainerHandler, Result};

/// The host services a handler reads from.
#[derive(Clone)]
pub struct Collaborators {
    pub machine: Arc<dyn MachineInfoProvider>,
    pub fs_info: Arc<dyn FsInfo>,
    pub network: Arc<dyn NetworkStatsProvider>,
    pub collector: Arc<dyn CgroupStatsCollector>,
    pub processes: Arc<dyn ProcessLister>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Builds [`RawContainerHandler`]s sharing one mount table, one set of
/// collaborators and one set of container hints.
#[derive(Debug, Clone)]
pub struct RawFactory {
    subsystems: Arc<CgroupSubsystems>,
    collaborators: Collaborators,
    hints: Arc<ContainerHints>,
}

impl RawFactory {
    pub fn new(
        subsystems: CgroupSubsystems,
        collaborators: Collaborators,
        hints: ContainerHints,
    ) -> Self {
        Self {
            subsystems: Arc::new(subsystems),
            collaborators,
            hints: Arc::new(hints),
        }
    }

    /// Creates a factory backed by the host below `config.rootfs`.
    ///
    /// # Errors
    ///
    /// Fails if no cgroup v1 hierarchy is mounted, if the host mount table
    /// can't be read or if the container hints are malformed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let rootfs = &config.rootfs;
        let subsystems = mountinfo::detect_cgroup_subsystems(rootfs.join("proc/1/mountinfo"))?
            .rebase(rootfs);
        let hints = ContainerHints::load(&config.hints_path)?;
        let collaborators = Collaborators {
            machine: Arc::new(HostMachineInfo::new(rootfs)),
            fs_info: Arc::new(HostFsInfo::new(rootfs)?),
            network: Arc::new(ProcNetDev::new(rootfs.join("proc/net/dev"))),
            collector: Arc::new(CgroupFsCollector::new(rootfs.join("proc/net/dev"))),
            processes: Arc::new(CgroupProcs),
        };

        Ok(Self::new(subsystems, collaborators, hints))
    }

    pub fn subsystems(&self) -> &CgroupSubsystems {
        &self.subsystems
    }

    /// Creates the handler of the container `name`.
    pub fn new_handler(&self, name: ContainerReference) -> RawContainerHandler {
        let hint = self.hints.find(name.name());
        RawContainerHandler::new(
            name,
            Arc::clone(&self.subsystems),
            self.collaborators.clone(),
            hint,
        )
    }
}
