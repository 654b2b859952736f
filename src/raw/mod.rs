//! Handler for raw containers: plain cgroups not managed by a known runtime.
//!
//! A [`RawContainerHandler`] is bound to one logical container name. It
//! resolves the container's directory in every mounted cgroup hierarchy once
//! at construction and serves spec, stats and listing queries from those
//! directories. Subcontainer creation and deletion can be observed live with
//! [`RawContainerHandler::watch_subcontainers`].
//!
//! # Example
//!
//! ```no_run
//! use raw_monitor::config::Config;
//! use raw_monitor::container::{ContainerReference, ListType};
//! use raw_monitor::raw::RawFactory;
//!
//! let factory = RawFactory::from_config(&Config::from_env()?)?;
//! let handler = factory.new_handler(ContainerReference::root());
//! for child in handler.list_containers(ListType::SelfOnly)? {
//!     println!("{child}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod factory;
mod list;
mod spec;
mod stats;
pub mod watcher;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

pub use error::{Error, Result};
pub use factory::{Collaborators, RawFactory};
pub use watcher::SubcontainerWatcher;

use crate::cgroup::CgroupSubsystems;
use crate::container::{ContainerReference, SubcontainerEvent};
use crate::hints::{ContainerHint, Mount, NetworkInterface};

pub struct RawContainerHandler {
    reference: ContainerReference,
    /// Subsystem name to the container's directory in that hierarchy.
    cgroup_paths: HashMap<String, PathBuf>,
    /// Whether the container is described by a container hint.
    hinted: bool,
    network: Option<NetworkInterface>,
    external_mounts: Vec<Mount>,
    collaborators: Collaborators,
    watcher: SubcontainerWatcher,
}

impl RawContainerHandler {
    /// Creates the handler of `reference`.
    ///
    /// Network linkage and external mounts are taken from `hint`. A hinted
    /// container always reports network capability.
    pub fn new(
        reference: ContainerReference,
        subsystems: Arc<CgroupSubsystems>,
        collaborators: Collaborators,
        hint: Option<&ContainerHint>,
    ) -> Self {
        let cgroup_paths = subsystems.resolve(reference.name());
        let watcher = SubcontainerWatcher::new(
            reference.clone(),
            subsystems,
            cgroup_paths.values().cloned(),
        );

        Self {
            reference,
            cgroup_paths,
            hinted: hint.is_some(),
            network: hint.and_then(|hint| hint.network_interface.clone()),
            external_mounts: hint.map(|hint| hint.mounts.clone()).unwrap_or_default(),
            collaborators,
            watcher,
        }
    }

    pub fn container_reference(&self) -> &ContainerReference {
        &self.reference
    }

    /// Returns `true` while the container's directory exists in any hierarchy.
    pub fn exists(&self) -> bool {
        self.cgroup_paths.values().any(|path| path.exists())
    }

    /// Returns the container's directory in the hierarchy of `subsystem`.
    pub fn cgroup_path(&self, subsystem: &str) -> Result<&Path> {
        self.cgroup_paths
            .get(subsystem)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::SubsystemNotFound {
                subsystem: subsystem.to_owned(),
                name: self.reference.to_string(),
            })
    }

    pub fn cgroup_paths(&self) -> &HashMap<String, PathBuf> {
        &self.cgroup_paths
    }

    pub fn list_processes(&self) -> Result<Vec<u32>> {
        self.collaborators
            .processes
            .list_processes(&self.cgroup_paths)
            .map_err(|source| Error::ListProcesses {
                name: self.reference.to_string(),
                source,
            })
    }

    /// Thread listing isn't supported for raw containers.
    pub fn list_threads(&self) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }

    /// Starts pushing subcontainer events onto `events`.
    ///
    /// # Errors
    ///
    /// Fails if watching was started before or the watches can't be installed.
    pub async fn watch_subcontainers(
        &mut self,
        events: mpsc::Sender<SubcontainerEvent>,
    ) -> Result<()> {
        Ok(self.watcher.watch(events).await?)
    }

    /// Stops the event stream started by [`Self::watch_subcontainers`].
    ///
    /// # Errors
    ///
    /// Fails if watching was never started or releasing the watches fails.
    pub async fn stop_watching_subcontainers(&mut self) -> Result<()> {
        Ok(self.watcher.stop().await?)
    }

    fn is_root(&self) -> bool {
        self.reference.is_root()
    }

    /// The container's directory of `subsystem`, if it exists.
    fn existing_path(&self, subsystem: &str) -> Option<&Path> {
        self.cgroup_paths
            .get(subsystem)
            .map(PathBuf::as_path)
            .filter(|path| path.exists())
    }
}

impl std::fmt::Debug for RawContainerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawContainerHandler")
            .field("reference", &self.reference)
            .field("cgroup_paths", &self.cgroup_paths)
            .field("hinted", &self.hinted)
            .field("network", &self.network)
            .field("external_mounts", &self.external_mounts)
            .field("watching", &self.watcher.is_active())
            .finish()
    }
}
