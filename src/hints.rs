//! Container hints: out-of-band information about raw containers that can't
//! be derived from the cgroup tree, such as the veth pair connecting a
//! container to the host or host directories mounted into it.
//!
//! Hints are read from a JSON file of the form
//!
//! ```json
//! {
//!   "all_hosts": [
//!     {
//!       "full_path": "/docker/abc",
//!       "network_interface": { "VethHost": "veth0", "VethChild": "eth0" },
//!       "mounts": [{ "host_dir": "/data", "container_dir": "/var/lib/data" }]
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileRead(#[from] fsutil::FileReadError),
    #[error("failed to parse container hints `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The veth pair linking a container's network namespace to the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkInterface {
    /// Host side of the pair.
    #[serde(rename = "VethHost")]
    pub veth_host: String,
    /// Container side of the pair.
    #[serde(rename = "VethChild")]
    pub veth_child: String,
}

/// A host directory mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mount {
    pub host_dir: PathBuf,
    pub container_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerHint {
    pub full_path: String,
    #[serde(default)]
    pub network_interface: Option<NetworkInterface>,
    #[serde(default)]
    pub mounts: Vec<Mount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerHints {
    #[serde(default)]
    pub all_hosts: Vec<ContainerHint>,
}

impl ContainerHints {
    /// Loads hints from `path`.
    ///
    /// A missing file yields empty hints.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but can't be read or isn't valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let Some(contents) = fsutil::read_trimmed(path)? else {
            log::debug!("No container hints at `{}`", path.display());
            return Ok(Self::default());
        };

        serde_json::from_str(&contents).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the hint for the container with the given logical name.
    pub fn find(&self, name: &str) -> Option<&ContainerHint> {
        self.all_hosts.iter().find(|hint| hint.full_path == name)
    }
}
