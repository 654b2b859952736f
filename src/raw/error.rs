use std::path::PathBuf;

use crate::{container, hints, mountinfo};

use super::watcher;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get machine info: {0}")]
    MachineInfo(#[source] std::io::Error),
    #[error("failed to collect cgroup stats for container `{name}`: {source}")]
    CollectStats {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to get filesystem stats for container `{name}`: {source}")]
    FsInfo {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to get network stats for device `{device}`: {source}")]
    NetworkStats {
        device: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list processes of container `{name}`: {source}")]
    ListProcesses {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory `{path}`: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not find path for subsystem `{subsystem}` for container `{name}`")]
    SubsystemNotFound { subsystem: String, name: String },
    #[error(transparent)]
    InvalidName(#[from] container::Error),
    #[error(transparent)]
    Watch(#[from] watcher::Error),
    #[error(transparent)]
    Mountinfo(#[from] mountinfo::Error),
    #[error(transparent)]
    Hints(#[from] hints::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
