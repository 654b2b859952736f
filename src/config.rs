//! Runtime configuration read from environment variables.
//!
//! | Variable                     | Default                                  |
//! |------------------------------|------------------------------------------|
//! | `ROOTFS_MOUNT_PATH`          | `/`                                      |
//! | `CONTAINER_HINTS_PATH`       | `/etc/raw-monitor/container_hints.json`  |
//! | `RAW_CONTAINER_NAME`         | `/`                                      |
//! | `HOUSEKEEPING_INTERVAL_SECS` | `1`                                      |

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::container::{self, ContainerReference};

const DEFAULT_ROOTFS: &str = "/";
const DEFAULT_HINTS_PATH: &str = "/etc/raw-monitor/container_hints.json";
const DEFAULT_HOUSEKEEPING_INTERVAL_SECS: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{key}` is not valid unicode")]
    NotUnicode { key: &'static str },
    #[error("invalid `RAW_CONTAINER_NAME`: {0}")]
    ContainerName(#[from] container::Error),
    #[error("invalid `HOUSEKEEPING_INTERVAL_SECS` `{value}`: expected a positive number of seconds")]
    HousekeepingInterval { value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host root filesystem; `/proc`, `/sys` and cgroup mounts are resolved below it.
    pub rootfs: PathBuf,
    pub hints_path: PathBuf,
    /// Container to monitor.
    pub container_name: ContainerReference,
    /// Interval between stats samples.
    pub housekeeping_interval: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let rootfs = lookup("ROOTFS_MOUNT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOTFS));
        let hints_path = lookup("CONTAINER_HINTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HINTS_PATH));

        let container_name = match string_var(&lookup, "RAW_CONTAINER_NAME")? {
            Some(name) => ContainerReference::new(name)?,
            None => ContainerReference::root(),
        };

        let housekeeping_interval = match string_var(&lookup, "HOUSEKEEPING_INTERVAL_SECS")? {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(Error::HousekeepingInterval { value }),
            },
            None => Duration::from_secs(DEFAULT_HOUSEKEEPING_INTERVAL_SECS),
        };

        Ok(Self {
            rootfs,
            hints_path,
            container_name,
            housekeeping_interval,
        })
    }
}

fn string_var(
    lookup: &impl Fn(&str) -> Option<OsString>,
    key: &'static str,
) -> Result<Option<String>> {
    lookup(key)
        .map(|value| value.into_string().map_err(|_| Error::NotUnicode { key }))
        .transpose()
}
