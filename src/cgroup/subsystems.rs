use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::fsutil;

/// A single mounted cgroup v1 hierarchy and the subsystems attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupMount {
    /// Absolute mount point of the hierarchy, e.g. `/sys/fs/cgroup/cpu,cpuacct`.
    pub mount_point: PathBuf,
    /// Subsystems attached to the hierarchy, e.g. `["cpu", "cpuacct"]`.
    pub subsystems: Vec<String>,
}

/// The cgroup mount table of the host.
///
/// Holds every cgroup mount together with a lookup from subsystem name to the
/// root directory of the hierarchy that subsystem is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgroupSubsystems {
    mounts: Vec<CgroupMount>,
    mount_points: HashMap<String, PathBuf>,
}

impl CgroupSubsystems {
    /// Builds the mount table from a list of mounts.
    ///
    /// If a subsystem shows up in several mounts the first one wins.
    pub fn new(mounts: Vec<CgroupMount>) -> Self {
        let mut mount_points = HashMap::new();
        for mount in &mounts {
            for subsystem in &mount.subsystems {
                mount_points
                    .entry(subsystem.clone())
                    .or_insert_with(|| mount.mount_point.clone());
            }
        }

        Self {
            mounts,
            mount_points,
        }
    }

    /// Returns all known cgroup mounts.
    pub fn mounts(&self) -> &[CgroupMount] {
        &self.mounts
    }

    /// Returns the subsystem name to mount root mapping.
    pub fn mount_points(&self) -> &HashMap<String, PathBuf> {
        &self.mount_points
    }

    /// Re-roots all mount points below `rootfs`.
    ///
    /// Used when the monitor runs inside a container with the host root
    /// filesystem mounted at `rootfs`.
    pub fn rebase(self, rootfs: impl AsRef<Path>) -> Self {
        let rootfs = rootfs.as_ref();
        let mounts = self
            .mounts
            .into_iter()
            .map(|mount| CgroupMount {
                mount_point: fsutil::rebase_path(rootfs, &mount.mount_point),
                subsystems: mount.subsystems,
            })
            .collect();
        Self::new(mounts)
    }

    /// Resolves the absolute cgroup directory of a container in every subsystem.
    ///
    /// The result has exactly one entry per known subsystem.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::path::PathBuf;
    /// # use raw_monitor::cgroup::{CgroupMount, CgroupSubsystems};
    /// let subsystems = CgroupSubsystems::new(vec![CgroupMount {
    ///     mount_point: PathBuf::from("/sys/fs/cgroup/cpu"),
    ///     subsystems: vec!["cpu".to_owned()],
    /// }]);
    /// let paths = subsystems.resolve("/a/b");
    /// assert_eq!(paths["cpu"], PathBuf::from("/sys/fs/cgroup/cpu/a/b"));
    /// ```
    pub fn resolve(&self, name: &str) -> HashMap<String, PathBuf> {
        self.mount_points
            .iter()
            .map(|(subsystem, root)| (subsystem.clone(), join_name(root, name)))
            .collect()
    }

    /// Recovers the logical container name of a cgroup directory.
    ///
    /// Returns `None` if `path` is not located below any cgroup mount.
    pub fn container_name(&self, path: &Path) -> Option<String> {
        self.mounts.iter().find_map(|mount| {
            let relative = path.strip_prefix(&mount.mount_point).ok()?;
            let parts: Vec<_> = relative
                .components()
                .filter_map(|component| match component {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect();
            Some(format!("/{}", parts.join("/")))
        })
    }
}

/// Joins a logical container name onto a hierarchy root.
fn join_name(root: &Path, name: &str) -> PathBuf {
    let relative = name.trim_start_matches('/');
    if relative.is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}
