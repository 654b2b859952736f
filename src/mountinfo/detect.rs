use crate::cgroup::{CgroupMount, CgroupSubsystems};
use crate::fsutil;

use super::parser::{MountInfo, parse_mount_info_line};
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Detects the mounted cgroup v1 hierarchies by parsing a Linux `mountinfo` file.
///
/// Every `cgroup` filesystem entry contributes one [`CgroupMount`]; hierarchies
/// without any subsystem attached (e.g. the systemd named hierarchy) are skipped.
///
/// # Arguments
///
/// * `path` - Path to a Linux mountinfo file (e.g., `/proc/self/mountinfo`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::MissingCgroupMount`] if no cgroup v1 hierarchy is mounted.
///
/// # Example
///
/// ```no_run
/// use raw_monitor::mountinfo::detect_cgroup_subsystems;
///
/// let subsystems = detect_cgroup_subsystems("/proc/self/mountinfo").unwrap();
/// for (subsystem, root) in subsystems.mount_points() {
///     println!("{subsystem}: {}", root.display());
/// }
/// ```
pub fn detect_cgroup_subsystems(path: impl AsRef<Path>) -> Result<CgroupSubsystems> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_cgroup_subsystems_from_reader(buf, path)
}

/// Visits every parsed line of a mountinfo stream.
///
/// `origin` is only used in error messages.
pub(crate) fn for_each_mount<R: BufRead>(
    mut reader: R,
    origin: &Path,
    mut visit: impl FnMut(MountInfo<'_>),
) -> Result<()> {
    let mut line = String::with_capacity(256);
    let mut line_number = 0;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        line_number += 1;
        if !line.trim().is_empty() {
            let mount_info =
                parse_mount_info_line(line.as_str()).map_err(|source| Error::Parse {
                    path: origin.to_path_buf(),
                    line: line_number,
                    source,
                })?;
            visit(mount_info);
        }

        line.clear();
    }

    Ok(())
}

fn detect_cgroup_subsystems_from_reader<R: BufRead>(
    reader: R,
    origin: &Path,
) -> Result<CgroupSubsystems> {
    let mut mounts = Vec::new();

    for_each_mount(reader, origin, |mount_info| {
        if !mount_info.is_cgroup_v1() {
            return;
        }
        let subsystems: Vec<String> = mount_info
            .cgroup_subsystems()
            .map(str::to_owned)
            .collect();
        if subsystems.is_empty() {
            return;
        }
        log::debug!(
            "Found cgroup mount point `{}` for subsystems {:?}",
            mount_info.mount_point,
            subsystems
        );
        mounts.push(CgroupMount {
            mount_point: PathBuf::from(mount_info.mount_point),
            subsystems,
        });
    })?;

    if mounts.is_empty() {
        return Err(Error::MissingCgroupMount {
            path: origin.to_path_buf(),
        });
    }

    Ok(CgroupSubsystems::new(mounts))
}
