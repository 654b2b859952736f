//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure.

/// Super options that are generic mount flags rather than cgroup subsystems.
const GENERIC_CGROUP_OPTIONS: [&str; 6] = [
    "rw",
    "ro",
    "xattr",
    "clone_children",
    "noprefix",
    "cpuset_v2_mode",
];

/// Represents a parsed mountinfo line.
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    /// Major:Minor device identifier.
    pub major_minor: &'a str,
    /// Root of the mount within the filesystem.
    pub root: &'a str,
    /// Mount point relative to the process's root.
    pub mount_point: &'a str,
    /// Filesystem type (e.g., `ext4`, `cgroup`).
    pub fs_type: &'a str,
    /// Source of the mount (e.g., device).
    pub source: &'a str,
    /// Superblock options.
    pub super_options: &'a str,
}

impl<'a> MountInfo<'a> {
    /// Returns `true` for cgroup v1 hierarchies.
    pub fn is_cgroup_v1(&self) -> bool {
        self.fs_type == "cgroup"
    }

    /// Returns the subsystems attached to a cgroup v1 hierarchy.
    ///
    /// Generic mount flags, `release_agent=` and named hierarchies (`name=`)
    /// are skipped.
    pub fn cgroup_subsystems(&self) -> impl Iterator<Item = &'a str> {
        self.super_options.split(',').filter(|option| {
            !option.is_empty()
                && !option.contains('=')
                && !GENERIC_CGROUP_OPTIONS.contains(option)
        })
    }

    /// Parses the `major:minor` field into device numbers.
    pub fn device_numbers(&self) -> Option<(u32, u32)> {
        let (major, minor) = self.major_minor.split_once(':')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }
}

/// Named fields in a mountinfo line.
#[derive(Debug)]
pub enum MountInfoField {
    MountId,
    ParentId,
    MajorMinor,
    Root,
    MountPoint,
    FsType,
    Source,
    SuperOptions,
}

impl std::fmt::Display for MountInfoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountInfoField::MountId => "mount_id",
            MountInfoField::ParentId => "parent_id",
            MountInfoField::MajorMinor => "major:minor",
            MountInfoField::Root => "root",
            MountInfoField::MountPoint => "mount_point",
            MountInfoField::FsType => "fs_type",
            MountInfoField::Source => "source",
            MountInfoField::SuperOptions => "super_options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("missing `{field}` in pre-separator section of line: `{line}`")]
    MissingPreSeparatorField { field: MountInfoField, line: String },

    #[error("missing `{field}` in post-separator section of line: `{line}`")]
    MissingPostSeparatorField { field: MountInfoField, line: String },
}

/// Parses a single line of mountinfo data.
///
/// The line must follow the Linux kernel format described in
/// [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html).
/// Optional fields between the mount point and the separator are skipped.
///
/// # Errors
///
/// Returns [`ParseError`] variants for missing separator or required fields.
pub fn parse_mount_info_line(line: &str) -> Result<MountInfo<'_>, ParseError> {
    let (pre, post) = line
        .trim_end()
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.to_owned()))?;

    let mut pre_fields = pre.split_whitespace();
    let mut pre_field = |field: MountInfoField| {
        pre_fields
            .next()
            .ok_or_else(|| ParseError::MissingPreSeparatorField {
                field,
                line: line.to_owned(),
            })
    };
    pre_field(MountInfoField::MountId)?;
    pre_field(MountInfoField::ParentId)?;
    let major_minor = pre_field(MountInfoField::MajorMinor)?;
    let root = pre_field(MountInfoField::Root)?;
    let mount_point = pre_field(MountInfoField::MountPoint)?;

    let mut post_fields = post.split_whitespace();
    let mut post_field = |field: MountInfoField| {
        post_fields
            .next()
            .ok_or_else(|| ParseError::MissingPostSeparatorField {
                field,
                line: line.to_owned(),
            })
    };
    let fs_type = post_field(MountInfoField::FsType)?;
    let source = post_field(MountInfoField::Source)?;
    let super_options = post_field(MountInfoField::SuperOptions)?;

    Ok(MountInfo {
        major_minor,
        root,
        mount_point,
        fs_type,
        source,
        super_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cgroup_v1_line() {
        let line = "33 25 0:29 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:15 - cgroup cgroup rw,cpu,cpuacct\n";
        let result = parse_mount_info_line(line).unwrap();

        assert_eq!(result.major_minor, "0:29");
        assert_eq!(result.root, "/");
        assert_eq!(result.mount_point, "/sys/fs/cgroup/cpu,cpuacct");
        assert_eq!(result.fs_type, "cgroup");
        assert_eq!(result.source, "cgroup");
        assert_eq!(result.super_options, "rw,cpu,cpuacct");
        assert!(result.is_cgroup_v1());
        assert_eq!(
            result.cgroup_subsystems().collect::<Vec<_>>(),
            vec!["cpu", "cpuacct"]
        );
    }

    #[test]
    fn skips_named_hierarchies_and_flags() {
        let line = "30 25 0:26 / /sys/fs/cgroup/systemd rw,nosuid - cgroup cgroup rw,xattr,release_agent=/lib/systemd/systemd-cgroups-agent,name=systemd";
        let result = parse_mount_info_line(line).unwrap();
        assert_eq!(result.cgroup_subsystems().count(), 0);
    }

    #[test]
    fn cgroup2_is_not_v1() {
        let line = "42 35 0:39 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup2 rw";
        let result = parse_mount_info_line(line).unwrap();
        assert!(!result.is_cgroup_v1());
    }

    #[test]
    fn parses_device_numbers() {
        let line = "70 56 8:1 / /var rw,relatime shared:20 - ext4 /dev/sda1 rw,errors=remount-ro";
        let result = parse_mount_info_line(line).unwrap();
        assert_eq!(result.device_numbers(), Some((8, 1)));
        assert_eq!(result.source, "/dev/sda1");
    }

    #[test]
    fn error_on_missing_separator() {
        let line = "42 35 0:22 / /mnt rw,nosuid ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }

    #[test]
    fn error_on_missing_mount_point() {
        let line = "42 35 0:22 / - ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingPreSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "mount_point");
            }
            _ => panic!("Expected MissingPreSeparatorField"),
        }
    }

    #[test]
    fn error_on_missing_post_separator_fields() {
        let line = "42 35 0:22 / /mnt - ext4 /dev/sda1";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingPostSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "super_options");
            }
            _ => panic!("Expected MissingPostSeparatorField"),
        }
    }

    #[test]
    fn error_on_empty_line() {
        let err = parse_mount_info_line("").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }
}
