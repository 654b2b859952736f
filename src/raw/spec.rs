use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use crate::container::ContainerSpec;
use crate::error::ResultOkLogExt;
use crate::fsutil::FileReadError;

use super::{Error, RawContainerHandler, Result};

#[derive(Debug, thiserror::Error)]
enum FieldError {
    #[error(transparent)]
    Read(#[from] FileReadError),
    #[error("failed to parse `{value}` in `{path}`: {source}")]
    Parse {
        path: PathBuf,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Reads a control file, logging and returning an empty string on failure.
fn read_string(dir: &Path, file: &str) -> String {
    let path = dir.join(file);
    std::fs::read_to_string(&path)
        .map(|contents| contents.trim().to_owned())
        .map_err(|source| FieldError::from(FileReadError { path, source }))
        .ok_log()
        .unwrap_or_default()
}

/// Reads a numeric control file, logging and returning zero on failure.
fn read_u64(dir: &Path, file: &str) -> u64 {
    let value = read_string(dir, file);
    if value.is_empty() {
        return 0;
    }
    value
        .parse::<u64>()
        .map_err(|source| FieldError::Parse {
            path: dir.join(file),
            value: value.clone(),
            source,
        })
        .ok_log()
        .unwrap_or(0)
}

impl RawContainerHandler {
    /// Derives the container's capabilities and limits.
    ///
    /// Unreadable control files leave their limit at zero; only a failure to
    /// read the machine topology is an error.
    pub fn spec(&self) -> Result<ContainerSpec> {
        let machine = self
            .collaborators
            .machine
            .machine_info()
            .map_err(Error::MachineInfo)?;

        let mut spec = ContainerSpec::default();

        if let Some(dir) = self.existing_path("cpu") {
            spec.has_cpu = true;
            spec.cpu.limit = read_u64(dir, "cpu.shares");
        }
        if let Some(dir) = self.existing_path("cpuset") {
            spec.has_cpu = true;
            spec.cpu.mask = read_string(dir, "cpuset.cpus");
            if spec.cpu.mask.is_empty() {
                spec.cpu.mask = format!("0-{}", machine.num_cores.saturating_sub(1));
            }
        }

        if let Some(dir) = self.existing_path("memory") {
            spec.has_memory = true;
            spec.memory.limit = read_u64(dir, "memory.limit_in_bytes");
            spec.memory.swap_limit = read_u64(dir, "memory.memsw.limit_in_bytes");
        }

        spec.has_filesystem = self.is_root() || !self.external_mounts.is_empty();
        spec.has_network =
            self.hinted || (self.is_root() && !machine.network_devices.is_empty());
        spec.has_diskio = self.existing_path("blkio").is_some();

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use super::*;
    use crate::container::ContainerReference;
    use crate::hints::{ContainerHint, Mount, NetworkInterface};
    use crate::raw::testutil::*;

    const SUBSYSTEMS: [&str; 4] = ["cpu", "cpuset", "memory", "blkio"];

    fn handler(root: &Path, name: &str, num_cores: usize, devices: &[&str]) -> RawContainerHandler {
        RawContainerHandler::new(
            ContainerReference::new(name).unwrap(),
            subsystems(root, &SUBSYSTEMS),
            collaborators(machine(num_cores, devices), Arc::default()),
            None,
        )
    }

    fn write(root: &Path, subsystem: &str, name: &str, file: &str, contents: &str) {
        let dir = root.join(subsystem).join(name.trim_start_matches('/'));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), contents).unwrap();
    }

    #[test]
    fn test_spec_reads_limits() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "cpu", "/test", "cpu.shares", "512\n");
        write(root, "cpuset", "/test", "cpuset.cpus", "0-1\n");
        write(root, "memory", "/test", "memory.limit_in_bytes", "1048576\n");
        write(root, "memory", "/test", "memory.memsw.limit_in_bytes", "2097152\n");
        std::fs::create_dir_all(root.join("blkio/test")).unwrap();

        let spec = handler(root, "/test", 4, &[]).spec().unwrap();
        assert!(spec.has_cpu);
        assert_eq!(spec.cpu.limit, 512);
        assert_eq!(spec.cpu.mask, "0-1");
        assert!(spec.has_memory);
        assert_eq!(spec.memory.limit, 1_048_576);
        assert_eq!(spec.memory.swap_limit, 2_097_152);
        assert!(spec.has_diskio);
        assert!(!spec.has_filesystem);
        assert!(!spec.has_network);
    }

    #[test]
    fn test_missing_memory_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "cpu", "/test", "cpu.shares", "1024\n");

        let spec = handler(root, "/test", 4, &[]).spec().unwrap();
        assert!(!spec.has_memory);
        assert_eq!(spec.memory.limit, 0);
        assert_eq!(spec.memory.swap_limit, 0);
        assert!(spec.has_cpu);
        assert_eq!(spec.cpu.limit, 1024);
        assert!(!spec.has_diskio);
    }

    #[test]
    fn test_empty_cpuset_falls_back_to_all_cores() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "cpuset", "/test", "cpuset.cpus", "\n");

        let spec = handler(root, "/test", 8, &[]).spec().unwrap();
        assert!(spec.has_cpu);
        assert_eq!(spec.cpu.mask, "0-7");
    }

    #[test]
    fn test_absent_cpuset_file_falls_back_to_all_cores() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cpuset/test")).unwrap();

        let spec = handler(dir.path(), "/test", 2, &[]).spec().unwrap();
        assert_eq!(spec.cpu.mask, "0-1");
    }

    #[test]
    fn test_malformed_limits_are_zero() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "cpu", "/test", "cpu.shares", "lots\n");
        write(root, "memory", "/test", "memory.limit_in_bytes", "-1\n");

        let spec = handler(root, "/test", 1, &[]).spec().unwrap();
        assert!(spec.has_cpu);
        assert_eq!(spec.cpu.limit, 0);
        assert!(spec.has_memory);
        assert_eq!(spec.memory.limit, 0);
    }

    #[test]
    fn test_root_capabilities() {
        let dir = tempfile::tempdir().unwrap();

        let spec = handler(dir.path(), "/", 1, &["eth0"]).spec().unwrap();
        assert!(spec.has_filesystem);
        assert!(spec.has_network);

        let spec = handler(dir.path(), "/", 1, &[]).spec().unwrap();
        assert!(spec.has_filesystem);
        assert!(!spec.has_network);
    }

    #[test]
    fn test_physical_devices_only_count_for_root() {
        let dir = tempfile::tempdir().unwrap();
        let spec = handler(dir.path(), "/test", 1, &["eth0"]).spec().unwrap();
        assert!(!spec.has_network);
    }

    #[test]
    fn test_hinted_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let hint = ContainerHint {
            full_path: "/lxc/web".to_string(),
            network_interface: Some(NetworkInterface {
                veth_host: "veth0".to_string(),
                veth_child: "eth0".to_string(),
            }),
            mounts: vec![Mount {
                host_dir: PathBuf::from("/data"),
                container_dir: PathBuf::from("/srv"),
            }],
        };
        let handler = RawContainerHandler::new(
            ContainerReference::new("/lxc/web").unwrap(),
            subsystems(dir.path(), &SUBSYSTEMS),
            collaborators(machine(1, &[]), Arc::default()),
            Some(&hint),
        );

        let spec = handler.spec().unwrap();
        assert!(spec.has_filesystem);
        assert!(spec.has_network);
    }

    #[test]
    fn test_hint_without_network_interface_has_network() {
        let dir = tempfile::tempdir().unwrap();
        let hint = ContainerHint {
            full_path: "/lxc/db".to_string(),
            network_interface: None,
            mounts: Vec::new(),
        };
        let handler = RawContainerHandler::new(
            ContainerReference::new("/lxc/db").unwrap(),
            subsystems(dir.path(), &SUBSYSTEMS),
            collaborators(machine(1, &[]), Arc::default()),
            Some(&hint),
        );

        let spec = handler.spec().unwrap();
        assert!(spec.has_network);
        assert!(!spec.has_filesystem);
    }

    #[test]
    fn test_machine_info_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut collaborators = collaborators(machine(1, &[]), Arc::default());
        collaborators.machine = Arc::new(FakeMachine {
            info: Err(io::Error::new(io::ErrorKind::NotFound, "no cpuinfo")),
        });
        let handler = RawContainerHandler::new(
            ContainerReference::root(),
            subsystems(dir.path(), &SUBSYSTEMS),
            collaborators,
            None,
        );

        assert!(matches!(handler.spec(), Err(Error::MachineInfo(_))));
    }
}
