use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use crate::fsutil;

/// Lists the processes of a container.
pub trait ProcessLister: Send + Sync {
    fn list_processes(&self, paths: &HashMap<String, PathBuf>) -> io::Result<Vec<u32>>;
}

/// [`ProcessLister`] reading `cgroup.procs`.
///
/// The `devices` hierarchy is preferred since every process is attached to
/// it. Otherwise the first existing directory in subsystem name order is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct CgroupProcs;

impl ProcessLister for CgroupProcs {
    fn list_processes(&self, paths: &HashMap<String, PathBuf>) -> io::Result<Vec<u32>> {
        let Some(dir) = procs_dir(paths) else {
            return Ok(Vec::new());
        };
        match fsutil::open_optional_reader(dir.join("cgroup.procs"))? {
            Some(reader) => read_pids(reader),
            None => Ok(Vec::new()),
        }
    }
}

fn procs_dir(paths: &HashMap<String, PathBuf>) -> Option<&Path> {
    if let Some(devices) = paths.get("devices").filter(|dir| dir.exists()) {
        return Some(devices.as_path());
    }
    let mut subsystems: Vec<_> = paths.keys().collect();
    subsystems.sort();
    subsystems
        .into_iter()
        .map(|subsystem| paths[subsystem].as_path())
        .find(|dir| dir.exists())
}

fn read_pids<R: BufRead>(reader: R) -> io::Result<Vec<u32>> {
    let mut pids = Vec::new();
    for line in reader.lines() {
        if let Ok(pid) = line?.trim().parse::<u32>() {
            pids.push(pid);
        }
    }
    Ok(pids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pids_skips_garbage() {
        let pids = read_pids(&b"1\n42\n\nnot-a-pid\n7\n"[..]).unwrap();
        assert_eq!(pids, vec![1, 42, 7]);
    }

    #[test]
    fn test_list_processes_prefers_devices() {
        let dir = tempfile::tempdir().unwrap();
        let paths: HashMap<_, _> = ["cpu", "devices"]
            .into_iter()
            .map(|s| (s.to_string(), dir.path().join(s).join("test")))
            .collect();
        for (subsystem, pids) in [("cpu", "1\n"), ("devices", "2\n3\n")] {
            std::fs::create_dir_all(&paths[subsystem]).unwrap();
            std::fs::write(paths[subsystem].join("cgroup.procs"), pids).unwrap();
        }

        assert_eq!(CgroupProcs.list_processes(&paths).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_list_processes_falls_back_to_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let paths: HashMap<_, _> = ["memory", "cpu", "blkio"]
            .into_iter()
            .map(|s| (s.to_string(), dir.path().join(s).join("test")))
            .collect();
        std::fs::create_dir_all(&paths["cpu"]).unwrap();
        std::fs::write(paths["cpu"].join("cgroup.procs"), "10\n").unwrap();
        std::fs::create_dir_all(&paths["memory"]).unwrap();
        std::fs::write(paths["memory"].join("cgroup.procs"), "20\n").unwrap();

        assert_eq!(CgroupProcs.list_processes(&paths).unwrap(), vec![10]);
    }

    #[test]
    fn test_list_processes_without_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HashMap::from([("cpu".to_string(), dir.path().join("missing"))]);
        assert!(CgroupProcs.list_processes(&paths).unwrap().is_empty());
    }
}
