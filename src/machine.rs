//! Machine topology: CPU count and physical network devices.

use std::io::{self, BufRead};
use std::path::PathBuf;

use crate::fsutil;

/// A physical network device.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct NetInfo {
    pub name: String,
    pub mac_address: String,
    pub mtu: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MachineInfo {
    pub num_cores: usize,
    pub network_devices: Vec<NetInfo>,
}

/// Provides the topology of the machine containers run on.
pub trait MachineInfoProvider: Send + Sync {
    fn machine_info(&self) -> io::Result<MachineInfo>;
}

/// [`MachineInfoProvider`] reading `/proc/cpuinfo` and `/sys/class/net`.
#[derive(Debug, Clone)]
pub struct HostMachineInfo {
    rootfs: PathBuf,
}

impl HostMachineInfo {
    pub fn new(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
        }
    }

    fn num_cores(&self) -> io::Result<usize> {
        let reader = fsutil::open_file_reader(self.rootfs.join("proc/cpuinfo"))
            .map_err(|err| io::Error::new(err.source.kind(), err))?;
        count_processors(reader)
    }

    /// Lists interfaces backed by a device, skipping virtual ones such as
    /// `lo`, bridges and veth pairs.
    fn network_devices(&self) -> io::Result<Vec<NetInfo>> {
        let class_net = self.rootfs.join("sys/class/net");
        let entries = match std::fs::read_dir(&class_net) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut devices = Vec::new();
        for entry in entries {
            let entry = entry?;
            let dir = entry.path();
            if !dir.join("device").exists() {
                continue;
            }
            let read = |file: &str| fsutil::read_trimmed(dir.join(file)).map_err(io::Error::other);
            devices.push(NetInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                mac_address: read("address")?.unwrap_or_default(),
                mtu: read("mtu")?.and_then(|mtu| mtu.parse().ok()).unwrap_or(0),
            });
        }
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }
}

impl MachineInfoProvider for HostMachineInfo {
    fn machine_info(&self) -> io::Result<MachineInfo> {
        Ok(MachineInfo {
            num_cores: self.num_cores()?,
            network_devices: self.network_devices()?,
        })
    }
}

fn count_processors<R: BufRead>(reader: R) -> io::Result<usize> {
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        if let Some((key, _)) = line.split_once(':') {
            if key.trim() == "processor" {
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_count_processors() {
        let data = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R)

processor\t: 1
vendor_id\t: GenuineIntel
";
        assert_eq!(count_processors(Cursor::new(data)).unwrap(), 2);
    }

    #[test]
    fn test_machine_info_from_rootfs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("proc")).unwrap();
        std::fs::write(
            root.join("proc/cpuinfo"),
            "processor\t: 0\nprocessor\t: 1\nprocessor\t: 2\nprocessor\t: 3\n",
        )
        .unwrap();

        let eth0 = root.join("sys/class/net/eth0");
        std::fs::create_dir_all(eth0.join("device")).unwrap();
        std::fs::write(eth0.join("address"), "52:54:00:12:34:56\n").unwrap();
        std::fs::write(eth0.join("mtu"), "1500\n").unwrap();
        std::fs::create_dir_all(root.join("sys/class/net/lo")).unwrap();

        let info = HostMachineInfo::new(root).machine_info().unwrap();
        assert_eq!(info.num_cores, 4);
        assert_eq!(
            info.network_devices,
            vec![NetInfo {
                name: "eth0".to_string(),
                mac_address: "52:54:00:12:34:56".to_string(),
                mtu: 1500,
            }]
        );
    }

    #[test]
    fn test_machine_info_missing_cpuinfo() {
        let dir = tempfile::tempdir().unwrap();
        let err = HostMachineInfo::new(dir.path()).machine_info().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
