//! Parsers for the cgroup v1 `cpuacct` accounting files.
//!
//! - `cpuacct.stat`: user and system time in `USER_HZ` ticks, parsed into [`CpuAcctStat`].
//! - `cpuacct.usage`: total CPU time in nanoseconds, parsed into [`CpuUsage`].
//! - `cpuacct.usage_percpu`: space-separated per-CPU nanoseconds, parsed into [`PerCpuUsage`].
//!
//! # Examples
//!
//! ```rust
//! use raw_monitor::cgroup::stats::{CpuAcctStat, CpuUsage, KeyValueStat, SingleLineStat};
//!
//! let stat = CpuAcctStat::from_reader(&mut "user 4000\nsystem 1000\n".as_bytes()).unwrap();
//! assert_eq!(stat.user, 4000);
//!
//! let usage = CpuUsage::from_reader(&mut "623932088000\n".as_bytes()).unwrap();
//! assert_eq!(usage.total_ns, 623_932_088_000);
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::parse_single_u64;
use super::{KeyValueStat, SingleLineStat, StatParseError};

/// Parsed `cpuacct.stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct CpuAcctStat {
    /// Time spent in user space, in `USER_HZ` ticks.
    pub user: u64,
    /// Time spent in kernel space, in `USER_HZ` ticks.
    pub system: u64,
}

impl CpuAcctStat {
    fn set_user(&mut self, user: u64) {
        self.user = user;
    }

    fn set_system(&mut self, system: u64) {
        self.system = system;
    }
}

type Setter = fn(&mut CpuAcctStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(2);

    m.insert("user", CpuAcctStat::set_user);
    m.insert("system", CpuAcctStat::set_system);

    m
});

impl KeyValueStat for CpuAcctStat {
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}

/// Parsed `cpuacct.usage`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct CpuUsage {
    /// Total CPU time consumed by all tasks in the cgroup, in nanoseconds.
    pub total_ns: u64,
}

impl SingleLineStat for CpuUsage {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        Ok(CpuUsage {
            total_ns: parse_single_u64(buf)?,
        })
    }
}

/// Parsed `cpuacct.usage_percpu`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct PerCpuUsage {
    /// CPU time per CPU, in nanoseconds, indexed by CPU number.
    pub per_cpu_ns: Vec<u64>,
}

impl SingleLineStat for PerCpuUsage {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        buf.read_line(&mut line)?;
        let per_cpu_ns = line
            .split_whitespace()
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|source| StatParseError::InvalidValue {
                        value: value.to_string(),
                        line: 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PerCpuUsage { per_cpu_ns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::error::extract_stat_parse_error;

    #[test]
    fn test_parse_empty_cpuacct_stat() {
        let stat = CpuAcctStat::from_reader(&mut "".as_bytes()).unwrap();
        assert_eq!(stat, CpuAcctStat::default());
    }

    #[test]
    fn test_parse_cpuacct_stat() {
        let data = "\
user 421230
system 202701
";
        let stat = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.user, 421_230);
        assert_eq!(stat.system, 202_701);
    }

    #[test]
    fn test_parse_invalid_cpuacct_stat() {
        let data = "\
user 42
system abc
";
        let err = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "system");
                assert_eq!(value, "abc");
                assert_eq!(*line, 2);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_duplicate_field_errors() {
        let data = "\
user 100
user 200
";
        let err = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match extract_stat_parse_error(&err) {
            StatParseError::DuplicateField { field, line } => {
                assert_eq!(field, "user");
                assert_eq!(*line, 2);
            }
            _ => panic!("Expected DuplicateField error"),
        }
    }

    #[test]
    fn test_parse_cpu_usage() {
        let usage = CpuUsage::from_reader(&mut &b"1000\n"[..]).unwrap();
        assert_eq!(usage.total_ns, 1000);
    }

    #[test]
    fn test_parse_invalid_cpu_usage() {
        let err = CpuUsage::from_reader(&mut &b"\n"[..]).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_parse_per_cpu_usage() {
        let usage = PerCpuUsage::from_reader(&mut &b"100 200 300 \n"[..]).unwrap();
        assert_eq!(usage.per_cpu_ns, vec![100, 200, 300]);
    }

    #[test]
    fn test_parse_invalid_per_cpu_usage() {
        let err = PerCpuUsage::from_reader(&mut &b"100 x 300\n"[..]).unwrap_err();
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidValue { value, .. } => assert_eq!(value, "x"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
