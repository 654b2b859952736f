//! Parsers for the cgroup v1 `memory` accounting files.
//!
//! - `memory.stat`: per-category counters, parsed into [`MemoryStat`]. Only the
//!   counters for the cgroup itself and `total_inactive_file` (needed for the
//!   working set) are kept; the other hierarchical `total_*` keys are ignored.
//! - `memory.usage_in_bytes` and `memory.max_usage_in_bytes`: single byte
//!   counts, parsed into [`MemoryUsage`].
//!
//! # Examples
//!
//! ```rust
//! use raw_monitor::cgroup::stats::{KeyValueStat, MemoryStat, MemoryUsage, SingleLineStat};
//!
//! let stat = MemoryStat::from_reader(&mut "cache 1000\nrss 2000\n".as_bytes()).unwrap();
//! assert_eq!(stat.rss, 2000);
//!
//! let usage = MemoryUsage::from_reader(&mut "8192\n".as_bytes()).unwrap();
//! assert_eq!(usage.usage_bytes, 8192);
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::{KeyValueStat, parse_single_u64};
use super::SingleLineStat;

/// Represents memory usage statistics from `memory.stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemoryStat {
    /// Page cache.
    pub cache: u64,
    /// Anonymous and swap cache memory.
    pub rss: u64,
    /// Anonymous transparent huge pages.
    pub rss_huge: u64,
    /// Memory-mapped files.
    pub mapped_file: u64,
    /// Swap usage.
    pub swap: u64,
    /// Number of page faults.
    pub pgfault: u64,
    /// Number of major page faults.
    pub pgmajfault: u64,
    /// Inactive file-backed memory of the whole hierarchy.
    pub total_inactive_file: u64,
}

impl MemoryStat {
    fn set_cache(&mut self, v: u64) {
        self.cache = v;
    }

    fn set_rss(&mut self, v: u64) {
        self.rss = v;
    }

    fn set_rss_huge(&mut self, v: u64) {
        self.rss_huge = v;
    }

    fn set_mapped_file(&mut self, v: u64) {
        self.mapped_file = v;
    }

    fn set_swap(&mut self, v: u64) {
        self.swap = v;
    }

    fn set_pgfault(&mut self, v: u64) {
        self.pgfault = v;
    }

    fn set_pgmajfault(&mut self, v: u64) {
        self.pgmajfault = v;
    }

    fn set_total_inactive_file(&mut self, v: u64) {
        self.total_inactive_file = v;
    }
}

type Setter = fn(&mut MemoryStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(8);

    m.insert("cache", MemoryStat::set_cache);
    m.insert("rss", MemoryStat::set_rss);
    m.insert("rss_huge", MemoryStat::set_rss_huge);
    m.insert("mapped_file", MemoryStat::set_mapped_file);
    m.insert("swap", MemoryStat::set_swap);
    m.insert("pgfault", MemoryStat::set_pgfault);
    m.insert("pgmajfault", MemoryStat::set_pgmajfault);
    m.insert("total_inactive_file", MemoryStat::set_total_inactive_file);

    m
});

impl KeyValueStat for MemoryStat {
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}

/// A byte counter read from `memory.usage_in_bytes` or `memory.max_usage_in_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    /// Memory usage in bytes.
    pub usage_bytes: u64,
}

impl SingleLineStat for MemoryUsage {
    /// Parses a single numeric byte count.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `std::io::ErrorKind::InvalidData` if the value cannot be parsed as a `u64`.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        Ok(MemoryUsage {
            usage_bytes: parse_single_u64(buf)?,
        })
    }
}
