//! Parser for the cgroup v1 `blkio.io_service_bytes` and `blkio.io_serviced` files.
//!
//! Each line holds a `major:minor` device id, an operation and a counter:
//!
//! ```text
//! 8:0 Read 1024
//! 8:0 Write 2048
//! 8:0 Sync 3072
//! 8:0 Async 0
//! 8:0 Total 3072
//! Total 3072
//! ```
//!
//! Counters are summed across devices. The trailing `Total` line has no
//! device id and is ignored.
//!
//! # Example
//!
//! ```rust
//! use raw_monitor::cgroup::stats::{BlkioStat, KeyValueStat};
//!
//! let data = "\
//! 8:0 Read 1024
//! 8:16 Read 1024
//! 8:0 Write 2048
//! Total 4096
//! ";
//! let stat = BlkioStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(stat.read, 2048);
//! assert_eq!(stat.write, 2048);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::parser::KeyValueStat;

/// Block I/O counters summed across all devices.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct BlkioStat {
    pub read: u64,
    pub write: u64,
    pub sync: u64,
    pub r#async: u64,
    pub total: u64,
}

impl BlkioStat {
    fn add_read(&mut self, v: u64) {
        self.read += v;
    }

    fn add_write(&mut self, v: u64) {
        self.write += v;
    }

    fn add_sync(&mut self, v: u64) {
        self.sync += v;
    }

    fn add_async(&mut self, v: u64) {
        self.r#async += v;
    }

    fn add_total(&mut self, v: u64) {
        self.total += v;
    }
}

type Accumulator = fn(&mut BlkioStat, u64);

static ACCUMULATORS: LazyLock<HashMap<&'static str, Accumulator>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Accumulator> = HashMap::with_capacity(5);

    m.insert("Read", BlkioStat::add_read);
    m.insert("Write", BlkioStat::add_write);
    m.insert("Sync", BlkioStat::add_sync);
    m.insert("Async", BlkioStat::add_async);
    m.insert("Total", BlkioStat::add_total);

    m
});

impl KeyValueStat for BlkioStat {
    const SKIP_VALUES: usize = 1;
    const ALLOW_DUPLICATE_KEYS: bool = true;

    #[inline]
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &ACCUMULATORS
    }
}
