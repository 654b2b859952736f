//! Provides generic traits for parsing Linux cgroup v1 accounting files into structured types.
//!
//! # Traits
//!
//! - [`KeyValueStat`]: multi-line files made of whitespace-separated key/value pairs such as
//!   `memory.stat`, `cpuacct.stat` or `blkio.io_service_bytes`.
//! - [`SingleLineStat`]: single-line files such as `cpuacct.usage` or `memory.usage_in_bytes`.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use raw_monitor::cgroup::stats::KeyValueStat;
//! use std::sync::OnceLock;
//!
//! #[derive(Default)]
//! struct MyStat {
//!     foo: u64,
//!     bar: u64,
//! }
//!
//! static HANDLERS: OnceLock<HashMap<&'static str, fn(&mut MyStat, u64)>> = OnceLock::new();
//!
//! impl MyStat {
//!     fn set_foo(&mut self, foo: u64) {
//!         self.foo = foo;
//!     }
//!
//!     fn set_bar(&mut self, bar: u64) {
//!         self.bar = bar;
//!     }
//! }
//!
//! impl KeyValueStat for MyStat {
//!     const SKIP_VALUES: usize = 0;
//!     const ALLOW_DUPLICATE_KEYS: bool = false;
//!
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         HANDLERS.get_or_init(|| {
//!             let mut map = HashMap::new();
//!             map.insert("foo", MyStat::set_foo as fn(&mut MyStat, u64));
//!             map.insert("bar", MyStat::set_bar as fn(&mut MyStat, u64));
//!             map
//!         })
//!     }
//! }
//!
//! let stat = MyStat::from_reader(&mut "foo 1\nbar 2\n".as_bytes()).unwrap();
//! assert_eq!(stat.foo + stat.bar, 3);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// A trait for parsing line-oriented `key value` accounting files.
///
/// Implementors define a set of known keys and how to apply values for them.
/// Each line contributes at most one key/value pair, found after skipping
/// [`KeyValueStat::SKIP_VALUES`] leading tokens. Lines that do not contain a
/// pair (headers, trailing totals) are ignored unless they name a known key.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// The number of whitespace-separated values to skip at the start of *each line*.
    ///
    /// `blkio.*` files prefix every line with a `major:minor` device id.
    const SKIP_VALUES: usize;

    /// If `true`, repeated keys are handed to the handler again (e.g. to sum per-device lines).
    /// If `false`, encountering the same key more than once will cause an error.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// Returns a map of known field names and the functions applying parsed values.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Parses a key-value formatted buffer into a struct implementing `KeyValueStat`.
    ///
    /// Unknown fields are ignored.
    ///
    /// # Errors
    /// Returns an `io::Error` if reading fails, or a `StatParseError` wrapped in `io::Error` if parsing fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let mut seen_keys = HashSet::with_capacity(handlers.len());

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace().skip(Self::SKIP_VALUES);
            match (parts.next(), parts.next()) {
                (Some(key), Some(val)) => {
                    Self::parse_and_set(key, val, &mut stat, lineno, handlers, &mut seen_keys)?
                }
                (Some(key), None) if handlers.contains_key(key) => {
                    return Err(StatParseError::MissingValue {
                        key: key.to_string(),
                        line: lineno,
                    }
                    .into());
                }
                _ => {}
            }
            line.clear();
        }

        Ok(stat)
    }

    /// Parses a single key-value pair and updates the target struct via the field handler.
    ///
    /// # Errors
    /// Returns a `StatParseError::InvalidKeyValue` if the value cannot be parsed as `u64`,
    /// or `StatParseError::DuplicateField` if the key appears more than once and duplicates are disallowed.
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        handlers: &HashMap<&'static str, fn(&mut Self, u64)>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let Some((k, handler)) = handlers.get_key_value(key) else {
            return Ok(());
        };

        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            }
            .into());
        }
        handler(stat, parsed);
        Ok(())
    }
}

/// A trait for parsing single-line statistics such as `cpuacct.usage` or
/// `memory.usage_in_bytes`.
pub trait SingleLineStat: Sized + Default {
    /// Parses a single-line statistic from the provided buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an `std::io::Error` if reading or parsing fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}

/// Parses the first line of `buf` as a single unsigned integer.
pub(super) fn parse_single_u64<R: BufRead>(buf: &mut R) -> std::io::Result<u64> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    let line = line.trim();
    Ok(line
        .parse::<u64>()
        .map_err(|source| StatParseError::InvalidValue {
            value: line.to_string(),
            line: 1,
            source,
        })?)
}
