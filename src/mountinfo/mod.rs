mod detect;
mod error;
mod parser;

pub(crate) use detect::for_each_mount;
pub use detect::detect_cgroup_subsystems;
pub use error::{Error, Result};
pub use parser::{MountInfo, ParseError, parse_mount_info_line};
