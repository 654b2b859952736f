use std::path::PathBuf;

use crate::fsutil;

/// Errors raised while reading a `/proc/<pid>/mountinfo` table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read mount table `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to detect any cgroup v1 mount point in file `{path}`")]
    MissingCgroupMount { path: PathBuf },
    #[error("failed to parse line {line} of mount table `{path}`: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: super::parser::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
