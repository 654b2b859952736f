//! Shared error helpers.

use std::error::Error;
use std::fmt::Write;

/// Converts a `Result` into an `Option`, logging the error instead of
/// propagating it.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{}", error_chain(&err));
                None
            }
        }
    }
}

/// Renders `err` followed by each of its sources, separated by `: `.
///
/// Sources already contained in the parent's message are skipped.
pub fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !out.ends_with(&message) {
            let _ = write!(out, ": {message}");
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug, thiserror::Error)]
    #[error("failed to read `{path}`")]
    struct ReadError {
        path: String,
        #[source]
        source: io::Error,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("failed to read `{path}`: {source}")]
    struct VerboseReadError {
        path: String,
        #[source]
        source: io::Error,
    }

    #[test]
    fn test_ok_log() {
        let ok: Result<u32, io::Error> = Ok(3);
        assert_eq!(ok.ok_log(), Some(3));

        let err: Result<u32, io::Error> = Err(io::Error::other("boom"));
        assert_eq!(err.ok_log(), None);
    }

    #[test]
    fn test_error_chain_appends_sources() {
        let err = ReadError {
            path: "cpu.shares".to_string(),
            source: io::Error::other("permission denied"),
        };
        assert_eq!(
            error_chain(&err),
            "failed to read `cpu.shares`: permission denied"
        );
    }

    #[test]
    fn test_error_chain_skips_repeated_source() {
        let err = VerboseReadError {
            path: "cpu.shares".to_string(),
            source: io::Error::other("permission denied"),
        };
        assert_eq!(
            error_chain(&err),
            "failed to read `cpu.shares`: permission denied"
        );
    }
}
