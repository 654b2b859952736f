use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when reading a file into memory fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use raw_monitor::fsutil;
/// let reader = fsutil::open_file_reader("/some/file.txt")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Opens a file if it exists.
///
/// Returns `Ok(None)` if the file does not exist, so optional accounting files
/// can be told apart from files that exist but cannot be opened.
pub fn open_optional_reader(path: impl AsRef<Path>) -> io::Result<Option<BufReader<File>>> {
    match File::open(path) {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Reads a whole file and trims surrounding whitespace.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file exists but cannot be read.
pub fn read_trimmed(path: impl AsRef<Path>) -> Result<Option<String>, FileReadError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_owned())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FileReadError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Re-roots an absolute host path below `rootfs`.
///
/// ```
/// # use std::path::{Path, PathBuf};
/// # use raw_monitor::fsutil::rebase_path;
/// assert_eq!(rebase_path(Path::new("/rootfs"), Path::new("/proc/1")), PathBuf::from("/rootfs/proc/1"));
/// assert_eq!(rebase_path(Path::new("/rootfs"), Path::new("/")), PathBuf::from("/rootfs"));
/// ```
pub fn rebase_path(rootfs: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
        Ok(relative) if !relative.as_os_str().is_empty() => rootfs.join(relative),
        _ => rootfs.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_open_file_reader_success() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let path = tmp.path();
        let reader = open_file_reader(path).expect("should open test file");
        let metadata = reader.get_ref().metadata().unwrap();
        assert!(metadata.is_file());
    }

    #[test]
    fn test_open_file_reader_error() {
        let result = open_file_reader("/definitely/does/not/exist");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_open_optional_reader_missing() {
        let reader = open_optional_reader("/definitely/does/not/exist").unwrap();
        assert!(reader.is_none());
    }

    #[test]
    fn test_read_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpuset.cpus");
        std::fs::write(&path, "0-3\n").unwrap();

        assert_eq!(read_trimmed(&path).unwrap().as_deref(), Some("0-3"));
        assert_eq!(read_trimmed(dir.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_read_trimmed_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_trimmed(dir.path()).unwrap_err();
        assert_eq!(err.path, dir.path());
    }
}
