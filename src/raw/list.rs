use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::container::{ContainerReference, ListType, child_name};

use super::{Error, RawContainerHandler, Result};

impl RawContainerHandler {
    /// Lists the subcontainers found in any hierarchy.
    ///
    /// A subcontainer mirrored in several hierarchies is listed once.
    pub fn list_containers(&self, list_type: ListType) -> Result<Vec<ContainerReference>> {
        let recursive = list_type == ListType::Recursive;
        let mut names = BTreeSet::new();
        for dir in self.cgroup_paths.values() {
            list_directories(dir, self.reference.name(), recursive, &mut names)?;
        }

        names
            .into_iter()
            .map(|name| Ok(ContainerReference::new(name)?))
            .collect()
    }
}

/// Collects the directories below `dir` as children of the logical name `parent`.
///
/// A missing `dir` contributes nothing.
fn list_directories(
    dir: &Path,
    parent: &str,
    recursive: bool,
    out: &mut BTreeSet<String>,
) -> Result<()> {
    let mut stack: Vec<(PathBuf, String)> = vec![(dir.to_path_buf(), parent.to_owned())];
    while let Some((dir, parent)) = stack.pop() {
        let read_dir_err = |source: io::Error| Error::ReadDir {
            path: dir.clone(),
            source,
        };
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(read_dir_err(err)),
        };

        for entry in entries {
            let entry = entry.map_err(read_dir_err)?;
            if !entry.file_type().map_err(read_dir_err)?.is_dir() {
                continue;
            }
            let name = child_name(&parent, &entry.file_name().to_string_lossy());
            if recursive {
                stack.push((entry.path(), name.clone()));
            }
            out.insert(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::raw::testutil::*;

    fn names(refs: Vec<ContainerReference>) -> Vec<String> {
        refs.into_iter().map(|r| r.name().to_owned()).collect()
    }

    fn handler(root: &Path, name: &str) -> RawContainerHandler {
        RawContainerHandler::new(
            ContainerReference::new(name).unwrap(),
            subsystems(root, &["cpu", "memory", "blkio"]),
            collaborators(machine(1, &[]), Arc::default()),
            None,
        )
    }

    #[test]
    fn test_recursive_listing_deduplicates_hierarchies() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("cpu/test/a/b")).unwrap();
        std::fs::create_dir_all(root.join("memory/test/a/b")).unwrap();
        std::fs::create_dir_all(root.join("memory/test/c")).unwrap();
        std::fs::write(root.join("cpu/test/a/cpu.shares"), "1024\n").unwrap();

        let listed = handler(root, "/test")
            .list_containers(ListType::Recursive)
            .unwrap();
        assert_eq!(names(listed), vec!["/test/a", "/test/a/b", "/test/c"]);
    }

    #[test]
    fn test_self_only_lists_direct_children() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("cpu/test/a/b")).unwrap();
        std::fs::create_dir_all(root.join("memory/test/c")).unwrap();

        let listed = handler(root, "/test")
            .list_containers(ListType::SelfOnly)
            .unwrap();
        assert_eq!(names(listed), vec!["/test/a", "/test/c"]);
    }

    #[test]
    fn test_root_listing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("cpu/docker/abc")).unwrap();
        std::fs::create_dir_all(root.join("blkio/docker")).unwrap();

        let listed = handler(root, "/")
            .list_containers(ListType::Recursive)
            .unwrap();
        assert_eq!(names(listed), vec!["/docker", "/docker/abc"]);
    }

    #[test]
    fn test_missing_hierarchies_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let listed = handler(dir.path(), "/test")
            .list_containers(ListType::Recursive)
            .unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_unreadable_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cpu")).unwrap();
        std::fs::write(dir.path().join("cpu/test"), "").unwrap();

        let result = handler(dir.path(), "/test").list_containers(ListType::SelfOnly);
        assert!(matches!(result, Err(Error::ReadDir { .. })));
    }
}
