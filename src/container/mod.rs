use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

mod error;
mod info;

pub use error::{Error, Result};
pub use info::{
    ContainerSpec, ContainerStats, CpuSpec, CpuStats, DiskIoStats, FsStats, MemorySpec,
    MemoryStats,
};

/// A validated logical container name.
///
/// Names are slash-rooted paths mirroring the cgroup hierarchy, e.g.
/// `/docker/abc123`. The root container is `/`.
///
/// # Examples
///
/// ```
/// # use raw_monitor::container::ContainerReference;
/// let reference = ContainerReference::new("/docker/abc123").unwrap();
/// assert_eq!(reference.name(), "/docker/abc123");
/// assert!(ContainerReference::new("docker").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct ContainerReference(Arc<str>);

impl ContainerReference {
    /// Creates a new `ContainerReference` from the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name does not start with `/`.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if !name.starts_with('/') {
            return Err(Error::InvalidName(name.to_owned()));
        }

        Ok(Self(name.into()))
    }

    /// The root container `/`.
    pub fn root() -> Self {
        Self("/".into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == "/"
    }
}

impl AsRef<str> for ContainerReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerReference {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joins a child directory name onto a logical container name.
///
/// ```
/// # use raw_monitor::container::child_name;
/// assert_eq!(child_name("/", "a"), "/a");
/// assert_eq!(child_name("/a", "b"), "/a/b");
/// ```
pub fn child_name(parent: &str, child: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Whether subcontainer listing descends below direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    SelfOnly,
    Recursive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SubcontainerEventType {
    Add,
    Delete,
}

/// A logical subcontainer creation or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SubcontainerEvent {
    pub event_type: SubcontainerEventType,
    pub name: String,
}

impl SubcontainerEvent {
    pub fn add(name: impl Into<String>) -> Self {
        Self {
            event_type: SubcontainerEventType::Add,
            name: name.into(),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            event_type: SubcontainerEventType::Delete,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_requires_leading_slash() {
        assert!(ContainerReference::new("/").is_ok());
        assert!(ContainerReference::new("/a/b").is_ok());
        assert!(matches!(
            ContainerReference::new("a/b"),
            Err(Error::InvalidName(name)) if name == "a/b"
        ));
        assert!(ContainerReference::new("").is_err());
    }

    #[test]
    fn test_reference_root() {
        assert!(ContainerReference::root().is_root());
        assert!(!ContainerReference::new("/a").unwrap().is_root());
    }

    #[test]
    fn test_child_name() {
        assert_eq!(child_name("/", "child"), "/child");
        assert_eq!(child_name("/test", "child"), "/test/child");
    }

    #[test]
    fn test_event_serializes_as_json() {
        let json = serde_json::to_string(&SubcontainerEvent::add("/a")).unwrap();
        assert_eq!(json, r#"{"event_type":"Add","name":"/a"}"#);
    }

    #[test]
    fn test_reference_serializes_as_string() {
        let reference = ContainerReference::new("/docker/abc").unwrap();
        assert_eq!(serde_json::to_string(&reference).unwrap(), r#""/docker/abc""#);
    }
}
