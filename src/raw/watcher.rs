//! Live subcontainer discovery through inotify.
//!
//! A logical container is mirrored by one directory per cgroup hierarchy, so a
//! single `mkdir` by a container runtime shows up as several raw filesystem
//! events. [`SubcontainerWatcher`] installs recursive watches on every
//! directory of a container and folds those raw events into one
//! [`SubcontainerEvent`] per logical creation or deletion.
//!
//! The watch bookkeeping is owned by a background task which is the only
//! writer, so no locking is involved. The task runs until
//! [`SubcontainerWatcher::stop`] is called or the watcher is dropped.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use inotify::{Event, EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use nix::errno::Errno;
use tokio::io::unix::AsyncFd;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::cgroup::CgroupSubsystems;
use crate::container::{ContainerReference, SubcontainerEvent, child_name};

const EVENT_BUFFER_SIZE: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create inotify instance: {0}")]
    Init(#[source] io::Error),
    #[error("failed to add watch for `{path}`: {source}")]
    AddWatch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove watch for `{path}`: {source}")]
    RemoveWatch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read directory `{path}`: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("already watching subcontainers of container `{0}`")]
    AlreadyWatching(String),
    #[error("can't stop watch that has not started for container `{0}`")]
    NotStarted(String),
    #[error("watch for container `{0}` has already been stopped")]
    Stopped(String),
    #[error("unable to detect container from watch event on directory `{0}`")]
    UnknownContainer(PathBuf),
    #[error("received event for unknown watch descriptor")]
    UnknownDescriptor,
    #[error("subcontainer event queue is closed")]
    QueueClosed,
    #[error("failed to close inotify instance: {0}")]
    Close(#[source] io::Error),
    #[error("watch task exited without acknowledging stop")]
    TaskGone,
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a raw inotify event means for the container tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Add,
    Delete,
    Ignored,
}

/// Maps an inotify event mask onto a subcontainer change.
///
/// Only directory events matter: creation or moving in is an addition,
/// deletion or moving out is a removal.
pub fn classify(mask: EventMask) -> EventKind {
    if !mask.contains(EventMask::ISDIR) {
        return EventKind::Ignored;
    }
    if mask.intersects(EventMask::CREATE | EventMask::MOVED_TO) {
        EventKind::Add
    } else if mask.intersects(EventMask::DELETE | EventMask::MOVED_FROM) {
        EventKind::Delete
    } else {
        EventKind::Ignored
    }
}

/// An inotify event detached from the read buffer.
#[derive(Debug, Clone)]
struct RawEvent {
    wd: WatchDescriptor,
    mask: EventMask,
    name: Option<OsString>,
}

impl From<Event<&std::ffi::OsStr>> for RawEvent {
    fn from(event: Event<&std::ffi::OsStr>) -> Self {
        Self {
            wd: event.wd,
            mask: event.mask,
            name: event.name.map(ToOwned::to_owned),
        }
    }
}

/// Watch bookkeeping of one container tree.
struct SubcontainerWatches {
    watches: Watches,
    subsystems: Arc<CgroupSubsystems>,
    /// Logical names reported as live.
    watched_names: HashSet<String>,
    /// Directories registered with the kernel.
    watched_dirs: HashMap<PathBuf, WatchDescriptor>,
    descriptors: HashMap<WatchDescriptor, PathBuf>,
}

impl SubcontainerWatches {
    fn new(watches: Watches, subsystems: Arc<CgroupSubsystems>) -> Self {
        Self {
            watches,
            subsystems,
            watched_names: HashSet::new(),
            watched_dirs: HashMap::new(),
            descriptors: HashMap::new(),
        }
    }

    /// Watches `dir` and every directory below it.
    ///
    /// Directories are recorded under `name` and names derived from it.
    fn watch_directory(&mut self, dir: &Path, name: &str) -> Result<()> {
        let mut stack = vec![(dir.to_path_buf(), name.to_owned())];
        while let Some((dir, name)) = stack.pop() {
            let wd = self
                .watches
                .add(&dir, WatchMask::CREATE | WatchMask::DELETE | WatchMask::MOVE)
                .map_err(|source| Error::AddWatch {
                    path: dir.clone(),
                    source,
                })?;
            log::trace!("Watching `{}` as `{name}`", dir.display());
            self.descriptors.insert(wd.clone(), dir.clone());
            self.watched_dirs.insert(dir.clone(), wd);
            self.watched_names.insert(name.clone());

            let read_dir_err = |source: io::Error| Error::ReadDir {
                path: dir.clone(),
                source,
            };
            for entry in std::fs::read_dir(&dir).map_err(read_dir_err)? {
                let entry = entry.map_err(read_dir_err)?;
                if entry.file_type().map_err(read_dir_err)?.is_dir() {
                    let child = child_name(&name, &entry.file_name().to_string_lossy());
                    stack.push((entry.path(), child));
                }
            }
        }
        Ok(())
    }

    /// Drops the registration of `dir` and of every watched directory below it.
    ///
    /// Names of the dropped descendants are forgotten once no hierarchy
    /// mirrors them anymore. The name of `dir` itself is left to the caller.
    fn unwatch_directory(&mut self, dir: &Path) -> Result<()> {
        let stale: Vec<PathBuf> = self
            .watched_dirs
            .keys()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect();

        let mut orphaned = Vec::new();
        for path in stale {
            let Some(wd) = self.watched_dirs.remove(&path) else {
                continue;
            };
            self.descriptors.remove(&wd);
            if path.as_path() != dir {
                orphaned.extend(self.subsystems.container_name(&path));
            }
            match self.watches.remove(wd) {
                Ok(()) => log::trace!("Removed watch for `{}`", path.display()),
                // The kernel drops the watch of a removed directory on its own.
                Err(err) if err.raw_os_error() == Some(Errno::EINVAL as i32) => {}
                Err(source) => return Err(Error::RemoveWatch { path, source }),
            }
        }

        for name in orphaned {
            if !self.is_mirrored(&name) {
                self.watched_names.remove(&name);
            }
        }
        Ok(())
    }

    /// Returns `true` if a directory of `name` is still watched in any hierarchy.
    fn is_mirrored(&self, name: &str) -> bool {
        self.watched_dirs
            .keys()
            .any(|path| self.subsystems.container_name(path).as_deref() == Some(name))
    }

    /// Updates the bookkeeping for a change of the directory at `path` and
    /// returns the logical event to report, if any.
    ///
    /// A logical name is reported once when it first appears in any hierarchy
    /// and once when it disappears.
    fn reconcile(&mut self, kind: EventKind, path: &Path) -> Result<Option<SubcontainerEvent>> {
        let name = self
            .subsystems
            .container_name(path)
            .ok_or_else(|| Error::UnknownContainer(path.to_path_buf()))?;

        match kind {
            EventKind::Add => {
                let already_watched = self.watched_names.contains(&name);
                self.watch_directory(path, &name)?;
                if already_watched {
                    return Ok(None);
                }
                Ok(Some(SubcontainerEvent::add(name)))
            }
            EventKind::Delete => {
                if self.watched_dirs.contains_key(path) {
                    self.unwatch_directory(path)?;
                }
                if !self.watched_names.remove(&name) {
                    return Ok(None);
                }
                Ok(Some(SubcontainerEvent::delete(name)))
            }
            EventKind::Ignored => Ok(None),
        }
    }

    fn event_path(&self, event: &RawEvent) -> Result<PathBuf> {
        let dir = self
            .descriptors
            .get(&event.wd)
            .ok_or(Error::UnknownDescriptor)?;
        Ok(match &event.name {
            Some(name) => dir.join(name),
            None => dir.clone(),
        })
    }

    async fn process_event(
        &mut self,
        event: &RawEvent,
        queue: &mpsc::Sender<SubcontainerEvent>,
    ) -> Result<()> {
        if event.mask.contains(EventMask::Q_OVERFLOW) {
            log::warn!("inotify event queue overflowed, subcontainer events may have been lost");
            return Ok(());
        }
        let kind = classify(event.mask);
        if kind == EventKind::Ignored {
            return Ok(());
        }

        let path = self.event_path(event)?;
        if let Some(event) = self.reconcile(kind, &path)? {
            log::debug!("Subcontainer event: {:?} `{}`", event.event_type, event.name);
            queue.send(event).await.map_err(|_| Error::QueueClosed)?;
        }
        Ok(())
    }
}

type StopAck = oneshot::Sender<io::Result<()>>;

enum State {
    Idle,
    Active {
        stop_tx: oneshot::Sender<StopAck>,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Watches a container's cgroup directories for subcontainer changes.
///
/// Moves through `Idle -> Active -> Stopped` exactly once.
pub struct SubcontainerWatcher {
    name: ContainerReference,
    subsystems: Arc<CgroupSubsystems>,
    dirs: BTreeSet<PathBuf>,
    state: State,
}

impl SubcontainerWatcher {
    /// Creates an idle watcher for the given container directories.
    pub fn new(
        name: ContainerReference,
        subsystems: Arc<CgroupSubsystems>,
        dirs: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        Self {
            name,
            subsystems,
            dirs: dirs.into_iter().collect(),
            state: State::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    /// Installs watches on every existing container directory and starts the
    /// background task pushing events onto `queue`.
    ///
    /// The task waits for room in `queue` rather than dropping events.
    ///
    /// # Errors
    ///
    /// Fails if the watcher isn't idle, if inotify can't be set up or if any
    /// watch can't be installed. The watcher stays idle on failure.
    pub async fn watch(&mut self, queue: mpsc::Sender<SubcontainerEvent>) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Active { .. } => return Err(Error::AlreadyWatching(self.name.to_string())),
            State::Stopped => return Err(Error::Stopped(self.name.to_string())),
        }

        let inotify = Inotify::init().map_err(Error::Init)?;
        let mut watches = SubcontainerWatches::new(inotify.watches(), Arc::clone(&self.subsystems));
        for dir in &self.dirs {
            if !dir.exists() {
                log::debug!("Skipping watch on missing cgroup directory `{}`", dir.display());
                continue;
            }
            watches.watch_directory(dir, self.name.name())?;
        }
        let notifier = AsyncFd::new(inotify).map_err(Error::Init)?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(notifier, watches, queue, stop_rx));
        log::debug!("Started watching subcontainers of `{}`", self.name);

        self.state = State::Active { stop_tx, task };
        Ok(())
    }

    /// Stops the background task and releases the inotify instance.
    ///
    /// Waits until the task has acknowledged. A failure to close the inotify
    /// instance is returned, the task exits regardless.
    pub async fn stop(&mut self) -> Result<()> {
        let (stop_tx, task) = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Active { stop_tx, task } => (stop_tx, task),
            State::Idle => {
                self.state = State::Idle;
                return Err(Error::NotStarted(self.name.to_string()));
            }
            State::Stopped => return Err(Error::Stopped(self.name.to_string())),
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if stop_tx.send(ack_tx).is_err() {
            return Err(Error::TaskGone);
        }
        let closed = ack_rx.await.map_err(|_| Error::TaskGone)?;
        if let Err(err) = task.await {
            log::warn!("Watch task of `{}` failed: {err}", self.name);
        }
        log::debug!("Stopped watching subcontainers of `{}`", self.name);

        closed.map_err(Error::Close)
    }
}

enum Step {
    Events(Vec<RawEvent>),
    Failed(io::Error),
    Stop(Option<StopAck>),
}

async fn run(
    mut notifier: AsyncFd<Inotify>,
    mut watches: SubcontainerWatches,
    queue: mpsc::Sender<SubcontainerEvent>,
    mut stop_rx: oneshot::Receiver<StopAck>,
) {
    let mut buffer = [0u8; EVENT_BUFFER_SIZE];

    loop {
        let step = tokio::select! {
            ack = &mut stop_rx => Step::Stop(ack.ok()),
            ready = notifier.readable_mut() => match ready {
                Ok(mut guard) => {
                    let read = guard.try_io(|inner| {
                        let batch: Vec<RawEvent> = inner
                            .get_mut()
                            .read_events(&mut buffer)?
                            .map(RawEvent::from)
                            .collect();
                        if batch.is_empty() {
                            return Err(io::ErrorKind::WouldBlock.into());
                        }
                        Ok(batch)
                    });
                    match read {
                        Ok(Ok(batch)) => Step::Events(batch),
                        Ok(Err(err)) => Step::Failed(err),
                        Err(_would_block) => Step::Events(Vec::new()),
                    }
                }
                Err(err) => Step::Failed(err),
            },
        };

        match step {
            Step::Events(batch) => {
                for event in &batch {
                    if let Err(err) = watches.process_event(event, &queue).await {
                        log::warn!("Error while processing event {event:?}: {err}");
                    }
                }
            }
            Step::Failed(err) => log::warn!("Error while reading inotify events: {err}"),
            Step::Stop(ack) => {
                drop(watches);
                let closed = notifier.into_inner().close();
                match ack {
                    Some(ack) => {
                        let _ = ack.send(closed);
                    }
                    None => {
                        if let Err(err) = closed {
                            log::warn!("Failed to close inotify instance: {err}");
                        }
                    }
                }
                return;
            }
        }
    }
}
