//! Rebuild loop.
//!
//! The watcher keeps a snapshot of modification times for every file under
//! the watched paths. Each tick it takes a fresh snapshot, diffs it against
//! the stored one, and if anything was added, removed, or modified it runs a
//! single rebuild for the whole batch.
//!
//! A tick comes either from a timer (polling) or, after
//! [`Watcher::watch_natively`], from OS file notifications: the first event
//! opens a batch and the tick fires once the tree has been quiet for the
//! interval. Either way the snapshot diff decides what changed, so a spurious
//! event costs one scan and nothing more.
//!
//! ```text
//!   start ──▶ Building ──▶ Idle ──tick, no changes──▶ Idle
//!                           │
//!                           └──tick, changes──▶ Building ──▶ Idle
//! ```
//!
//! Rebuild failures are the caller's business: the rebuild callback reports
//! them and the loop keeps going. Scan failures are handed to an error
//! callback and the next tick tries again.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use walkdir::WalkDir;

/// Longest single sleep, so a stop request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Cannot install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("Cannot start file notifications: {0}")]
    NotifyInit(#[source] notify::Error),
    #[error("Cannot watch {}: {source}", .path.display())]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },
    #[error("File notification error: {0}")]
    Event(#[source] notify::Error),
    #[error("File notifications stopped, falling back to polling")]
    NotifyLost,
}

/// Modification time of every file under a set of paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(BTreeMap<PathBuf, SystemTime>);

impl Snapshot {
    /// Walk `paths` recursively, following symlinks. Paths that don't exist
    /// contribute nothing, and files that disappear mid-walk are skipped.
    pub fn capture(paths: &[PathBuf]) -> Result<Self, WatchError> {
        let mut files = BTreeMap::new();
        for root in paths {
            if !root.exists() {
                continue;
            }
            for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) if is_not_found(err.io_error()) => continue,
                    Err(source) => {
                        return Err(WatchError::Scan {
                            path: root.clone(),
                            source,
                        });
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                // Vanished between listing and stat
                let Ok(modified) = entry
                    .metadata()
                    .map_err(io::Error::from)
                    .and_then(|m| m.modified())
                else {
                    continue;
                };
                files.insert(entry.into_path(), modified);
            }
        }
        Ok(Self(files))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains_key(path)
    }

    /// What changed going from `self` to `newer`.
    pub fn diff(&self, newer: &Snapshot) -> Changes {
        let mut changes = Changes::default();
        for (path, mtime) in &newer.0 {
            match self.0.get(path) {
                None => changes.added.push(path.clone()),
                Some(old) if old != mtime => changes.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        changes.removed = self
            .0
            .keys()
            .filter(|path| !newer.0.contains_key(*path))
            .cloned()
            .collect();
        changes
    }
}

fn is_not_found(err: Option<&io::Error>) -> bool {
    err.is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// One batch of file changes, each list in path order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Building,
}

/// OS notification source. Watched paths that don't exist yet are covered
/// through their parent directory until they appear.
#[derive(Debug)]
struct Native {
    watcher: RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
    pending: Vec<PathBuf>,
}

enum Wake {
    Batch,
    Stopped,
    Disconnected,
}

impl Native {
    fn new(paths: &[PathBuf]) -> Result<Self, WatchError> {
        let (tx, events) = mpsc::channel();
        let watcher = notify::recommended_watcher(tx).map_err(WatchError::NotifyInit)?;
        let mut native = Self {
            watcher,
            events,
            pending: Vec::new(),
        };
        for path in paths {
            if path.exists() {
                native.add(path)?;
            } else {
                let parent = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                native
                    .watcher
                    .watch(parent, RecursiveMode::NonRecursive)
                    .map_err(|source| WatchError::Notify {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                native.pending.push(path.clone());
            }
        }
        Ok(native)
    }

    fn add(&mut self, path: &Path) -> Result<(), WatchError> {
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watcher
            .watch(path, mode)
            .map_err(|source| WatchError::Notify {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Start watching pending paths that have been created since.
    fn adopt_created(&mut self) -> Result<(), WatchError> {
        for i in (0..self.pending.len()).rev() {
            if self.pending[i].exists() {
                let path = self.pending[i].clone();
                self.add(&path)?;
                self.pending.swap_remove(i);
            }
        }
        Ok(())
    }

    /// Block until a relevant event arrives, then until `quiet` passes with
    /// no further ones.
    fn wait_for_batch(
        &self,
        quiet: Duration,
        stop: &AtomicBool,
        on_error: &mut impl FnMut(&WatchError),
    ) -> Wake {
        let mut last_event: Option<Instant> = None;
        loop {
            if stop.load(Ordering::SeqCst) {
                return Wake::Stopped;
            }
            let timeout = match last_event {
                None => SLEEP_SLICE,
                Some(at) => {
                    let waited = at.elapsed();
                    if waited >= quiet {
                        return Wake::Batch;
                    }
                    (quiet - waited).min(SLEEP_SLICE)
                }
            };
            match self.events.recv_timeout(timeout) {
                Ok(Ok(event)) if is_relevant(&event) => last_event = Some(Instant::now()),
                Ok(Ok(_)) | Err(RecvTimeoutError::Timeout) => {}
                Ok(Err(source)) => on_error(&WatchError::Event(source)),
                Err(RecvTimeoutError::Disconnected) => return Wake::Disconnected,
            }
        }
    }
}

/// Reads and opens don't change anything a build depends on.
fn is_relevant(event: &notify::Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
}

#[derive(Debug)]
pub struct Watcher {
    paths: Vec<PathBuf>,
    interval: Duration,
    snapshot: Snapshot,
    state: WatchState,
    native: Option<Native>,
}

impl Watcher {
    /// Run the initial build, then record the starting snapshot.
    pub fn start(
        paths: Vec<PathBuf>,
        interval: Duration,
        initial_build: impl FnOnce(),
    ) -> Result<Self, WatchError> {
        let mut watcher = Self {
            paths,
            interval,
            snapshot: Snapshot::default(),
            state: WatchState::Building,
            native: None,
        };
        initial_build();
        watcher.snapshot = Snapshot::capture(&watcher.paths)?;
        watcher.state = WatchState::Idle;
        Ok(watcher)
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Wake on OS file notifications instead of a timer. On error the
    /// watcher keeps polling.
    pub fn watch_natively(&mut self) -> Result<(), WatchError> {
        self.native = Some(Native::new(&self.paths)?);
        Ok(())
    }

    pub fn is_native(&self) -> bool {
        self.native.is_some()
    }

    /// Check once for changes, rebuilding if there are any.
    ///
    /// The stored snapshot becomes the one that triggered the rebuild, so
    /// edits made while building are picked up on the next poll.
    pub fn poll(
        &mut self,
        rebuild: &mut impl FnMut(&Changes),
    ) -> Result<Option<Changes>, WatchError> {
        let current = Snapshot::capture(&self.paths)?;
        let changes = self.snapshot.diff(&current);
        if changes.is_empty() {
            return Ok(None);
        }

        self.state = WatchState::Building;
        rebuild(&changes);
        self.snapshot = current;
        self.state = WatchState::Idle;
        Ok(Some(changes))
    }

    /// Poll on every tick until `stop` is set. A failed scan is passed to
    /// `on_error` and leaves the stored snapshot untouched.
    pub fn run(
        &mut self,
        stop: &AtomicBool,
        mut rebuild: impl FnMut(&Changes),
        mut on_error: impl FnMut(&WatchError),
    ) {
        while !stop.load(Ordering::SeqCst) {
            if let Some(native) = &mut self.native {
                match native.wait_for_batch(self.interval, stop, &mut on_error) {
                    Wake::Batch => {
                        if let Err(err) = native.adopt_created() {
                            on_error(&err);
                        }
                    }
                    Wake::Stopped => break,
                    Wake::Disconnected => {
                        self.native = None;
                        on_error(&WatchError::NotifyLost);
                    }
                }
            } else {
                sleep_unless_stopped(self.interval, stop);
            }
            if stop.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.poll(&mut rebuild) {
                on_error(&err);
            }
        }
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::SeqCst) {
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn touch_later(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        let mtime = fs::metadata(path).unwrap().modified().unwrap() + Duration::from_secs(secs);
        file.set_modified(mtime).unwrap();
    }

    fn project() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let posts = tmp.path().join("posts");
        fs::create_dir_all(posts.join("img")).unwrap();
        fs::write(posts.join("a.md"), "# A").unwrap();
        fs::write(posts.join("img/x.png"), "x").unwrap();
        (tmp, posts)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    #[test]
    fn capture_walks_recursively_and_skips_missing() {
        let (tmp, posts) = project();
        let config = tmp.path().join("config.toml");
        let snap = Snapshot::capture(&[posts.clone(), tmp.path().join("nope"), config]).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(snap.contains(&posts.join("a.md")));
        assert!(snap.contains(&posts.join("img/x.png")));
    }

    #[test]
    fn capture_accepts_single_files() {
        let tmp = TempDir::new().unwrap();
        let config = tmp.path().join("config.toml");
        fs::write(&config, "").unwrap();
        let snap = Snapshot::capture(std::slice::from_ref(&config)).unwrap();
        assert!(snap.contains(&config));
    }

    #[test]
    fn diff_classifies_changes() {
        let (_tmp, posts) = project();
        let before = Snapshot::capture(std::slice::from_ref(&posts)).unwrap();

        fs::write(posts.join("b.md"), "# B").unwrap();
        fs::remove_file(posts.join("img/x.png")).unwrap();
        touch_later(&posts.join("a.md"), 5);

        let changes = before.diff(&Snapshot::capture(std::slice::from_ref(&posts)).unwrap());
        assert_eq!(changes.added, vec![posts.join("b.md")]);
        assert_eq!(changes.removed, vec![posts.join("img/x.png")]);
        assert_eq!(changes.modified, vec![posts.join("a.md")]);
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let (_tmp, posts) = project();
        let a = Snapshot::capture(std::slice::from_ref(&posts)).unwrap();
        let b = Snapshot::capture(std::slice::from_ref(&posts)).unwrap();
        assert!(a.diff(&b).is_empty());
    }

    // =========================================================================
    // Watcher
    // =========================================================================

    #[test]
    fn start_runs_initial_build_then_idles() {
        let (_tmp, posts) = project();
        let mut built = false;
        let watcher = Watcher::start(vec![posts], Duration::from_millis(10), || built = true).unwrap();
        assert!(built);
        assert_eq!(watcher.state(), WatchState::Idle);
        assert_eq!(watcher.snapshot().len(), 2);
    }

    #[test]
    fn mtime_change_triggers_exactly_one_rebuild() {
        let (_tmp, posts) = project();
        let mut watcher = Watcher::start(vec![posts.clone()], Duration::from_millis(10), || {}).unwrap();
        let before = watcher.snapshot().clone();

        touch_later(&posts.join("a.md"), 10);
        fs::write(posts.join("b.md"), "# B").unwrap();

        let mut rebuilds = 0;
        let changes = watcher.poll(&mut |_: &Changes| rebuilds += 1).unwrap().unwrap();
        assert_eq!(rebuilds, 1);
        assert_eq!(changes.modified, vec![posts.join("a.md")]);
        assert_eq!(changes.added, vec![posts.join("b.md")]);
        assert_ne!(watcher.snapshot(), &before);
        assert!(watcher.snapshot().contains(&posts.join("b.md")));
        assert_eq!(watcher.state(), WatchState::Idle);

        assert!(watcher.poll(&mut |_: &Changes| rebuilds += 1).unwrap().is_none());
        assert_eq!(rebuilds, 1);
    }

    #[test]
    fn directory_created_after_start_is_picked_up() {
        let tmp = TempDir::new().unwrap();
        let components = tmp.path().join("src/components");
        let mut watcher =
            Watcher::start(vec![components.clone()], Duration::from_millis(10), || {}).unwrap();
        assert!(watcher.snapshot().is_empty());

        fs::create_dir_all(&components).unwrap();
        fs::write(components.join("footer.html"), "<footer>").unwrap();

        let changes = watcher.poll(&mut |_: &Changes| {}).unwrap().unwrap();
        assert_eq!(changes.added, vec![components.join("footer.html")]);
    }

    #[test]
    fn run_returns_once_stopped() {
        let (_tmp, posts) = project();
        let mut watcher = Watcher::start(vec![posts.clone()], Duration::from_millis(10), || {}).unwrap();
        fs::write(posts.join("b.md"), "# B").unwrap();

        let stop = AtomicBool::new(false);
        let mut rebuilds = 0;
        watcher.run(
            &stop,
            |_| {
                rebuilds += 1;
                stop.store(true, Ordering::SeqCst);
            },
            |err| panic!("unexpected scan error: {err}"),
        );
        assert_eq!(rebuilds, 1);
    }

    #[test]
    fn run_with_stop_already_set_does_nothing() {
        let (_tmp, posts) = project();
        let mut watcher = Watcher::start(vec![posts.clone()], Duration::from_millis(10), || {}).unwrap();
        fs::write(posts.join("b.md"), "# B").unwrap();

        let stop = AtomicBool::new(true);
        let mut rebuilds = 0;
        watcher.run(&stop, |_| rebuilds += 1, |_| {});
        assert_eq!(rebuilds, 0);
    }

    #[cfg(unix)]
    #[test]
    fn scan_error_is_reported_and_watching_continues() {
        let (_tmp, posts) = project();
        let mut watcher = Watcher::start(vec![posts.clone()], Duration::from_millis(10), || {}).unwrap();
        let before = watcher.snapshot().clone();
        std::os::unix::fs::symlink(&posts, posts.join("img/loop")).unwrap();

        let stop = AtomicBool::new(false);
        let mut errors = Vec::new();
        watcher.run(
            &stop,
            |_| panic!("no rebuild while the scan fails"),
            |err| {
                errors.push(err.to_string());
                if errors.len() == 2 {
                    stop.store(true, Ordering::SeqCst);
                }
            },
        );
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Cannot scan"));
        assert_eq!(watcher.snapshot(), &before);
        assert_eq!(watcher.state(), WatchState::Idle);

        fs::remove_file(posts.join("img/loop")).unwrap();
        assert_eq!(watcher.poll(&mut |_: &Changes| {}).unwrap(), None);
    }

    // =========================================================================
    // Native notifications
    // =========================================================================

    /// Sets `stop` after `limit` unless something else set it first, so a
    /// missed notification fails the test instead of hanging it.
    fn stop_after(stop: &AtomicBool, limit: Duration) {
        let deadline = Instant::now() + limit;
        while !stop.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        stop.store(true, Ordering::SeqCst);
    }

    #[test]
    fn access_events_do_not_open_a_batch() {
        use notify::event::{AccessKind, CreateKind, ModifyKind};
        assert!(!is_relevant(&notify::Event::new(EventKind::Access(AccessKind::Any))));
        assert!(is_relevant(&notify::Event::new(EventKind::Create(CreateKind::File))));
        assert!(is_relevant(&notify::Event::new(EventKind::Modify(ModifyKind::Any))));
    }

    #[test]
    fn native_burst_is_one_rebuild() {
        let (_tmp, posts) = project();
        let mut watcher = Watcher::start(vec![posts.clone()], Duration::from_millis(200), || {}).unwrap();
        watcher.watch_natively().unwrap();
        assert!(watcher.is_native());

        let stop = AtomicBool::new(false);
        let mut batches = Vec::new();
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(100));
                fs::write(posts.join("b.md"), "# B").unwrap();
                fs::write(posts.join("img/y.png"), "y").unwrap();
            });
            s.spawn(|| stop_after(&stop, Duration::from_secs(5)));
            watcher.run(
                &stop,
                |changes| {
                    batches.push(changes.clone());
                    stop.store(true, Ordering::SeqCst);
                },
                |err| panic!("unexpected watch error: {err}"),
            );
        });

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].added, vec![posts.join("b.md"), posts.join("img/y.png")]);
        assert_eq!(watcher.state(), WatchState::Idle);
    }

    #[test]
    fn native_covers_directory_created_later() {
        let tmp = TempDir::new().unwrap();
        let drafts = tmp.path().join("drafts");
        let mut watcher = Watcher::start(vec![drafts.clone()], Duration::from_millis(50), || {}).unwrap();
        watcher.watch_natively().unwrap();

        let stop = AtomicBool::new(false);
        let mut batches = Vec::new();
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(50));
                fs::create_dir(&drafts).unwrap();
                // Past the quiet period, so the file lands under the new watch
                thread::sleep(Duration::from_millis(300));
                fs::write(drafts.join("new.md"), "# New").unwrap();
            });
            s.spawn(|| stop_after(&stop, Duration::from_secs(5)));
            watcher.run(
                &stop,
                |changes| {
                    batches.push(changes.clone());
                    stop.store(true, Ordering::SeqCst);
                },
                |err| panic!("unexpected watch error: {err}"),
            );
        });

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].added, vec![drafts.join("new.md")]);
    }
}
