//! Staggered delivery of exported files.
//!
//! Files are handed to a [`DownloadSink`] one at a time with a fixed delay
//! between them, so a browser-like receiver does not treat the burst as a
//! popup flood. A [`DeliveryHandle`] can cancel whatever has not been
//! delivered yet.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{FaviconError, Result};
use crate::export::Artifact;

/// Gap between consecutive deliveries.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

const CANCEL_POLL: Duration = Duration::from_millis(10);

// ============================================================================
// Sinks
// ============================================================================

/// Receives delivered files.
pub trait DownloadSink: Send {
    fn deliver(&mut self, artifact: &Artifact) -> Result<()>;
}

/// Writes each file into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, artifact: &Artifact) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.filename);
        fs::write(&path, &artifact.bytes)?;
        debug!(path = %path.display(), "wrote artifact");
        Ok(())
    }
}

/// Keeps delivered files in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Artifact>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything delivered so far.
    pub fn artifacts(&self) -> Vec<Artifact> {
        match self.delivered.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn filenames(&self) -> Vec<String> {
        self.artifacts().into_iter().map(|a| a.filename).collect()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, artifact: &Artifact) -> Result<()> {
        let mut guard = match self.delivered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(artifact.clone());
        Ok(())
    }
}

// ============================================================================
// Report & Handle
// ============================================================================

/// What happened to each file of a delivery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    /// Files dropped because the delivery was cancelled.
    pub cancelled: Vec<String>,
    /// Files the sink rejected, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Controls a delivery running in the background.
#[derive(Debug)]
pub struct DeliveryHandle {
    cancel_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<DeliveryReport>>,
}

impl DeliveryHandle {
    /// Stops any delivery that has not started yet.
    pub fn cancel(&self) {
        if !self.cancel_flag.swap(true, Ordering::SeqCst) {
            info!("delivery cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Returns true once every file has been handled.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the delivery to finish.
    pub fn join(mut self) -> Result<DeliveryReport> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| FaviconError::Io(std::io::Error::other("delivery thread panicked"))),
            None => Ok(DeliveryReport::default()),
        }
    }
}

// ============================================================================
// StaggeredDelivery
// ============================================================================

/// Delivers files one by one, `delay` apart.
#[derive(Debug, Clone, Copy)]
pub struct StaggeredDelivery {
    delay: Duration,
}

impl Default for StaggeredDelivery {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl StaggeredDelivery {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delivers on the calling thread. File `i` is delivered `i * delay`
    /// after the first; `cancel` is checked before each one.
    pub fn run(
        &self,
        artifacts: &[Artifact],
        sink: &mut dyn DownloadSink,
        cancel: &AtomicBool,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let start = Instant::now();

        for (index, artifact) in artifacts.iter().enumerate() {
            let due = self.delay * index as u32;
            if !wait_until(start + due, cancel) {
                report.cancelled.extend(artifacts[index..].iter().map(|a| a.filename.clone()));
                warn!(remaining = artifacts.len() - index, "delivery cancelled");
                break;
            }

            match sink.deliver(artifact) {
                Ok(()) => report.delivered.push(artifact.filename.clone()),
                Err(e) => {
                    warn!(filename = %artifact.filename, error = %e, "delivery failed");
                    report.failed.push((artifact.filename.clone(), e.to_string()));
                }
            }
        }

        info!(
            delivered = report.delivered.len(),
            cancelled = report.cancelled.len(),
            failed = report.failed.len(),
            "delivery finished"
        );
        report
    }

    /// Delivers on a background thread and returns a handle to it.
    pub fn spawn<S>(&self, artifacts: Vec<Artifact>, mut sink: S) -> Result<DeliveryHandle>
    where
        S: DownloadSink + 'static,
    {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let cancel_clone = Arc::clone(&cancel_flag);
        let this = *self;

        let worker = std::thread::Builder::new()
            .name("favicon-delivery".to_string())
            .spawn(move || this.run(&artifacts, &mut sink, &cancel_clone))?;

        Ok(DeliveryHandle {
            cancel_flag,
            worker: Some(worker),
        })
    }
}

/// Sleeps until `deadline`. Returns false if cancelled first.
fn wait_until(deadline: Instant, cancel: &AtomicBool) -> bool {
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ArtifactFormat;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            filename: name.to_string(),
            format: ArtifactFormat::Png,
            bytes: name.as_bytes().to_vec(),
        }
    }

    struct FailingSink;

    impl DownloadSink for FailingSink {
        fn deliver(&mut self, artifact: &Artifact) -> Result<()> {
            if artifact.filename.starts_with("bad") {
                Err(FaviconError::Io(std::io::Error::other("disk full")))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn delivers_in_order() {
        let files = vec![artifact("a.png"), artifact("b.png"), artifact("c.ico")];
        let mut sink = MemorySink::new();
        let report = StaggeredDelivery::new(Duration::ZERO).run(&files, &mut sink, &AtomicBool::new(false));

        assert_eq!(report.delivered, vec!["a.png", "b.png", "c.ico"]);
        assert_eq!(sink.filenames(), vec!["a.png", "b.png", "c.ico"]);
    }

    #[test]
    fn deliveries_are_staggered() {
        let files = vec![artifact("a"), artifact("b"), artifact("c")];
        let start = Instant::now();
        StaggeredDelivery::new(Duration::from_millis(20)).run(
            &files,
            &mut MemorySink::new(),
            &AtomicBool::new(false),
        );
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn failure_does_not_stop_the_rest() {
        let files = vec![artifact("ok-1"), artifact("bad"), artifact("ok-2")];
        let report = StaggeredDelivery::new(Duration::ZERO).run(&files, &mut FailingSink, &AtomicBool::new(false));

        assert_eq!(report.delivered, vec!["ok-1", "ok-2"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad");
    }

    #[test]
    fn pre_cancelled_delivers_nothing() {
        let files = vec![artifact("a"), artifact("b")];
        let mut sink = MemorySink::new();
        let report = StaggeredDelivery::default().run(&files, &mut sink, &AtomicBool::new(true));

        assert!(report.delivered.is_empty());
        assert_eq!(report.cancelled, vec!["a", "b"]);
        assert!(sink.artifacts().is_empty());
    }

    #[test]
    fn cancel_stops_pending_background_deliveries() {
        let files: Vec<_> = (0..5).map(|i| artifact(&format!("f{i}"))).collect();
        let sink = MemorySink::new();
        let handle = StaggeredDelivery::new(Duration::from_secs(10))
            .spawn(files, sink.clone())
            .unwrap();

        // The first file is due immediately.
        let start = Instant::now();
        while sink.artifacts().is_empty() && start.elapsed() < Duration::from_secs(5) {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();
        assert!(handle.is_cancelled());

        let report = handle.join().unwrap();
        assert_eq!(report.delivered, vec!["f0"]);
        assert_eq!(report.cancelled.len(), 4);
        assert_eq!(sink.filenames(), vec!["f0"]);
    }

    #[test]
    fn directory_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let mut sink = DirectorySink::new(&target);

        sink.deliver(&artifact("favicon.ico")).unwrap();
        assert_eq!(fs::read(target.join("favicon.ico")).unwrap(), b"favicon.ico");
    }
}
