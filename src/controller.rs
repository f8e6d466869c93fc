//! Running imports off the caller's thread.
//!
//! A UI submits an import and keeps its event loop responsive. If the user
//! picks the same file again before the first run finishes, the new
//! submission supersedes the old one: the old worker is not interrupted
//! mid-read, but it stops at the next stage boundary and its result is
//! discarded. Two invocations for the same key never both run to the end.
//!
//! Each logical key has a generation counter. A submission bumps it and
//! remembers the value it got; a handle whose remembered generation is no
//! longer current is superseded. A key's counter is forgotten when the
//! handle of its current submission is dropped (after [`ImportHandle::wait`]
//! or unwaited) or the key is cancelled, so only keys with live handles are
//! tracked.
//!
//! # Example
//!
//! ```rust
//! use chatprep::controller::ImportController;
//! use chatprep::document::RawInput;
//! use chatprep::pipeline::ImportPipeline;
//!
//! let controller = ImportController::new(ImportPipeline::new());
//!
//! let first = controller.submit("chat.txt", RawInput::new("old contents"));
//! let second = controller.submit("chat.txt", RawInput::new("12/05/2023, 10:01 - A: b"));
//!
//! assert!(first.wait().is_none());
//! assert!(second.wait().is_some_and(|r| r.is_ok()));
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::document::RawInput;
use crate::error::Result;
use crate::pipeline::{ImportOutcome, ImportPipeline};

/// Identifies one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportTicket {
    /// Logical key, typically the file path
    pub key: String,
    /// Generation this submission got for its key (1 when no earlier handle
    /// for the key was alive)
    pub generation: u64,
}

/// A submitted import running on a background thread.
///
/// Dropping the handle of the current submission without waiting abandons
/// the run: nobody can collect its result any more.
#[derive(Debug)]
pub struct ImportHandle {
    ticket: ImportTicket,
    latest: Arc<AtomicU64>,
    generations: Arc<Generations>,
    worker: Option<JoinHandle<Option<Result<ImportOutcome>>>>,
}

impl ImportHandle {
    pub fn ticket(&self) -> &ImportTicket {
        &self.ticket
    }

    /// Returns `true` if a newer submission for the same key exists.
    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.ticket.generation
    }

    /// Returns `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Blocks until the worker finishes.
    ///
    /// Returns `None` if this submission was superseded, whether before the
    /// worker started or while it ran.
    pub fn wait(mut self) -> Option<Result<ImportOutcome>> {
        let result = match self.worker.take()?.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        };

        if self.latest.load(Ordering::Acquire) != self.ticket.generation {
            tracing::debug!(
                key = %self.ticket.key,
                generation = self.ticket.generation,
                "discarding superseded import"
            );
            return None;
        }
        result
    }
}

impl Drop for ImportHandle {
    fn drop(&mut self) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        let is_current = generations.get(&self.ticket.key).is_some_and(|c| {
            Arc::ptr_eq(c, &self.latest) && c.load(Ordering::Acquire) == self.ticket.generation
        });
        if is_current {
            // Stops a run nobody waited for at its next stage boundary.
            self.latest.fetch_add(1, Ordering::AcqRel);
            generations.remove(&self.ticket.key);
        }
    }
}

/// Runs pipeline invocations on background threads, one current
/// invocation per key.
#[derive(Debug)]
pub struct ImportController {
    pipeline: Arc<ImportPipeline>,
    generations: Arc<Generations>,
}

type Generations = Mutex<HashMap<String, Arc<AtomicU64>>>;

impl ImportController {
    pub fn new(pipeline: ImportPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts normalizing `input` in the background under `key`.
    ///
    /// Any earlier submission for `key` is superseded.
    pub fn submit(&self, key: impl Into<String>, input: RawInput) -> ImportHandle {
        let pipeline = Arc::clone(&self.pipeline);
        self.spawn(key.into(), move |abandoned| pipeline.normalize_until(input, abandoned))
    }

    /// Starts normalizing the file at `path`, keyed by the path.
    pub fn submit_path(&self, path: impl AsRef<Path>) -> ImportHandle {
        let path = path.as_ref().to_path_buf();
        let key = path.to_string_lossy().into_owned();
        let pipeline = Arc::clone(&self.pipeline);
        self.spawn(key, move |abandoned| pipeline.normalize_path_until(&path, abandoned))
    }

    /// Supersedes every in-flight submission for `key`.
    ///
    /// Returns `false` if nothing is in flight under `key`.
    pub fn cancel(&self, key: &str) -> bool {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        match generations.remove(key) {
            Some(counter) => {
                counter.fetch_add(1, Ordering::AcqRel);
                tracing::debug!(key, "import cancelled");
                true
            }
            None => false,
        }
    }

    /// Current generation for `key`, while work for it is in flight.
    pub fn current_generation(&self, key: &str) -> Option<u64> {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        generations.get(key).map(|c| c.load(Ordering::Acquire))
    }

    fn spawn<F>(&self, key: String, job: F) -> ImportHandle
    where
        F: FnOnce(&dyn Fn() -> bool) -> Result<ImportOutcome> + Send + 'static,
    {
        let (latest, generation) = self.next_generation(&key);
        let ticket = ImportTicket { key, generation };

        let current = Arc::clone(&latest);
        let worker_key = ticket.key.clone();
        let worker = std::thread::spawn(move || {
            let abandoned = || current.load(Ordering::Acquire) != generation;

            if abandoned() {
                tracing::debug!(key = %worker_key, generation, "import superseded before start");
                return None;
            }
            match job(&abandoned) {
                Err(err) if err.is_abandoned() => None,
                result => Some(result),
            }
        });

        ImportHandle {
            ticket,
            latest,
            generations: Arc::clone(&self.generations),
            worker: Some(worker),
        }
    }

    fn next_generation(&self, key: &str) -> (Arc<AtomicU64>, u64) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = generations
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)));
        let generation = counter.fetch_add(1, Ordering::AcqRel) + 1;
        if generation > 1 {
            tracing::debug!(key, generation, "superseding earlier import");
        }
        (Arc::clone(counter), generation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::pipeline::PipelineStage;
    use crate::progress::StageProgress;

    const CHAT: &str = "12/05/2023, 10:01 - Alice: hello";

    #[test]
    fn test_single_submission_completes() {
        let controller = ImportController::new(ImportPipeline::new());
        let handle = controller.submit("a", RawInput::new(CHAT));
        assert_eq!(handle.ticket().generation, 1);
        assert!(!handle.is_superseded());

        let outcome = handle.wait().unwrap().unwrap();
        assert!(outcome.verdict.is_accepted());
    }

    #[test]
    fn test_newer_submission_supersedes() {
        let controller = ImportController::new(ImportPipeline::new());
        let first = controller.submit("chat", RawInput::new(CHAT));
        let second = controller.submit("chat", RawInput::new(CHAT));

        assert!(first.is_superseded());
        assert!(!second.is_superseded());
        assert_eq!(second.ticket().generation, 2);
        assert!(first.wait().is_none());
        assert!(second.wait().is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let controller = ImportController::new(ImportPipeline::new());
        let a = controller.submit("a", RawInput::new(CHAT));
        let b = controller.submit("b", RawInput::new(CHAT));
        assert!(a.wait().is_some());
        assert!(b.wait().is_some());
    }

    #[test]
    fn test_cancel() {
        let controller = ImportController::new(ImportPipeline::new());
        assert!(!controller.cancel("missing"));

        let handle = controller.submit("chat", RawInput::new(CHAT));
        assert!(controller.cancel("chat"));
        assert!(handle.wait().is_none());
        assert_eq!(controller.current_generation("chat"), None);
        assert!(!controller.cancel("chat"));
    }

    #[test]
    fn test_finished_keys_are_forgotten() {
        let controller = ImportController::new(ImportPipeline::new());
        for i in 0..16 {
            let handle = controller.submit(format!("chat-{i}.txt"), RawInput::new(CHAT));
            assert!(handle.wait().is_some());
        }
        assert!(controller.generations.lock().unwrap().is_empty());

        // A fresh submission after cleanup starts over and is not superseded.
        let handle = controller.submit("chat-0.txt", RawInput::new(CHAT));
        assert_eq!(handle.ticket().generation, 1);
        assert!(handle.wait().unwrap().is_ok());
    }

    #[test]
    fn test_dropped_handle_releases_key() {
        let controller = ImportController::new(ImportPipeline::new());
        let handle = controller.submit("chat", RawInput::new(CHAT));
        assert_eq!(controller.current_generation("chat"), Some(1));
        drop(handle);
        assert_eq!(controller.current_generation("chat"), None);

        // A superseded handle going away leaves the newer submission tracked.
        let first = controller.submit("chat", RawInput::new(CHAT));
        let second = controller.submit("chat", RawInput::new(CHAT));
        drop(first);
        assert_eq!(controller.current_generation("chat"), Some(2));
        assert!(second.wait().unwrap().is_ok());
    }

    #[test]
    fn test_superseded_run_never_reaches_done() {
        const FIRST: &str = "12/05/2023, 10:01 - Alice: first";
        const SECOND: &str = "12/05/2023, 10:01 - Alice: the second, longer one";

        let (sniffed_tx, sniffed_rx) = mpsc::channel::<()>();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();
        let resume_rx = Mutex::new(resume_rx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        // Holds the first run right after sniffing until the second is submitted.
        let pipeline = ImportPipeline::new().with_progress(Arc::new(move |p: StageProgress| {
            sink.lock().unwrap().push((p.input_bytes, p.stage));
            if p.input_bytes == FIRST.len() as u64 && p.stage == PipelineStage::Sniffed {
                sniffed_tx.send(()).unwrap();
                resume_rx.lock().unwrap().recv().unwrap();
            }
        }));
        let controller = ImportController::new(pipeline);

        let first = controller.submit("chat.txt", RawInput::new(FIRST));
        sniffed_rx.recv().unwrap();
        let second = controller.submit("chat.txt", RawInput::new(SECOND));
        resume_tx.send(()).unwrap();

        assert!(first.wait().is_none());
        assert!(second.wait().unwrap().is_ok());

        let seen = seen.lock().unwrap();
        let first_stages: Vec<PipelineStage> = seen
            .iter()
            .filter(|(bytes, _)| *bytes == FIRST.len() as u64)
            .map(|(_, stage)| *stage)
            .collect();
        assert_eq!(first_stages, vec![PipelineStage::Start, PipelineStage::Sniffed]);

        let done: Vec<u64> = seen
            .iter()
            .filter(|(_, stage)| *stage == PipelineStage::Done)
            .map(|(bytes, _)| *bytes)
            .collect();
        assert_eq!(done, vec![SECOND.len() as u64]);
    }

    #[test]
    fn test_errors_are_delivered() {
        let controller = ImportController::new(ImportPipeline::new());
        let handle = controller.submit("empty", RawInput::new(Vec::new()));
        let result = handle.wait().unwrap();
        assert!(result.unwrap_err().is_empty_input());
    }

    #[test]
    fn test_submit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WhatsApp Chat.txt");
        std::fs::write(&path, CHAT).unwrap();

        let controller = ImportController::new(ImportPipeline::new());
        let handle = controller.submit_path(&path);
        assert_eq!(handle.ticket().key, path.to_string_lossy());
        assert!(handle.wait().unwrap().is_ok());
    }
}
