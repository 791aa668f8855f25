//! Persistence collaborator: an optional on-disk log of queued jobs, so a
//! restart does not silently drop unfinished work. `jobhub-core` has no
//! notion of this; the dispatcher thread calls into a `JobStore` at the
//! points the protocol's persisted-state layout requires (job creation,
//! completion, failure).

use jobhub_core::Job;
use std::path::PathBuf;

/// A place to durably record queued jobs.
pub trait JobStore: Send {
    /// Called once a job has been accepted and queued, before the
    /// `JOB_CREATED` reply is sent to the submitting client.
    fn persist(&mut self, job: &Job) -> anyhow::Result<()>;

    /// Called once a job has completed or failed and left the job table.
    fn remove(&mut self, handle: &str) -> anyhow::Result<()>;
}

/// The default store: does nothing. Used when no `--job-log-dir` is
/// configured.
#[derive(Debug, Default)]
pub struct NullJobStore;

impl JobStore for NullJobStore {
    fn persist(&mut self, _job: &Job) -> anyhow::Result<()> {
        Ok(())
    }

    fn remove(&mut self, _handle: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Appends one line per live job to a file on disk, truncating and
/// rewriting it on every change. Adequate for the modest job counts this
/// server expects; a real deployment replacing this with a proper
/// write-ahead log would implement the same trait.
#[derive(Debug)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    /// Use `dir` (created if missing) to hold one file per live job.
    pub fn new(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(FileJobStore { dir })
    }

    fn path_for(&self, handle: &str) -> PathBuf {
        self.dir.join(handle.replace(':', "_"))
    }
}

impl JobStore for FileJobStore {
    fn persist(&mut self, job: &Job) -> anyhow::Result<()> {
        let path = self.path_for(&job.handle);
        std::fs::write(path, &job.workload)?;
        Ok(())
    }

    fn remove(&mut self, handle: &str) -> anyhow::Result<()> {
        let path = self.path_for(handle);
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
