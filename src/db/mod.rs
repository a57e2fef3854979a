//! SQLite readings store.
//!
//! One connection is owned by a worker thread. Async callers hand it
//! closures through a channel and await the result on a oneshot, so
//! blocking SQLite calls never run on the tokio workers.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
mod repositories;

use migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Owns the worker thread. Dropping the last handle closes the job
/// channel, which ends the worker loop, and then joins the thread.
struct StoreWorker {
    jobs: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.join() {
                error!("Readings store thread panicked: {err:?}");
            }
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL mode unavailable for {}: {err}", path.display());
    }
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

/// Handle to the readings store. Clones share the same worker.
#[derive(Clone)]
pub struct Database {
    worker: Arc<StoreWorker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Opens (or creates) the store at `path` and brings its schema up to
    /// date before returning.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let thread_path = path.clone();

        let handle = thread::Builder::new()
            .name("glasomat-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&thread_path) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }

                for job in jobs_rx {
                    job(&mut conn);
                }
            })
            .context("failed to spawn readings store thread")?;

        let worker = StoreWorker {
            jobs: Some(jobs_tx),
            handle: Some(handle),
        };

        // On failure `worker` drops here and joins the exited thread.
        ready_rx
            .recv()
            .context("readings store thread exited during startup")??;

        info!("Readings store opened at {}", path.display());

        Ok(Self {
            worker: Arc::new(worker),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Runs `task` on the store thread and returns its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("readings store is shut down"))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        jobs.send(Box::new(move |conn| {
            // The caller may have been cancelled; its result is then unused.
            let _ = reply_tx.send(task(conn));
        }))
        .map_err(|_| anyhow!("readings store thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("readings store thread stopped before replying"))?
    }
}
