//! Entity store: the sole owner of job and worker records.
//!
//! Reads go straight through [`EntityStore`]; every mutation happens inside a
//! [`StoreTransaction`] obtained from [`EntityStore::begin`]. A transaction
//! that is dropped without [`StoreTransaction::commit`] rolls back, so a
//! failed bulk insert never becomes partially visible.
//!
//! Deleting a job unassigns its workers (their `job_id` becomes `None`);
//! every implementation applies that same policy.

use std::sync::Arc;

use async_trait::async_trait;

use jobtrack_core::{JobId, WorkerId};
use jobtrack_jobs::{Job, JobQuery, JobSummary, NewJob, NewWorker, Page, Stats, Worker, WorkerQuery};

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryEntityStore;
pub use sqlite::SqliteEntityStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure. Never caused by caller input.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

/// Read access plus the entry point for transactional writes.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Start a unit of work. Dropping it without committing rolls back.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn get_job(&self, id: JobId) -> StoreResult<Option<JobSummary>>;

    /// Filter, sort and page jobs; worker counts are read in the same snapshot.
    async fn list_jobs(&self, query: &JobQuery) -> StoreResult<Page<JobSummary>>;

    async fn get_worker(&self, id: WorkerId) -> StoreResult<Option<Worker>>;

    async fn list_workers(&self, query: &WorkerQuery) -> StoreResult<Page<Worker>>;

    /// All workers assigned to a job in creation order, or `None` if the job
    /// does not exist.
    async fn workers_for_job(&self, id: JobId) -> StoreResult<Option<Vec<Worker>>>;

    /// Grouped counts over every stored job and worker.
    async fn stats(&self) -> StoreResult<Stats>;
}

/// A scoped set of writes applied atomically on [`commit`](Self::commit).
#[async_trait]
pub trait StoreTransaction: Send {
    async fn job_exists(&mut self, id: JobId) -> StoreResult<bool>;

    async fn insert_job(&mut self, job: NewJob) -> StoreResult<Job>;

    async fn insert_worker(&mut self, worker: NewWorker) -> StoreResult<Worker>;

    /// Delete a job and unassign its workers. Returns `false` if it did not exist.
    async fn delete_job(&mut self, id: JobId) -> StoreResult<bool>;

    /// Returns `false` if the worker did not exist.
    async fn delete_worker(&mut self, id: WorkerId) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Open the configured store: SQLite when a database URL is given,
/// otherwise a fresh in-memory store.
pub async fn connect(database_url: Option<&str>) -> StoreResult<Arc<dyn EntityStore>> {
    match database_url {
        Some(url) => {
            tracing::info!(url, "using sqlite entity store");
            Ok(Arc::new(SqliteEntityStore::connect(url).await?))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory entity store (data is lost on exit)");
            Ok(Arc::new(InMemoryEntityStore::new()))
        }
    }
}
