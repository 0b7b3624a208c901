use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use jobtrack_core::{JobId, WorkerId};
use jobtrack_jobs::{Job, JobQuery, JobSummary, NewJob, NewWorker, Page, Stats, Worker, WorkerQuery};

use super::{EntityStore, StoreResult, StoreTransaction};

#[derive(Debug, Clone, Default)]
struct State {
    jobs: BTreeMap<JobId, Job>,
    workers: BTreeMap<WorkerId, Worker>,
    last_job_id: i64,
    last_worker_id: i64,
}

impl State {
    fn worker_counts(&self) -> HashMap<JobId, u64> {
        let mut counts = HashMap::new();
        for job_id in self.workers.values().filter_map(|w| w.job_id) {
            *counts.entry(job_id).or_insert(0) += 1;
        }
        counts
    }

    fn summarize(&self, job: &Job, counts: &HashMap<JobId, u64>) -> JobSummary {
        JobSummary {
            job: job.clone(),
            worker_count: counts.get(&job.id).copied().unwrap_or(0),
        }
    }
}

/// In-memory entity store for tests/dev.
///
/// A transaction holds the write lock for its whole lifetime and stages its
/// writes on a copy of the state; commit swaps the copy in. Every `begin()`
/// clones the full state, so each write costs O(records). Set `DATABASE_URL`
/// for anything beyond small or throwaway data sets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().write_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn get_job(&self, id: JobId) -> StoreResult<Option<JobSummary>> {
        let state = self.state.read().await;
        let counts = state.worker_counts();
        Ok(state.jobs.get(&id).map(|job| state.summarize(job, &counts)))
    }

    async fn list_jobs(&self, query: &JobQuery) -> StoreResult<Page<JobSummary>> {
        let state = self.state.read().await;
        let counts = state.worker_counts();
        let summaries = state.jobs.values().map(|job| state.summarize(job, &counts));
        Ok(query.apply(summaries))
    }

    async fn get_worker(&self, id: WorkerId) -> StoreResult<Option<Worker>> {
        Ok(self.state.read().await.workers.get(&id).cloned())
    }

    async fn list_workers(&self, query: &WorkerQuery) -> StoreResult<Page<Worker>> {
        let state = self.state.read().await;
        Ok(query.apply(state.workers.values().cloned()))
    }

    async fn workers_for_job(&self, id: JobId) -> StoreResult<Option<Vec<Worker>>> {
        let state = self.state.read().await;
        if !state.jobs.contains_key(&id) {
            return Ok(None);
        }
        // BTreeMap iteration is id order, i.e. creation order.
        let workers = state
            .workers
            .values()
            .filter(|w| w.job_id == Some(id))
            .cloned()
            .collect();
        Ok(Some(workers))
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let state = self.state.read().await;
        Ok(Stats::compute(state.jobs.values(), state.workers.values()))
    }
}

struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<State>,
    staged: State,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn job_exists(&mut self, id: JobId) -> StoreResult<bool> {
        Ok(self.staged.jobs.contains_key(&id))
    }

    async fn insert_job(&mut self, job: NewJob) -> StoreResult<Job> {
        self.staged.last_job_id += 1;
        let job = job.into_job(JobId::new(self.staged.last_job_id));
        self.staged.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn insert_worker(&mut self, worker: NewWorker) -> StoreResult<Worker> {
        self.staged.last_worker_id += 1;
        let worker = worker.into_worker(WorkerId::new(self.staged.last_worker_id));
        self.staged.workers.insert(worker.id, worker.clone());
        Ok(worker)
    }

    async fn delete_job(&mut self, id: JobId) -> StoreResult<bool> {
        if self.staged.jobs.remove(&id).is_none() {
            return Ok(false);
        }
        for worker in self.staged.workers.values_mut() {
            if worker.job_id == Some(id) {
                worker.job_id = None;
            }
        }
        Ok(true)
    }

    async fn delete_worker(&mut self, id: WorkerId) -> StoreResult<bool> {
        Ok(self.staged.workers.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_job(name: &str) -> NewJob {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        NewJob {
            name: name.to_string(),
            customer: "ABC Corp".to_string(),
            start_date: d,
            end_date: d,
            status: "In Progress".to_string(),
        }
    }

    fn new_worker(name: &str, job_id: Option<JobId>) -> NewWorker {
        NewWorker {
            name: name.to_string(),
            role: "Electrician".to_string(),
            job_id,
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible_with_sequential_ids() {
        let store = InMemoryEntityStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_job(new_job("a")).await.unwrap();
        let b = tx.insert_job(new_job("b")).await.unwrap();
        tx.insert_worker(new_worker("w", Some(a.id))).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(a.id, JobId::new(1));
        assert_eq!(b.id, JobId::new(2));
        let summary = store.get_job(a.id).await.unwrap().unwrap();
        assert_eq!(summary.worker_count, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryEntityStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_job(new_job("discarded")).await.unwrap();
        }
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.jobs.total, 0);
        assert!(store.get_job(JobId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_job_unassigns_its_workers() {
        let store = InMemoryEntityStore::new();
        let mut tx = store.begin().await.unwrap();
        let job = tx.insert_job(new_job("a")).await.unwrap();
        let worker = tx.insert_worker(new_worker("w", Some(job.id))).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.delete_job(job.id).await.unwrap());
        assert!(!tx.delete_job(job.id).await.unwrap());
        tx.commit().await.unwrap();

        let worker = store.get_worker(worker.id).await.unwrap().unwrap();
        assert_eq!(worker.job_id, None);
        assert!(store.workers_for_job(job.id).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().workers.total, 1);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryEntityStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_job(new_job("a")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.delete_job(first.id).await.unwrap();
        let second = tx.insert_job(new_job("b")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(second.id, JobId::new(2));
    }

    #[tokio::test]
    async fn workers_for_job_in_creation_order() {
        let store = InMemoryEntityStore::new();
        let mut tx = store.begin().await.unwrap();
        let job = tx.insert_job(new_job("a")).await.unwrap();
        tx.insert_worker(new_worker("first", Some(job.id))).await.unwrap();
        tx.insert_worker(new_worker("elsewhere", None)).await.unwrap();
        tx.insert_worker(new_worker("second", Some(job.id))).await.unwrap();
        tx.commit().await.unwrap();

        let names: Vec<_> = store
            .workers_for_job(job.id)
            .await
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
