//! Command handlers and queries over the entity store.
//!
//! All validation (payload shape, job references) runs before the first
//! write; every write runs inside one store transaction which is dropped
//! (rolled back) on any error.

use std::sync::Arc;

use jobtrack_core::{DomainError, JobId, WorkerId};
use jobtrack_jobs::{
    CreateJob, CreateWorker, JobQuery, JobSummary, NewWorker, Page, PageLimits, Stats, Worker,
    WorkerQuery,
};

use crate::store::{EntityStore, StoreError, StoreTransaction};

pub const DEFAULT_JOB_STATUS: &str = "Not Started";

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// One entry of a bulk request was rejected; nothing was persisted.
    #[error("entry {index}: {source}")]
    BulkEntry {
        index: usize,
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    fn bulk_entry(index: usize, source: impl Into<ServiceError>) -> Self {
        Self::BulkEntry {
            index,
            source: Box::new(source.into()),
        }
    }

    /// The underlying error with any bulk wrapping removed.
    pub fn root(&self) -> &ServiceError {
        match self {
            Self::BulkEntry { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Tunables applied by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Status assigned to jobs created without one.
    pub default_job_status: String,
    pub page_limits: PageLimits,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_job_status: DEFAULT_JOB_STATUS.to_string(),
            page_limits: PageLimits::default(),
        }
    }
}

/// Jobs and workers application service.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn EntityStore>,
    settings: ServiceSettings,
}

impl JobService {
    pub fn new(store: Arc<dyn EntityStore>, settings: ServiceSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub async fn create_job(&self, input: CreateJob) -> ServiceResult<JobSummary> {
        let new_job = input.validate(&self.settings.default_job_status)?;

        let mut tx = self.store.begin().await?;
        let job = tx.insert_job(new_job).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job.id, status = %job.status, "job created");
        Ok(JobSummary {
            job,
            worker_count: 0,
        })
    }

    pub async fn get_job(&self, id: JobId) -> ServiceResult<JobSummary> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("job {id}")).into())
    }

    pub async fn list_jobs<'a, I>(&self, params: I) -> ServiceResult<Page<JobSummary>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let query = JobQuery::from_params(params, self.settings.page_limits)?;
        tracing::debug!(?query, "listing jobs");
        Ok(self.store.list_jobs(&query).await?)
    }

    /// Delete a job; its workers stay but become unassigned.
    pub async fn delete_job(&self, id: JobId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_job(id).await? {
            return Err(DomainError::not_found(format!("job {id}")).into());
        }
        tx.commit().await?;

        tracing::info!(job_id = %id, "job deleted; workers unassigned");
        Ok(())
    }

    /// Every worker assigned to `id`, in creation order.
    pub async fn job_workers(&self, id: JobId) -> ServiceResult<Vec<Worker>> {
        self.store
            .workers_for_job(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("job {id}")).into())
    }

    pub async fn create_worker(&self, input: CreateWorker) -> ServiceResult<Worker> {
        let new_worker = input.validate()?;

        let mut tx = self.store.begin().await?;
        ensure_job_reference(tx.as_mut(), &new_worker).await?;
        let worker = tx.insert_worker(new_worker).await?;
        tx.commit().await?;

        tracing::info!(worker_id = %worker.id, job_id = ?worker.job_id.map(|id| id.get()), "worker created");
        Ok(worker)
    }

    /// Create every worker or none.
    ///
    /// Entries are checked in order and the first rejected one is reported
    /// with its index. Returns the workers in input order.
    pub async fn bulk_create_workers(&self, inputs: Vec<CreateWorker>) -> ServiceResult<Vec<Worker>> {
        let mut tx = self.store.begin().await?;

        let mut validated = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let new_worker = input
                .validate()
                .map_err(|e| ServiceError::bulk_entry(index, e))?;
            ensure_job_reference(tx.as_mut(), &new_worker)
                .await
                .map_err(|e| ServiceError::bulk_entry(index, e))?;
            validated.push(new_worker);
        }

        let mut created = Vec::with_capacity(validated.len());
        for new_worker in validated {
            created.push(tx.insert_worker(new_worker).await?);
        }
        tx.commit().await?;

        tracing::info!(count = created.len(), "workers bulk created");
        Ok(created)
    }

    pub async fn get_worker(&self, id: WorkerId) -> ServiceResult<Worker> {
        self.store
            .get_worker(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("worker {id}")).into())
    }

    pub async fn list_workers<'a, I>(&self, params: I) -> ServiceResult<Page<Worker>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let query = WorkerQuery::from_params(params, self.settings.page_limits)?;
        tracing::debug!(?query, "listing workers");
        Ok(self.store.list_workers(&query).await?)
    }

    pub async fn delete_worker(&self, id: WorkerId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_worker(id).await? {
            return Err(DomainError::not_found(format!("worker {id}")).into());
        }
        tx.commit().await?;

        tracing::info!(worker_id = %id, "worker deleted");
        Ok(())
    }

    pub async fn stats(&self) -> ServiceResult<Stats> {
        Ok(self.store.stats().await?)
    }
}

async fn ensure_job_reference(tx: &mut dyn StoreTransaction, worker: &NewWorker) -> ServiceResult<()> {
    if let Some(job_id) = worker.job_id {
        if !tx.job_exists(job_id).await? {
            return Err(DomainError::not_found(format!("job {job_id}")).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryEntityStore, SqliteEntityStore};

    fn service() -> JobService {
        JobService::new(Arc::new(InMemoryEntityStore::new()), ServiceSettings::default())
    }

    /// One fresh service per store implementation, labelled for assertion messages.
    async fn services() -> Vec<(&'static str, JobService)> {
        let sqlite = SqliteEntityStore::connect("sqlite::memory:").await.unwrap();
        vec![
            ("memory", service()),
            (
                "sqlite",
                JobService::new(Arc::new(sqlite), ServiceSettings::default()),
            ),
        ]
    }

    fn job_input(name: &str, status: Option<&str>) -> CreateJob {
        CreateJob {
            name: Some(name.to_string()),
            customer: Some("ABC Corp".to_string()),
            start_date: Some("2024-03-15".to_string()),
            end_date: Some("2024-06-15".to_string()),
            status: status.map(str::to_string),
        }
    }

    fn worker_input(name: &str, role: &str, job_id: Option<JobId>) -> CreateWorker {
        CreateWorker {
            name: Some(name.to_string()),
            role: Some(role.to_string()),
            job_id,
        }
    }

    #[tokio::test]
    async fn created_jobs_get_unique_ids_and_zero_workers() {
        let svc = service();
        let a = svc.create_job(job_input("Downtown Office Renovation", Some("In Progress"))).await.unwrap();
        let b = svc.create_job(job_input("Warehouse", None)).await.unwrap();

        assert_eq!(a.job.id, JobId::new(1));
        assert_ne!(a.job.id, b.job.id);
        assert_eq!(a.worker_count, 0);
        assert_eq!(b.job.status, DEFAULT_JOB_STATUS);
    }

    #[tokio::test]
    async fn invalid_job_is_rejected_before_any_write() {
        let svc = service();
        let mut input = job_input("x", None);
        input.start_date = Some("March 15".to_string());

        let err = svc.create_job(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert_eq!(svc.stats().await.unwrap().jobs.total, 0);
    }

    #[tokio::test]
    async fn worker_with_unknown_job_is_not_found() {
        for (store, svc) in services().await {
            let err = svc
                .create_worker(worker_input("John Doe", "Electrician", Some(JobId::new(9))))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))), "{store}");
            assert_eq!(svc.stats().await.unwrap().workers.total, 0, "{store}");
        }
    }

    #[tokio::test]
    async fn example_flow_counts_workers_and_groups_stats() {
        let svc = service();
        let job = svc.create_job(job_input("Downtown Office Renovation", Some("In Progress"))).await.unwrap();
        svc.create_worker(worker_input("John Doe", "Electrician", Some(job.job.id)))
            .await
            .unwrap();

        let page = svc.list_jobs([("status", "In Progress")]).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].job.id, JobId::new(1));
        assert_eq!(page.items[0].worker_count, 1);

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.jobs.groups["In Progress"], 1);
        assert_eq!(stats.workers.groups["Electrician"], 1);
    }

    #[tokio::test]
    async fn bulk_create_is_all_or_nothing() {
        for (store, svc) in services().await {
            let job = svc.create_job(job_input("a", None)).await.unwrap();

            let err = svc
                .bulk_create_workers(vec![
                    worker_input("John Doe", "Electrician", Some(job.job.id)),
                    worker_input("Jane Smith", "Carpenter", Some(JobId::new(42))),
                    CreateWorker::default(),
                ])
                .await
                .unwrap_err();

            match &err {
                ServiceError::BulkEntry { index, .. } => assert_eq!(*index, 1, "{store}"),
                other => panic!("{store}: expected bulk entry error, got {other:?}"),
            }
            assert!(matches!(err.root(), ServiceError::Domain(DomainError::NotFound(_))), "{store}");
            assert_eq!(svc.stats().await.unwrap().workers.total, 0, "{store}");
            assert!(svc.job_workers(job.job.id).await.unwrap().is_empty(), "{store}");

            let created = svc
                .bulk_create_workers(vec![
                    worker_input("John Doe", "Electrician", Some(job.job.id)),
                    worker_input("Jane Smith", "Carpenter", None),
                ])
                .await
                .unwrap();
            let roles: Vec<_> = created.iter().map(|w| w.role.as_str()).collect();
            assert_eq!(roles, vec!["Electrician", "Carpenter"], "{store}");
            assert_eq!(svc.get_job(job.job.id).await.unwrap().worker_count, 1, "{store}");
        }
    }

    #[tokio::test]
    async fn bulk_reports_validation_errors_with_index() {
        let svc = service();
        let err = svc
            .bulk_create_workers(vec![
                worker_input("John Doe", "Electrician", None),
                worker_input("No Role", "", None),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "entry 1: validation failed: role is required");
    }

    #[tokio::test]
    async fn deleting_a_job_orphans_its_workers() {
        for (store, svc) in services().await {
            let job = svc.create_job(job_input("a", None)).await.unwrap();
            let worker = svc
                .create_worker(worker_input("John Doe", "Electrician", Some(job.job.id)))
                .await
                .unwrap();
            assert_eq!(svc.job_workers(job.job.id).await.unwrap(), vec![worker.clone()], "{store}");

            svc.delete_job(job.job.id).await.unwrap();

            assert!(
                matches!(
                    svc.job_workers(job.job.id).await,
                    Err(ServiceError::Domain(DomainError::NotFound(_)))
                ),
                "{store}"
            );
            assert_eq!(svc.get_worker(worker.id).await.unwrap().job_id, None, "{store}");
            let stats = svc.stats().await.unwrap();
            assert_eq!(stats.jobs.total, 0, "{store}");
            assert_eq!(stats.workers.total, 1, "{store}");

            assert!(
                matches!(
                    svc.delete_job(job.job.id).await,
                    Err(ServiceError::Domain(DomainError::NotFound(_)))
                ),
                "{store}"
            );
        }
    }

    #[tokio::test]
    async fn delete_worker() {
        let svc = service();
        let worker = svc.create_worker(worker_input("Sam", "Painter", None)).await.unwrap();
        svc.delete_worker(worker.id).await.unwrap();
        assert!(svc.get_worker(worker.id).await.is_err());
        assert!(svc.delete_worker(worker.id).await.is_err());
    }

    #[tokio::test]
    async fn invalid_query_surfaces_as_domain_error() {
        let svc = service();
        let err = svc.list_workers([("sortBy", "salary")]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidQuery(_))));
    }
}
