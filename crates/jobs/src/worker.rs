use jobtrack_core::{DomainResult, Entity, JobId, WorkerId};

use crate::job::required;

/// A worker, optionally assigned to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    /// Free-form category; grouped verbatim by the stats aggregator.
    pub role: String,
    /// `None` means unassigned.
    pub job_id: Option<JobId>,
}

impl Entity for Worker {
    type Id = WorkerId;

    fn id(&self) -> WorkerId {
        self.id
    }
}

impl AsRef<Worker> for Worker {
    fn as_ref(&self) -> &Worker {
        self
    }
}

/// Unvalidated worker creation input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWorker {
    pub name: Option<String>,
    pub role: Option<String>,
    pub job_id: Option<JobId>,
}

/// A validated worker that has not been assigned an id yet.
///
/// Whether `job_id` references an existing job is checked against the store,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorker {
    pub name: String,
    pub role: String,
    pub job_id: Option<JobId>,
}

impl CreateWorker {
    pub fn validate(self) -> DomainResult<NewWorker> {
        Ok(NewWorker {
            name: required("name", self.name)?,
            role: required("role", self.role)?,
            job_id: self.job_id,
        })
    }
}

impl NewWorker {
    pub fn into_worker(self, id: WorkerId) -> Worker {
        Worker {
            id,
            name: self.name,
            role: self.role,
            job_id: self.job_id,
        }
    }
}
