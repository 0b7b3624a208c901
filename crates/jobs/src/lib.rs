//! Jobs domain module (jobs, the workers assigned to them, list queries and stats).
//!
//! This crate contains business rules implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod job;
pub mod query;
pub mod stats;
pub mod worker;

pub use job::{CreateJob, DATE_FORMAT, Job, JobSummary, NewJob, parse_date};
pub use query::{
    JobFilter, JobQuery, JobSortField, Page, PageLimits, PageRequest, SortOrder, WorkerFilter,
    WorkerQuery, WorkerSortField, fold_case,
};
pub use stats::{GroupCounts, Stats};
pub use worker::{CreateWorker, NewWorker, Worker};
