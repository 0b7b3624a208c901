use serde::Deserialize;
use serde_json::{Value, json};

use jobtrack_core::JobId;
use jobtrack_jobs::{CreateJob, CreateWorker, DATE_FORMAT, GroupCounts, JobSummary, Page, Stats, Worker};

// -------------------------
// Request DTOs
// -------------------------

/// Every field is optional here; presence and format are checked by the
/// domain so that a missing field reads as a validation failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub name: Option<String>,
    pub customer: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
}

impl From<CreateJobRequest> for CreateJob {
    fn from(body: CreateJobRequest) -> Self {
        CreateJob {
            name: body.name,
            customer: body.customer,
            start_date: body.start_date,
            end_date: body.end_date,
            status: body.status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkerRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub job_id: Option<JobId>,
}

impl From<CreateWorkerRequest> for CreateWorker {
    fn from(body: CreateWorkerRequest) -> Self {
        CreateWorker {
            name: body.name,
            role: body.role,
            job_id: body.job_id,
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn job_to_json(summary: JobSummary) -> Value {
    let JobSummary { job, worker_count } = summary;
    json!({
        "id": job.id.get(),
        "name": job.name,
        "customer": job.customer,
        "startDate": job.start_date.format(DATE_FORMAT).to_string(),
        "endDate": job.end_date.format(DATE_FORMAT).to_string(),
        "status": job.status,
        "workerCount": worker_count,
    })
}

pub fn worker_to_json(worker: Worker) -> Value {
    json!({
        "id": worker.id.get(),
        "name": worker.name,
        "role": worker.role,
        "jobId": worker.job_id.map(|id| id.get()),
    })
}

pub fn workers_to_json(workers: Vec<Worker>) -> Value {
    Value::Array(workers.into_iter().map(worker_to_json).collect())
}

fn pagination_to_json<T>(page: &Page<T>) -> Value {
    json!({
        "page": page.page,
        "perPage": page.per_page,
        "total": page.total,
        "pages": page.pages(),
    })
}

pub fn job_page_to_json(page: Page<JobSummary>) -> Value {
    let pagination = pagination_to_json(&page);
    json!({
        "jobs": page.items.into_iter().map(job_to_json).collect::<Vec<_>>(),
        "pagination": pagination,
    })
}

pub fn worker_page_to_json(page: Page<Worker>) -> Value {
    let pagination = pagination_to_json(&page);
    json!({
        "workers": page.items.into_iter().map(worker_to_json).collect::<Vec<_>>(),
        "pagination": pagination,
    })
}

fn groups_to_json(counts: GroupCounts, key: &str) -> Value {
    let mut out = serde_json::Map::new();
    out.insert("total".to_string(), json!(counts.total));
    out.insert(key.to_string(), json!(counts.groups));
    Value::Object(out)
}

pub fn stats_to_json(stats: Stats) -> Value {
    json!({
        "jobs": groups_to_json(stats.jobs, "byStatus"),
        "workers": groups_to_json(stats.workers, "byRole"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use jobtrack_core::WorkerId;
    use jobtrack_jobs::{Job, PageRequest};

    fn summary(worker_count: u64) -> JobSummary {
        JobSummary {
            job: Job {
                id: JobId::new(1),
                name: "Kitchen Remodel".to_string(),
                customer: "ABC Corp".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                status: "In Progress".to_string(),
            },
            worker_count,
        }
    }

    #[test]
    fn job_uses_camel_case_and_iso_dates() {
        let value = job_to_json(summary(2));
        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "Kitchen Remodel",
                "customer": "ABC Corp",
                "startDate": "2024-03-05",
                "endDate": "2024-04-01",
                "status": "In Progress",
                "workerCount": 2,
            })
        );
    }

    #[test]
    fn unassigned_worker_has_null_job_id() {
        let worker = Worker {
            id: WorkerId::new(7),
            name: "John Doe".to_string(),
            role: "Electrician".to_string(),
            job_id: None,
        };
        let value = worker_to_json(worker);
        assert!(value["jobId"].is_null());
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn page_carries_pagination_metadata() {
        let page = Page::new(vec![summary(0)], PageRequest::new(2, 1), 3);
        let value = job_page_to_json(page);
        assert_eq!(value["jobs"].as_array().unwrap().len(), 1);
        assert_eq!(
            value["pagination"],
            json!({ "page": 2, "perPage": 1, "total": 3, "pages": 3 })
        );
    }

    #[test]
    fn stats_group_keys_are_renamed() {
        let stats = Stats {
            jobs: GroupCounts::tally(["Completed", "Completed"]),
            workers: GroupCounts::tally(["Carpenter"]),
        };
        assert_eq!(
            stats_to_json(stats),
            json!({
                "jobs": { "total": 2, "byStatus": { "Completed": 2 } },
                "workers": { "total": 1, "byRole": { "Carpenter": 1 } },
            })
        );
    }

    #[test]
    fn request_maps_job_id() {
        let body: CreateWorkerRequest =
            serde_json::from_value(json!({ "name": "A", "role": "B", "jobId": 3 })).unwrap();
        let input = CreateWorker::from(body);
        assert_eq!(input.job_id, Some(JobId::new(3)));
    }
}
