//! List queries: filtering, ordering and paging for jobs and workers.
//!
//! A query is parsed from raw query-string pairs into a closed, validated
//! structure. Unknown keys are rejected rather than ignored. Stores may
//! evaluate a query in memory via [`JobQuery::apply`] / [`WorkerQuery::apply`]
//! or translate its fields into their own query language; either way the
//! ordering is total (ties broken by ascending id), so pages never overlap.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use jobtrack_core::{DomainError, DomainResult, Entity, JobId};

use crate::job::{DATE_FORMAT, Job};
use crate::worker::Worker;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// Page size bounds applied while parsing `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_per_page: u32,
    /// Larger requested limits are clamped to this value.
    pub max_per_page: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn parse(page: Option<&str>, limit: Option<&str>, limits: PageLimits) -> DomainResult<Self> {
        let page = match page {
            Some(raw) => positive("page", raw)?,
            None => 1,
        };
        let per_page = match limit {
            Some(raw) => positive("limit", raw)?.min(limits.max_per_page),
            None => limits.default_per_page,
        };
        Ok(Self::new(page, per_page))
    }

    /// Number of matching records that precede this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

/// One page of results plus the metadata needed to fetch the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    /// Number of records matching the filter across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }

    /// Cut the requested window out of an already filtered and sorted set.
    pub fn slice(sorted: Vec<T>, request: PageRequest) -> Self {
        let total = sorted.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = sorted
            .into_iter()
            .skip(skip)
            .take(request.per_page as usize)
            .collect();
        Self::new(items, request, total)
    }

    /// `ceil(total / per_page)`; zero when nothing matches.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.per_page))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(DomainError::invalid_query(format!(
                "order must be one of: asc, desc; got `{raw}`"
            ))),
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

// -------------------------
// Jobs
// -------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSortField {
    #[default]
    Id,
    Name,
    Customer,
    StartDate,
    EndDate,
    Status,
}

impl JobSortField {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "customer" => Ok(Self::Customer),
            "start_date" | "startDate" => Ok(Self::StartDate),
            "end_date" | "endDate" => Ok(Self::EndDate),
            "status" => Ok(Self::Status),
            _ => Err(DomainError::invalid_query(format!(
                "sortBy must be one of: id, name, customer, start_date, end_date, status; got `{raw}`"
            ))),
        }
    }

    /// Column name in the relational schema.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Customer => "customer",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Status => "status",
        }
    }

    fn compare(self, a: &Job, b: &Job) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::Customer => a.customer.cmp(&b.customer),
            Self::StartDate => a.start_date.cmp(&b.start_date),
            Self::EndDate => a.end_date.cmp(&b.end_date),
            Self::Status => a.status.cmp(&b.status),
        }
    }
}

/// Job filters; every `None` field is unconstrained and all present fields
/// must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Case-insensitive substring of the customer.
    pub customer: Option<String>,
    /// Exact status.
    pub status: Option<String>,
    /// Inclusive lower bound on the start date.
    pub start_after: Option<NaiveDate>,
    /// Inclusive upper bound on the end date.
    pub end_before: Option<NaiveDate>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        contains_ci(&job.name, self.name.as_deref())
            && contains_ci(&job.customer, self.customer.as_deref())
            && self.status.as_ref().is_none_or(|s| *s == job.status)
            && self.start_after.is_none_or(|d| job.start_date >= d)
            && self.end_before.is_none_or(|d| job.end_date <= d)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    pub filter: JobFilter,
    pub sort_by: JobSortField,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl JobQuery {
    /// Every query-string key a job listing understands.
    pub const KEYS: [&'static str; 9] = [
        "name",
        "customer",
        "status",
        "startAfter",
        "endBefore",
        "sortBy",
        "order",
        "page",
        "limit",
    ];

    pub fn from_params<'a, I>(params: I, limits: PageLimits) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let params = collect_params(params, &Self::KEYS)?;
        let common = CommonParams::parse(&params, limits)?;

        let filter = JobFilter {
            name: params.get("name").map(|s| s.to_string()),
            customer: params.get("customer").map(|s| s.to_string()),
            status: params.get("status").map(|s| s.to_string()),
            start_after: params
                .get("startAfter")
                .map(|raw| query_date("startAfter", raw))
                .transpose()?,
            end_before: params
                .get("endBefore")
                .map(|raw| query_date("endBefore", raw))
                .transpose()?,
        };
        let sort_by = common
            .sort_by
            .map(JobSortField::parse)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            filter,
            sort_by,
            order: common.order,
            page: common.page,
        })
    }

    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        by_id_on_tie(self.order.apply(self.sort_by.compare(a, b)), a, b)
    }

    /// Filter, sort and page a full record set in memory.
    pub fn apply<T: AsRef<Job>>(&self, records: impl IntoIterator<Item = T>) -> Page<T> {
        select::<Job, _>(
            records,
            |job| self.filter.matches(job),
            |a, b| self.compare(a, b),
            self.page,
        )
    }
}

// -------------------------
// Workers
// -------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerSortField {
    #[default]
    Id,
    Name,
    Role,
    /// Unassigned workers sort before assigned ones in ascending order.
    JobId,
}

impl WorkerSortField {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "role" => Ok(Self::Role),
            "job_id" | "jobId" => Ok(Self::JobId),
            _ => Err(DomainError::invalid_query(format!(
                "sortBy must be one of: id, name, role, job_id; got `{raw}`"
            ))),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Role => "role",
            Self::JobId => "job_id",
        }
    }

    fn compare(self, a: &Worker, b: &Worker) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::Role => a.role.cmp(&b.role),
            Self::JobId => a.job_id.cmp(&b.job_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Exact role.
    pub role: Option<String>,
    /// Exact job reference.
    pub job_id: Option<JobId>,
}

impl WorkerFilter {
    pub fn matches(&self, worker: &Worker) -> bool {
        contains_ci(&worker.name, self.name.as_deref())
            && self.role.as_ref().is_none_or(|r| *r == worker.role)
            && self.job_id.is_none_or(|id| worker.job_id == Some(id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerQuery {
    pub filter: WorkerFilter,
    pub sort_by: WorkerSortField,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl WorkerQuery {
    pub const KEYS: [&'static str; 7] = ["name", "role", "jobId", "sortBy", "order", "page", "limit"];

    pub fn from_params<'a, I>(params: I, limits: PageLimits) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let params = collect_params(params, &Self::KEYS)?;
        let common = CommonParams::parse(&params, limits)?;

        let job_id = params
            .get("jobId")
            .map(|raw| {
                raw.trim().parse::<i64>().map(JobId::new).map_err(|_| {
                    DomainError::invalid_query(format!("jobId must be an integer, got `{raw}`"))
                })
            })
            .transpose()?;

        let filter = WorkerFilter {
            name: params.get("name").map(|s| s.to_string()),
            role: params.get("role").map(|s| s.to_string()),
            job_id,
        };
        let sort_by = common
            .sort_by
            .map(WorkerSortField::parse)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            filter,
            sort_by,
            order: common.order,
            page: common.page,
        })
    }

    pub fn compare(&self, a: &Worker, b: &Worker) -> Ordering {
        by_id_on_tie(self.order.apply(self.sort_by.compare(a, b)), a, b)
    }

    pub fn apply<T: AsRef<Worker>>(&self, records: impl IntoIterator<Item = T>) -> Page<T> {
        select::<Worker, _>(
            records,
            |worker| self.filter.matches(worker),
            |a, b| self.compare(a, b),
            self.page,
        )
    }
}

// -------------------------
// Evaluation helpers
// -------------------------

/// Ascending id always breaks ties, whatever the requested order.
fn by_id_on_tie<E: Entity>(ordering: Ordering, a: &E, b: &E) -> Ordering {
    ordering.then_with(|| a.id().cmp(&b.id()))
}

fn select<E, T>(
    records: impl IntoIterator<Item = T>,
    keep: impl Fn(&E) -> bool,
    order: impl Fn(&E, &E) -> Ordering,
    page: PageRequest,
) -> Page<T>
where
    E: Entity,
    T: AsRef<E>,
{
    let mut matching: Vec<T> = records.into_iter().filter(|r| keep(r.as_ref())).collect();
    matching.sort_by(|a, b| order(a.as_ref(), b.as_ref()));
    Page::slice(matching, page)
}

// -------------------------
// Parsing helpers
// -------------------------

struct CommonParams<'a> {
    sort_by: Option<&'a str>,
    order: SortOrder,
    page: PageRequest,
}

impl<'a> CommonParams<'a> {
    fn parse(params: &BTreeMap<&'a str, &'a str>, limits: PageLimits) -> DomainResult<Self> {
        Ok(Self {
            sort_by: params.get("sortBy").copied(),
            order: params
                .get("order")
                .map(|raw| SortOrder::parse(raw))
                .transpose()?
                .unwrap_or_default(),
            page: PageRequest::parse(
                params.get("page").copied(),
                params.get("limit").copied(),
                limits,
            )?,
        })
    }
}

/// Reject unknown keys and drop empty values. A repeated key keeps its last value.
fn collect_params<'a, I>(params: I, allowed: &[&str]) -> DomainResult<BTreeMap<&'a str, &'a str>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = BTreeMap::new();
    for (key, value) in params {
        if !allowed.contains(&key) {
            return Err(DomainError::invalid_query(format!(
                "unrecognized parameter `{key}`; expected one of: {}",
                allowed.join(", ")
            )));
        }
        if value.trim().is_empty() {
            continue;
        }
        out.insert(key, value);
    }
    Ok(out)
}

fn positive(key: &str, raw: &str) -> DomainResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(DomainError::invalid_query(format!(
            "{key} must be a positive integer, got `{raw}`"
        ))),
    }
}

fn query_date(key: &str, raw: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        DomainError::invalid_query(format!("{key} must be a date formatted as YYYY-MM-DD, got `{raw}`"))
    })
}

/// Case folding used by the substring filters. Stores that match in their
/// own query language must compare values folded with this function.
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| fold_case(haystack).contains(&fold_case(n)))
}
