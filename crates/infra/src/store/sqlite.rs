//! SQLite-backed entity store.
//!
//! List queries are translated into parameterised SQL: every filter value is
//! bound, and sort columns come only from the enumerated sort fields. The
//! count and the page are read inside one transaction so that `total` and
//! `worker_count` agree with the returned rows.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use jobtrack_core::{JobId, WorkerId};
use jobtrack_jobs::{
    GroupCounts, Job, JobFilter, JobQuery, JobSummary, NewJob, NewWorker, Page, Stats, Worker,
    WorkerFilter, WorkerQuery, fold_case,
};

use super::{EntityStore, StoreError, StoreResult, StoreTransaction};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL,
        customer   TEXT NOT NULL,
        -- Folded copies for the substring filters; SQLite's lower() is ASCII-only.
        name_folded     TEXT NOT NULL,
        customer_folded TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date   TEXT NOT NULL,
        status     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workers (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        name   TEXT NOT NULL,
        role   TEXT NOT NULL,
        job_id INTEGER NULL REFERENCES jobs(id) ON DELETE SET NULL,
        name_folded TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS workers_job_id ON workers(job_id)",
];

const JOB_COLUMNS: &str = "j.id, j.name, j.customer, j.start_date, j.end_date, j.status, \
     (SELECT COUNT(*) FROM workers w WHERE w.job_id = j.id) AS worker_count";

const WORKER_COLUMNS: &str = "w.id, w.name, w.role, w.job_id";

/// SQLite entity store.
#[derive(Debug, Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
}

impl SqliteEntityStore {
    /// Connect (creating the database file if needed) and ensure the schema exists.
    ///
    /// In-memory URLs get a single long-lived connection, since every SQLite
    /// connection to `:memory:` is its own database.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn get_job(&self, id: JobId) -> StoreResult<Option<JobSummary>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs j WHERE j.id = ?1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self, query: &JobQuery) -> StoreResult<Page<JobSummary>> {
        let mut tx = self.pool.begin().await?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM jobs j WHERE 1 = 1");
        push_job_filter(&mut count, &query.filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {JOB_COLUMNS} FROM jobs j WHERE 1 = 1"));
        push_job_filter(&mut select, &query.filter);
        select.push(format_args!(
            " ORDER BY j.{} {}, j.id ASC",
            query.sort_by.column(),
            query.order.as_sql()
        ));
        push_window(&mut select, query.page.per_page, query.page.offset());
        let rows = select.build().fetch_all(&mut *tx).await?;

        tx.commit().await?;

        let items = rows.iter().map(job_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, query.page, count_to_u64(total)?))
    }

    async fn get_worker(&self, id: WorkerId) -> StoreResult<Option<Worker>> {
        let row = sqlx::query(&format!("SELECT {WORKER_COLUMNS} FROM workers w WHERE w.id = ?1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(worker_from_row).transpose()
    }

    async fn list_workers(&self, query: &WorkerQuery) -> StoreResult<Page<Worker>> {
        let mut tx = self.pool.begin().await?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM workers w WHERE 1 = 1");
        push_worker_filter(&mut count, &query.filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {WORKER_COLUMNS} FROM workers w WHERE 1 = 1"));
        push_worker_filter(&mut select, &query.filter);
        // SQLite sorts NULL first ascending and last descending, matching `Option` ordering.
        select.push(format_args!(
            " ORDER BY w.{} {}, w.id ASC",
            query.sort_by.column(),
            query.order.as_sql()
        ));
        push_window(&mut select, query.page.per_page, query.page.offset());
        let rows = select.build().fetch_all(&mut *tx).await?;

        tx.commit().await?;

        let items = rows.iter().map(worker_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, query.page, count_to_u64(total)?))
    }

    async fn workers_for_job(&self, id: JobId) -> StoreResult<Option<Vec<Worker>>> {
        let mut tx = self.pool.begin().await?;
        if !job_exists(&mut tx, id).await? {
            return Ok(None);
        }
        let rows = sqlx::query(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers w WHERE w.job_id = ?1 ORDER BY w.id ASC"
        ))
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        rows.iter()
            .map(worker_from_row)
            .collect::<StoreResult<Vec<_>>>()
            .map(Some)
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let mut tx = self.pool.begin().await?;
        let jobs = grouped_counts(&mut tx, "SELECT status, COUNT(*) FROM jobs GROUP BY status").await?;
        let workers = grouped_counts(&mut tx, "SELECT role, COUNT(*) FROM workers GROUP BY role").await?;
        tx.commit().await?;
        Ok(Stats { jobs, workers })
    }
}

struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn job_exists(&mut self, id: JobId) -> StoreResult<bool> {
        job_exists(&mut self.tx, id).await
    }

    async fn insert_job(&mut self, job: NewJob) -> StoreResult<Job> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (name, customer, name_folded, customer_folded, start_date, end_date, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&job.name)
        .bind(&job.customer)
        .bind(fold_case(&job.name))
        .bind(fold_case(&job.customer))
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(&job.status)
        .execute(&mut *self.tx)
        .await?;

        Ok(job.into_job(JobId::new(result.last_insert_rowid())))
    }

    async fn insert_worker(&mut self, worker: NewWorker) -> StoreResult<Worker> {
        let result = sqlx::query(
            "INSERT INTO workers (name, role, job_id, name_folded) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&worker.name)
        .bind(&worker.role)
        .bind(worker.job_id.map(|id| id.get()))
        .bind(fold_case(&worker.name))
        .execute(&mut *self.tx)
        .await?;

        Ok(worker.into_worker(WorkerId::new(result.last_insert_rowid())))
    }

    async fn delete_job(&mut self, id: JobId) -> StoreResult<bool> {
        // Unassign explicitly rather than relying on the connection's foreign_keys pragma.
        sqlx::query("UPDATE workers SET job_id = NULL WHERE job_id = ?1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_worker(&mut self, id: WorkerId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM workers WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn job_exists(conn: &mut SqliteConnection, id: JobId) -> StoreResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM jobs WHERE id = ?1")
        .bind(id.get())
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

async fn grouped_counts(conn: &mut SqliteConnection, sql: &str) -> StoreResult<GroupCounts> {
    let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(conn).await?;
    let groups = rows
        .into_iter()
        .map(|(key, n)| count_to_u64(n).map(|n| (key, n)))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(GroupCounts::from_groups(groups))
}

fn push_job_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &JobFilter) {
    if let Some(name) = &filter.name {
        qb.push(" AND instr(j.name_folded, ")
            .push_bind(fold_case(name))
            .push(") > 0");
    }
    if let Some(customer) = &filter.customer {
        qb.push(" AND instr(j.customer_folded, ")
            .push_bind(fold_case(customer))
            .push(") > 0");
    }
    if let Some(status) = &filter.status {
        qb.push(" AND j.status = ").push_bind(status.clone());
    }
    if let Some(start_after) = filter.start_after {
        qb.push(" AND j.start_date >= ").push_bind(start_after);
    }
    if let Some(end_before) = filter.end_before {
        qb.push(" AND j.end_date <= ").push_bind(end_before);
    }
}

fn push_worker_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &WorkerFilter) {
    if let Some(name) = &filter.name {
        qb.push(" AND instr(w.name_folded, ")
            .push_bind(fold_case(name))
            .push(") > 0");
    }
    if let Some(role) = &filter.role {
        qb.push(" AND w.role = ").push_bind(role.clone());
    }
    if let Some(job_id) = filter.job_id {
        qb.push(" AND w.job_id = ").push_bind(job_id.get());
    }
}

fn push_window(qb: &mut QueryBuilder<'_, Sqlite>, per_page: u32, offset: u64) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(per_page))
        .push(" OFFSET ")
        .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
}

fn job_from_row(row: &SqliteRow) -> StoreResult<JobSummary> {
    let job = Job {
        id: JobId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        customer: row.try_get("customer")?,
        start_date: row.try_get::<NaiveDate, _>("start_date")?,
        end_date: row.try_get::<NaiveDate, _>("end_date")?,
        status: row.try_get("status")?,
    };
    Ok(JobSummary {
        job,
        worker_count: count_to_u64(row.try_get("worker_count")?)?,
    })
}

fn worker_from_row(row: &SqliteRow) -> StoreResult<Worker> {
    let job_id: Option<i64> = row.try_get("job_id")?;
    Ok(Worker {
        id: WorkerId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        role: row.try_get("role")?,
        job_id: job_id.map(JobId::new),
    })
}

fn count_to_u64(n: i64) -> StoreResult<u64> {
    u64::try_from(n).map_err(|_| StoreError::Decode(format!("negative count {n}")))
}
