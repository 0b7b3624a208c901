use chrono::NaiveDate;

use jobtrack_core::{DomainError, DomainResult, Entity, JobId};

/// Calendar format accepted and produced for job dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A job carried out for a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub customer: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Free-form category; grouped verbatim by the stats aggregator.
    pub status: String,
}

impl Entity for Job {
    type Id = JobId;

    fn id(&self) -> JobId {
        self.id
    }
}

impl AsRef<Job> for Job {
    fn as_ref(&self) -> &Job {
        self
    }
}

/// A job together with the number of workers referencing it, read in the
/// same snapshot as the job itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job: Job,
    pub worker_count: u64,
}

impl AsRef<Job> for JobSummary {
    fn as_ref(&self) -> &Job {
        &self.job
    }
}

/// Unvalidated job creation input. Every field is optional so that missing
/// fields are reported as validation failures rather than decode errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateJob {
    pub name: Option<String>,
    pub customer: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
}

/// A validated job that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub name: String,
    pub customer: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

impl CreateJob {
    /// Validate presence and shape of every field.
    ///
    /// `default_status` is used when `status` is absent or blank. An end date
    /// earlier than the start date is accepted.
    pub fn validate(self, default_status: &str) -> DomainResult<NewJob> {
        let name = required("name", self.name)?;
        let customer = required("customer", self.customer)?;
        let start_date = parse_date("startDate", &required("startDate", self.start_date)?)?;
        let end_date = parse_date("endDate", &required("endDate", self.end_date)?)?;
        let status = self
            .status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_status.to_string());

        Ok(NewJob {
            name,
            customer,
            start_date,
            end_date,
            status,
        })
    }
}

impl NewJob {
    pub fn into_job(self, id: JobId) -> Job {
        Job {
            id,
            name: self.name,
            customer: self.customer,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
        }
    }
}

/// Parse a `YYYY-MM-DD` date, reporting `field` on failure.
pub fn parse_date(field: &str, raw: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        DomainError::validation(format!("{field} must be a date formatted as YYYY-MM-DD, got `{raw}`"))
    })
}

pub(crate) fn required(field: &str, value: Option<String>) -> DomainResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateJob {
        CreateJob {
            name: Some("Downtown Office Renovation".to_string()),
            customer: Some("ABC Corp".to_string()),
            start_date: Some("2024-03-15".to_string()),
            end_date: Some("2024-06-15".to_string()),
            status: Some("In Progress".to_string()),
        }
    }

    #[test]
    fn validates_complete_payload() {
        let new_job = payload().validate("Not Started").unwrap();
        assert_eq!(new_job.name, "Downtown Office Renovation");
        assert_eq!(new_job.start_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(new_job.end_date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(new_job.status, "In Progress");
    }

    #[test]
    fn missing_status_uses_default() {
        let mut p = payload();
        p.status = None;
        assert_eq!(p.validate("Not Started").unwrap().status, "Not Started");

        let mut p = payload();
        p.status = Some("  ".to_string());
        assert_eq!(p.validate("Queued").unwrap().status, "Queued");
    }

    #[test]
    fn missing_or_blank_required_fields_are_rejected() {
        let mut p = payload();
        p.name = None;
        assert_eq!(
            p.validate("Not Started").unwrap_err(),
            DomainError::validation("name is required")
        );

        let mut p = payload();
        p.customer = Some("   ".to_string());
        assert_eq!(
            p.validate("Not Started").unwrap_err(),
            DomainError::validation("customer is required")
        );

        let mut p = payload();
        p.end_date = None;
        assert_eq!(
            p.validate("Not Started").unwrap_err(),
            DomainError::validation("endDate is required")
        );
    }

    #[test]
    fn malformed_date_is_a_validation_error() {
        let mut p = payload();
        p.start_date = Some("15/03/2024".to_string());
        let err = p.validate("Not Started").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("startDate")));
    }

    #[test]
    fn end_before_start_is_permitted() {
        let mut p = payload();
        p.end_date = Some("2024-01-01".to_string());
        assert!(p.validate("Not Started").is_ok());
    }
}
