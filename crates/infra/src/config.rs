//! Service configuration from CLI flags and environment variables.
//!
//! ```bash
//! jobtrack-api --port 8080 --database-url 'sqlite://jobs.db?mode=rwc'
//! JOBTRACK_PORT=8080 JOBTRACK_MAX_PAGE_SIZE=50 jobtrack-api
//! ```

use clap::Parser;

use jobtrack_jobs::PageLimits;

use crate::service::{DEFAULT_JOB_STATUS, ServiceSettings};

#[derive(Debug, Clone, Parser)]
#[command(name = "jobtrack-api")]
#[command(about = "HTTP API for jobs and the workers assigned to them")]
#[command(version)]
pub struct Config {
    /// Host/IP to listen on
    #[arg(long, default_value = "0.0.0.0", env = "JOBTRACK_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "JOBTRACK_PORT")]
    pub port: u16,

    /// SQLite URL; an in-memory store is used when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Status given to jobs created without one
    #[arg(long, default_value = DEFAULT_JOB_STATUS, env = "JOBTRACK_DEFAULT_JOB_STATUS")]
    pub default_job_status: String,

    /// Page size used when a list request has no `limit`
    #[arg(long, default_value_t = 10, env = "JOBTRACK_DEFAULT_PAGE_SIZE")]
    pub default_page_size: u32,

    /// Upper bound for `limit`; larger values are clamped
    #[arg(long, default_value_t = 100, env = "JOBTRACK_MAX_PAGE_SIZE")]
    pub max_page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("page sizes must be positive")]
    ZeroPageSize,
    #[error("default page size {default} exceeds max page size {max}")]
    DefaultAboveMax { default: u32, max: u32 },
    #[error("default job status must not be blank")]
    BlankDefaultStatus,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            default_job_status: DEFAULT_JOB_STATUS.to_string(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Config {
    /// Parse from the process arguments and environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::DefaultAboveMax {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        if self.default_job_status.trim().is_empty() {
            return Err(ConfigError::BlankDefaultStatus);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            default_job_status: self.default_job_status.clone(),
            page_limits: PageLimits {
                default_per_page: self.default_page_size,
                max_per_page: self.max_page_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.service_settings(), ServiceSettings::default());
    }

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "jobtrack-api",
            "--port",
            "9000",
            "--database-url",
            "sqlite::memory:",
            "--max-page-size",
            "25",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.service_settings().page_limits.max_per_page, 25);
    }

    #[test]
    fn rejects_inconsistent_page_sizes() {
        let config = Config {
            default_page_size: 50,
            max_page_size: 20,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DefaultAboveMax { default: 50, max: 20 })
        );

        let config = Config {
            max_page_size: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPageSize));
    }
}
