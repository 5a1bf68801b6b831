use std::str::FromStr;

use crate::error::{AppError, Result};

/// Earliest year the yearly endpoint will report on.
pub const MIN_REPORT_YEAR: i32 = 2020;

/// Number of years in a multi-year report when the caller does not ask.
pub const DEFAULT_REPORT_YEARS: i32 = 3;

/// Upper bound on the `years` parameter of a multi-year report.
pub const MAX_REPORT_YEARS: i32 = 10;

/// How long a SQLite fetch may wait for a pooled connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

pub const DB_MAX_CONNECTIONS: u32 = 8;

/// Backing store for the record source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sqlite,
    Memory,
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(SourceKind::Sqlite),
            "memory" => Ok(SourceKind::Memory),
            other => Err(AppError::Config(format!(
                "RECORD_SOURCE must be 'sqlite' or 'memory', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Sqlite => write!(f, "sqlite"),
            SourceKind::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Which record source backs the reports (RECORD_SOURCE)
    pub record_source: SourceKind,
    /// JSON file with `{"ideas": [...], "sales": [...]}` loaded into the memory source (SEED_PATH)
    pub seed_path: Option<String>,
    /// Default year count for multi-year reports (REPORT_YEARS)
    pub report_years: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let report_years = std::env::var("REPORT_YEARS")
            .unwrap_or_else(|_| DEFAULT_REPORT_YEARS.to_string())
            .parse::<i32>()
            .map_err(|_| AppError::Config("REPORT_YEARS must be an integer".to_string()))?;
        if !(1..=MAX_REPORT_YEARS).contains(&report_years) {
            return Err(AppError::Config(format!(
                "REPORT_YEARS must be between 1 and {MAX_REPORT_YEARS}"
            )));
        }

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "marketplace.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            record_source: std::env::var("RECORD_SOURCE")
                .unwrap_or_else(|_| "sqlite".to_string())
                .parse()?,
            seed_path: std::env::var("SEED_PATH")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            report_years,
        })
    }
}
