use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("database connection is unusable")]
    Connection(#[source] sqlx::Error),

    #[error("query against `{collection}` failed")]
    Query {
        collection: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("`{report}` matched no documents")]
    EmptyResult { report: &'static str },

    #[error("`{report}` did not finish within {after:?}")]
    Timeout {
        report: &'static str,
        after: Duration,
    },
}

impl ReportError {
    pub fn query(collection: &'static str, source: sqlx::Error) -> Self {
        ReportError::Query { collection, source }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} window starts on {start} but ends on {end}")]
    InvertedWindow {
        name: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    },
}
