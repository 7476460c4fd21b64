use std::time::Duration;

use chrono::NaiveDate;

use crate::error::ConfigError;

/// Closed date interval; both ends are part of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(name: &'static str, start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvertedWindow { name, start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub topics_window: DateWindow,
    pub drives_window: DateWindow,
    pub absence_window: DateWindow,
    pub mentee_threshold: i32,
    pub query_timeout: Option<Duration>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            topics_window: october(1, 31),
            drives_window: october(15, 31),
            absence_window: october(15, 31),
            mentee_threshold: 15,
            query_timeout: None,
        }
    }
}

fn october(first: u32, last: u32) -> DateWindow {
    let day = |d| NaiveDate::from_ymd_opt(2020, 10, d).unwrap_or_default();
    DateWindow {
        start: day(first),
        end: day(last),
    }
}
