// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, SecondsFormat, Utc};

/// Message trace of one sync run, keyed by the run's start time
#[derive(Debug, Clone)]
pub struct RunLog {
    started_at: DateTime<Utc>,
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            lines: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// ISO 8601 start time to the millisecond
    pub fn key(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
