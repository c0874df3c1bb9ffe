//! Time reports
//!
//! A [`ReportBuilder`] answers "how much business time did each of these
//! people's tasks spend in each of these stages?" for one board. It reads
//! candidate tasks from the cache, fetches each task's transition history
//! from the tracker, runs the [`StageDwellAggregator`] and keeps the rows
//! above [`MIN_REPORTED_DWELL_SECS`].
//!
//! The collaborators are traits so that the builder can be exercised without
//! a tracker or a database:
//!
//! | Trait | Production implementation |
//! |-------|---------------------------|
//! | [`TaskCandidateSource`] | [`Database`](crate::db::Database) |
//! | [`TaskHistorySource`] | [`BlockingTracker`](crate::tracker::BlockingTracker) |
//! | [`ReportSink`] | [`Database`](crate::db::Database) |
//!
//! One task failing to load never fails the report; it is listed in
//! [`Report::skipped`] instead.

use crate::accounting::{ReportDateRange, StageDwellAggregator, StageDwellResult};
use crate::calendar::WorkCalendar;
use crate::error::Result;
use crate::types::{CandidateTask, ReportRow, TaskHistory};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Rows at or below this many seconds are not reported.
pub const MIN_REPORTED_DWELL_SECS: i64 = 60;

/// Source of task transition histories.
pub trait TaskHistorySource {
    /// Failures are reported as [`Error::TransientFetch`](crate::Error::TransientFetch).
    fn fetch_history(&self, task_id: &str) -> Result<TaskHistory>;
}

/// Source of tasks worth examining for a (board, stage, person) selection.
pub trait TaskCandidateSource {
    fn candidate_tasks(
        &self,
        board_id: &str,
        stage_id: &str,
        person_id: &str,
    ) -> Result<Vec<CandidateTask>>;
}

/// Destination of finished reports.
pub trait ReportSink {
    /// Replace whatever was stored for the request's board with `report`.
    fn replace_report(&self, request: &ReportRequest, report: &Report) -> Result<()>;
}

/// What to report on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub board_id: String,
    pub stage_ids: Vec<String>,
    pub person_ids: Vec<String>,
    /// Reporting window; `None` counts the whole history
    pub range: Option<ReportDateRange>,
}

/// A task left out of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTask {
    pub task_id: String,
    pub task_name: String,
    pub reason: String,
}

/// Result of building a report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub generated_at: Option<DateTime<Utc>>,
    pub rows: Vec<ReportRow>,
    /// Tasks whose history could not be loaded or accounted
    pub skipped: Vec<SkippedTask>,
    /// Distinct tasks looked at
    pub tasks_examined: usize,
}

impl Report {
    /// Sum of all row durations.
    pub fn total(&self) -> Duration {
        self.rows
            .iter()
            .fold(Duration::zero(), |acc, row| acc + row.duration)
    }
}

/// Builds [`Report`]s against one calendar snapshot.
pub struct ReportBuilder<'a> {
    calendar: Arc<WorkCalendar>,
    tz: Tz,
    candidates: &'a dyn TaskCandidateSource,
    history: &'a dyn TaskHistorySource,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        calendar: Arc<WorkCalendar>,
        tz: Tz,
        candidates: &'a dyn TaskCandidateSource,
        history: &'a dyn TaskHistorySource,
    ) -> Self {
        Self {
            calendar,
            tz,
            candidates,
            history,
        }
    }

    /// Build a report as of `now`.
    pub fn build(&self, request: &ReportRequest, now: DateTime<Utc>) -> Result<Report> {
        self.build_with_progress(request, now, |_, _, _| {})
    }

    /// Build a report, calling `on_progress(current, total, candidate)` before
    /// each candidate is processed.
    pub fn build_with_progress<F>(
        &self,
        request: &ReportRequest,
        now: DateTime<Utc>,
        mut on_progress: F,
    ) -> Result<Report>
    where
        F: FnMut(usize, usize, &CandidateTask),
    {
        let mut selected = Vec::new();
        for stage_id in &request.stage_ids {
            for person_id in &request.person_ids {
                selected.extend(self.candidates.candidate_tasks(
                    &request.board_id,
                    stage_id,
                    person_id,
                )?);
            }
        }

        tracing::info!(
            board_id = %request.board_id,
            stages = request.stage_ids.len(),
            people = request.person_ids.len(),
            candidates = selected.len(),
            "Building report"
        );

        let aggregator =
            StageDwellAggregator::new(&self.calendar, self.tz, request.range.as_ref());
        let threshold = Duration::seconds(MIN_REPORTED_DWELL_SECS);

        // Per task: the dwell result, or why it is missing
        let mut dwell: HashMap<String, std::result::Result<StageDwellResult, String>> =
            HashMap::new();
        let mut report = Report {
            generated_at: Some(now),
            ..Default::default()
        };

        let total = selected.len();
        for (i, candidate) in selected.iter().enumerate() {
            on_progress(i, total, candidate);

            let outcome = dwell.entry(candidate.task_id.clone()).or_insert_with(|| {
                let result = self
                    .history
                    .fetch_history(&candidate.task_id)
                    .and_then(|history| aggregator.aggregate(&history, now));

                match result {
                    Ok(result) => {
                        tracing::debug!(
                            task_id = %candidate.task_id,
                            task = %candidate.task_name,
                            "Loaded task history"
                        );
                        Ok(result)
                    }
                    Err(e) => {
                        tracing::warn!(
                            task_id = %candidate.task_id,
                            error = %e,
                            "Skipping task"
                        );
                        report.skipped.push(SkippedTask {
                            task_id: candidate.task_id.clone(),
                            task_name: candidate.task_name.clone(),
                            reason: e.to_string(),
                        });
                        Err(e.to_string())
                    }
                }
            });

            if let Ok(result) = outcome {
                let spent = result.get(&candidate.stage_id);
                if spent > threshold {
                    report.rows.push(ReportRow::new(candidate, spent));
                }
            }
        }

        report.tasks_examined = dwell.len();

        tracing::info!(
            board_id = %request.board_id,
            rows = report.rows.len(),
            skipped = report.skipped.len(),
            "Report built"
        );

        Ok(report)
    }

    /// Build a report and hand it to `sink` as a full replacement.
    pub fn run(
        &self,
        request: &ReportRequest,
        now: DateTime<Utc>,
        sink: &dyn ReportSink,
    ) -> Result<Report> {
        let report = self.build(request, now)?;
        sink.replace_report(request, &report)?;
        Ok(report)
    }
}
