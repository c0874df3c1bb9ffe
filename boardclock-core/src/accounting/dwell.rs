//! Per-stage dwell time of a single task.

use super::range::{filtered_business_time, ReportDateRange};
use crate::calendar::WorkCalendar;
use crate::error::{Error, Result};
use crate::types::{StageTransitionEvent, TaskHistory};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Business time accumulated per stage id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDwellResult {
    by_stage: BTreeMap<String, Duration>,
}

impl StageDwellResult {
    fn add(&mut self, stage_id: &str, duration: Duration) {
        *self
            .by_stage
            .entry(stage_id.to_string())
            .or_insert_with(Duration::zero) += duration;
    }

    /// Time spent in `stage_id`; zero for stages never visited.
    pub fn get(&self, stage_id: &str) -> Duration {
        self.by_stage
            .get(stage_id)
            .copied()
            .unwrap_or_else(Duration::zero)
    }

    /// Sum over all stages.
    pub fn total(&self) -> Duration {
        self.by_stage
            .values()
            .fold(Duration::zero(), |acc, d| acc + *d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.by_stage.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.by_stage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stage.is_empty()
    }
}

/// Splits a task's lifetime at its stage transitions and accounts each piece
/// to the stage the task was in.
#[derive(Debug, Clone, Copy)]
pub struct StageDwellAggregator<'a> {
    calendar: &'a WorkCalendar,
    tz: Tz,
    range: Option<&'a ReportDateRange>,
}

impl<'a> StageDwellAggregator<'a> {
    pub fn new(calendar: &'a WorkCalendar, tz: Tz, range: Option<&'a ReportDateRange>) -> Self {
        Self {
            calendar,
            tz,
            range,
        }
    }

    fn local(&self, ts: DateTime<Utc>) -> NaiveDateTime {
        ts.with_timezone(&self.tz).naive_local()
    }

    /// Dwell time per stage from creation until `now`, or until the task was
    /// closed.
    ///
    /// Transitions are sorted here, so callers may pass them in any order.
    /// Transitions stamped before creation or after the end are pinned to
    /// those bounds and contribute nothing.
    pub fn aggregate(&self, history: &TaskHistory, now: DateTime<Utc>) -> Result<StageDwellResult> {
        let end = history.closed_at.unwrap_or(now);
        if end < history.created_at {
            return Err(Error::InvalidRange(format!(
                "task {} ends at {} before it was created at {}",
                history.task_id, end, history.created_at
            )));
        }

        // Wall-clock time can run backwards across a DST fall-back
        let begin = self.local(history.created_at);
        let finish = self.local(end).max(begin);

        let mut transitions: Vec<&StageTransitionEvent> = history.transitions.iter().collect();
        transitions.sort_by_key(|e| e.timestamp);

        let mut result = StageDwellResult::default();

        let Some(last) = transitions.last() else {
            let spent = filtered_business_time(self.calendar, self.range, begin, finish)?;
            result.add(&history.current_stage_id, spent);
            return Ok(result);
        };

        let mut cursor = begin;
        for event in &transitions {
            let at = self.local(event.timestamp).clamp(cursor, finish);
            let spent = filtered_business_time(self.calendar, self.range, cursor, at)?;
            result.add(&event.source_stage_id, spent);
            cursor = at;
        }

        let spent = filtered_business_time(self.calendar, self.range, cursor, finish)?;
        result.add(&last.destination_stage_id, spent);

        tracing::trace!(
            task_id = %history.task_id,
            transitions = transitions.len(),
            stages = result.len(),
            "Aggregated dwell time"
        );

        Ok(result)
    }
}
