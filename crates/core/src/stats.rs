//! Read-time aggregates: task stats and subtask progress.
//!
//! Nothing here is stored. Every figure is recomputed from current task
//! rows, so it is always consistent with the children it summarises.

use serde::Serialize;

use crate::task::TaskStatus;

/// `round(100 * completed / total)`, half rounding up; `0` when `total == 0`.
pub fn completion_percent(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    let completed = completed.clamp(0, total);
    let percent = (200 * completed + total) / (2 * total);
    percent as i32
}

/// Status breakdown for a set of tasks (project, milestone, or workspace).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub in_review: i64,
    pub completed: i64,
    pub completion_percent: i32,
}

impl TaskStats {
    /// Build stats from `(status, count)` pairs, e.g. a `GROUP BY status` result.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (TaskStatus, i64)>,
    {
        let mut stats = TaskStats::default();
        for (status, count) in counts {
            stats.total += count;
            match status {
                TaskStatus::Todo => stats.todo += count,
                TaskStatus::InProgress => stats.in_progress += count,
                TaskStatus::InReview => stats.in_review += count,
                TaskStatus::Done => stats.completed += count,
            }
        }
        stats.completion_percent = completion_percent(stats.completed, stats.total);
        stats
    }

    /// Build stats from individual task statuses.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        Self::from_counts(statuses.into_iter().map(|s| (s, 1)))
    }
}

/// Completion of a parent task's subtasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskProgress {
    pub completed: i64,
    pub total: i64,
    pub percent: i32,
}

impl SubtaskProgress {
    pub fn new(completed: i64, total: i64) -> Self {
        Self {
            completed,
            total,
            percent: completion_percent(completed, total),
        }
    }

    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let (completed, total) = statuses.into_iter().fold((0, 0), |(c, t), s| {
            (c + i64::from(s.is_complete()), t + 1)
        });
        Self::new(completed, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_children_is_zero_percent() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(
            SubtaskProgress::from_statuses(Vec::<TaskStatus>::new()),
            SubtaskProgress::new(0, 0)
        );
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(3, 3), 100);
    }

    #[test]
    fn percent_matches_formula_for_small_sets() {
        for total in 1..=25_i64 {
            for completed in 0..=total {
                let expected = (100.0 * completed as f64 / total as f64).round() as i32;
                assert_eq!(completion_percent(completed, total), expected);
            }
        }
    }

    #[test]
    fn subtask_progress_counts_done_only() {
        let progress = SubtaskProgress::from_statuses([
            TaskStatus::Done,
            TaskStatus::InReview,
            TaskStatus::Todo,
            TaskStatus::Done,
        ]);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total, 4);
        assert_eq!(progress.percent, 50);
    }

    #[test]
    fn dashboard_example_one_of_four_done() {
        let stats = TaskStats::from_statuses([
            TaskStatus::Done,
            TaskStatus::InProgress,
            TaskStatus::Todo,
            TaskStatus::Todo,
        ]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.todo, 2);
        assert_eq!(stats.completion_percent, 25);
    }

    #[test]
    fn stats_serialize_camel_case() {
        let json = serde_json::to_value(TaskStats::from_counts([(TaskStatus::InProgress, 2)]))
            .unwrap();
        assert_eq!(json["inProgress"], 2);
        assert_eq!(json["completionPercent"], 0);
    }
}
