//! Milestone (sprint / milestone / release) vocabularies and validation.

use crate::error::CoreError;
use crate::types::Date;

define_text_enum! {
    MilestoneType("milestone type") {
        Sprint = "sprint",
        Milestone = "milestone",
        Release = "release",
    }
}

define_text_enum! {
    MilestoneStatus("milestone status") {
        Planning = "planning",
        Active = "active",
        Completed = "completed",
        Cancelled = "cancelled",
    }
}

pub const MAX_MILESTONE_NAME_LENGTH: usize = 200;
pub const MAX_SPRINT_GOAL_LENGTH: usize = 2_000;

pub fn validate_milestone_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_MILESTONE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Milestone name must be 1-{MAX_MILESTONE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Both dates are optional; when both are present the end may not precede
/// the start.
pub fn validate_date_range(start: Option<Date>, end: Option<Date>) -> Result<(), CoreError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(CoreError::Validation(format!(
                "Milestone end date {end} is before start date {start}"
            )));
        }
    }
    Ok(())
}

pub fn validate_capacity(capacity: i32) -> Result<(), CoreError> {
    if capacity < 0 {
        return Err(CoreError::Validation(
            "Milestone capacity cannot be negative".into(),
        ));
    }
    Ok(())
}

pub fn validate_sprint_goal(goal: &str) -> Result<(), CoreError> {
    if goal.chars().count() > MAX_SPRINT_GOAL_LENGTH {
        return Err(CoreError::Validation(format!(
            "Sprint goal exceeds maximum length of {MAX_SPRINT_GOAL_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn end_before_start_rejected() {
        assert!(validate_date_range(Some(date("2026-03-10")), Some(date("2026-03-01"))).is_err());
        assert!(validate_date_range(Some(date("2026-03-01")), Some(date("2026-03-01"))).is_ok());
    }

    #[test]
    fn open_ended_ranges_allowed() {
        assert!(validate_date_range(None, Some(date("2026-03-01"))).is_ok());
        assert!(validate_date_range(Some(date("2026-03-01")), None).is_ok());
        assert!(validate_date_range(None, None).is_ok());
    }

    #[test]
    fn capacity_non_negative() {
        assert!(validate_capacity(0).is_ok());
        assert!(validate_capacity(-1).is_err());
    }

    #[test]
    fn vocabularies() {
        assert_eq!("release".parse::<MilestoneType>().unwrap(), MilestoneType::Release);
        assert_eq!(MilestoneStatus::Cancelled.as_str(), "cancelled");
        assert!("done".parse::<MilestoneStatus>().is_err());
    }
}
