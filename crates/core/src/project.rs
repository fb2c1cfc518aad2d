//! Project vocabularies and validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

define_text_enum! {
    /// Project lifecycle status.
    ProjectStatus("project status") {
        Active = "active",
        OnHold = "on_hold",
        Archived = "archived",
    }
}

pub const DEFAULT_PROJECT_COLOR: &str = "#6366F1";
pub const MAX_PROJECT_NAME_LENGTH: usize = 100;
pub const MAX_LABEL_NAME_LENGTH: usize = 50;

/// Project keys: a letter followed by 1-9 letters or digits.
static PROJECT_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]{1,9}$").expect("valid regex"));

/// `#RRGGBB`.
static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"));

/// Trim and upper-case a project key, then validate it.
///
/// Keys are unique per workspace and prefix task references (`WEB-12`).
pub fn normalize_project_key(raw: &str) -> Result<String, CoreError> {
    let key = raw.trim().to_ascii_uppercase();
    if !PROJECT_KEY_RE.is_match(&key) {
        return Err(CoreError::Validation(format!(
            "Invalid project key '{raw}'. Use 2-10 letters or digits, starting with a letter"
        )));
    }
    Ok(key)
}

pub fn validate_project_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_PROJECT_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Project name must be 1-{MAX_PROJECT_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_label_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_LABEL_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Label name must be 1-{MAX_LABEL_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a `#RRGGBB` colour (projects and labels).
pub fn validate_color(color: &str) -> Result<(), CoreError> {
    if !COLOR_RE.is_match(color) {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Expected #RRGGBB"
        )));
    }
    Ok(())
}

/// Human-facing task reference, e.g. `WEB-12`.
pub fn task_reference(project_key: &str, number: i32) -> String {
    format!("{project_key}-{number}")
}
