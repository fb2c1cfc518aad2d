//! Workspace naming rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

pub const MAX_WORKSPACE_NAME_LENGTH: usize = 100;
pub const MIN_SLUG_LENGTH: usize = 2;
pub const MAX_SLUG_LENGTH: usize = 48;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

/// Derive a URL slug from a display name.
///
/// Lower-cases ASCII letters and digits, turns every other run of characters
/// into a single `-`, and trims to [`MAX_SLUG_LENGTH`].
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(MAX_SLUG_LENGTH);
    slug.trim_end_matches('-').to_string()
}

pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.len() < MIN_SLUG_LENGTH || slug.len() > MAX_SLUG_LENGTH || !SLUG_RE.is_match(slug) {
        return Err(CoreError::Validation(format!(
            "Invalid slug '{slug}'. Use {MIN_SLUG_LENGTH}-{MAX_SLUG_LENGTH} lowercase letters, \
             digits, and single dashes"
        )));
    }
    Ok(())
}

pub fn validate_workspace_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_WORKSPACE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Workspace name must be 1-{MAX_WORKSPACE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}
