//! Activity log vocabulary and change diffing.
//!
//! Activity rows are append-only. Each one names an entity, an action, the
//! acting user, and a free-form `changes` object. For updates the object is
//! a field-level diff produced by [`diff_changes`].

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Entity types recorded in the activity log.
pub mod entity_types {
    pub const WORKSPACE: &str = "workspace";
    pub const MEMBER: &str = "member";
    pub const PROJECT: &str = "project";
    pub const MILESTONE: &str = "milestone";
    pub const LABEL: &str = "label";
    /// Also used for time logged against a task.
    pub const TASK: &str = "task";

    pub const ALL: &[&str] = &[WORKSPACE, MEMBER, PROJECT, MILESTONE, LABEL, TASK];
}

/// Actions recorded in the activity log.
pub mod actions {
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const DELETED: &str = "deleted";
    pub const MOVED: &str = "moved";
    pub const TIME_LOGGED: &str = "time_logged";
    pub const TIME_REMOVED: &str = "time_removed";
    pub const MEMBER_ADDED: &str = "member_added";
    pub const ROLE_CHANGED: &str = "role_changed";
    pub const MEMBER_REMOVED: &str = "member_removed";
}

/// Keys that change on every write and carry no information in a diff.
const IGNORED_KEYS: &[&str] = &["updatedAt", "updated_at"];

/// Returns `Ok(())` if `entity_type` is a known activity entity type.
pub fn validate_entity_type(entity_type: &str) -> Result<(), CoreError> {
    if entity_types::ALL.contains(&entity_type) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid entity type '{entity_type}'. Must be one of: {}",
            entity_types::ALL.join(", ")
        )))
    }
}

/// Top-level field diff between two JSON objects.
///
/// Produces `{ field: { "from": old, "to": new } }` for every key whose
/// value differs (a key missing on one side counts as `null`). Non-object
/// inputs yield an empty object.
pub fn diff_changes(before: &Value, after: &Value) -> Value {
    let (Value::Object(before), Value::Object(after)) = (before, after) else {
        return Value::Object(Map::new());
    };

    let mut changes = Map::new();
    let keys = before.keys().chain(after.keys().filter(|k| !before.contains_key(*k)));
    for key in keys {
        if IGNORED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let old = before.get(key).unwrap_or(&Value::Null);
        let new = after.get(key).unwrap_or(&Value::Null);
        if old != new {
            let mut entry = Map::new();
            entry.insert("from".to_string(), old.clone());
            entry.insert("to".to_string(), new.clone());
            changes.insert(key.clone(), Value::Object(entry));
        }
    }
    Value::Object(changes)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn diff_reports_changed_fields_only() {
        let before = json!({"title": "A", "status": "todo", "priority": "low"});
        let after = json!({"title": "A", "status": "done", "priority": "low"});
        assert_eq!(
            diff_changes(&before, &after),
            json!({"status": {"from": "todo", "to": "done"}})
        );
    }

    #[test]
    fn diff_treats_missing_as_null() {
        let before = json!({"assigneeId": 4});
        let after = json!({"milestoneId": 9});
        assert_eq!(
            diff_changes(&before, &after),
            json!({
                "assigneeId": {"from": 4, "to": null},
                "milestoneId": {"from": null, "to": 9}
            })
        );
    }

    #[test]
    fn diff_ignores_updated_at() {
        let before = json!({"updatedAt": "2026-01-01T00:00:00Z"});
        let after = json!({"updatedAt": "2026-01-02T00:00:00Z"});
        assert_eq!(diff_changes(&before, &after), json!({}));
    }

    #[test]
    fn diff_of_non_objects_is_empty() {
        assert_eq!(diff_changes(&json!(1), &json!({"a": 1})), json!({}));
    }

    #[test]
    fn entity_type_validation() {
        assert!(validate_entity_type("task").is_ok());
        assert!(matches!(
            validate_entity_type("scene"),
            Err(CoreError::Validation(msg)) if msg.contains("task")
        ));
        // Time entries are logged under their task.
        assert!(validate_entity_type("time_entry").is_err());
    }
}
