//! Id and timestamp helpers.
//!
//! Entity ids are prefixed UUID v7 strings (`task-0190…`), so they sort by
//! creation time and read unambiguously in logs and prompts.

use uuid::Uuid;

/// Generate a prefixed UUID v7 id, e.g. `activity-01902f…`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

/// Current UTC time as an ISO 8601 string with second precision.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Current UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix() {
        let id = generate_id("task");
        assert!(id.starts_with("task-"));
        assert_eq!(id.len(), "task-".len() + 36);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_id("subtask");
        let b = generate_id("subtask");
        assert_ne!(a, b);
    }

    #[test]
    fn timestamps_have_expected_shape() {
        let ts = now_iso();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(today().len(), 10);
        assert!(ts.starts_with(&today()));
    }
}
