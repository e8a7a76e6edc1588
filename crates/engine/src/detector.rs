//! Change detection.
//!
//! Upstream's `lastUpdatedTime` is the only signal used to decide whether to
//! notify. Activity and history differences only decorate the email once a
//! change is already known.

use casewatch_common::error::AppError;
use casewatch_common::types::StatusRecord;

use crate::render::format_local_millis;

/// `true` when there is no previous record or the upstream timestamp moved.
pub fn has_changed(current: &StatusRecord, previous: Option<&StatusRecord>) -> bool {
    match previous {
        None => true,
        Some(prev) => current.last_updated_time != prev.last_updated_time,
    }
}

/// Human-readable change lines for the notification.
///
/// A first sighting has nothing to compare against and yields no lines.
pub fn describe_changes(
    current: &StatusRecord,
    previous: Option<&StatusRecord>,
) -> Result<Vec<String>, AppError> {
    if previous.is_none() {
        return Ok(Vec::new());
    }

    Ok(vec![format!(
        "Application {} updated at {}",
        current.application_number,
        format_local_millis(current.last_updated_time)?
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last_updated_time: i64, status: &str) -> StatusRecord {
        serde_json::from_value(serde_json::json!({
            "applicationNumber": "C1",
            "status": status,
            "lastUpdatedTime": last_updated_time,
        }))
        .unwrap()
    }

    #[test]
    fn test_first_sighting_is_a_change() {
        assert!(has_changed(&record(1000, "submitted"), None));
    }

    #[test]
    fn test_same_timestamp_is_not_a_change() {
        // Content differences alone never trigger a notification.
        let current = record(1000, "approved");
        let previous = record(1000, "submitted");
        assert!(!has_changed(&current, Some(&previous)));
    }

    #[test]
    fn test_timestamp_moved_is_a_change() {
        assert!(has_changed(&record(2000, "x"), Some(&record(1000, "x"))));
        // Moving backwards still counts.
        assert!(has_changed(&record(500, "x"), Some(&record(1000, "x"))));
    }

    #[test]
    fn test_describe_changes() {
        let current = record(2000, "approved");
        assert!(describe_changes(&current, None).unwrap().is_empty());

        let lines = describe_changes(&current, Some(&record(1000, "submitted"))).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            format!(
                "Application C1 updated at {}",
                format_local_millis(2000).unwrap()
            )
        );
    }
}
