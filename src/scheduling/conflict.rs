//! Double-booking detection.
//!
//! Intervals are half-open: an appointment ending at 10:30 and one starting
//! at 10:30 do not conflict.

use chrono::{DateTime, Utc};

use super::interval::AppointmentInterval;

/// Whether `entry` blocks booking `[start, end)` for `resource_id`.
///
/// The entry with id `ignore_id` never blocks, so a reschedule is not
/// reported as conflicting with its own current slot.
fn overlaps(
    entry: &AppointmentInterval,
    resource_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore_id: Option<&str>,
) -> bool {
    entry.resource_id == resource_id
        && ignore_id != Some(entry.id.as_str())
        && start < entry.end
        && entry.start < end
}

/// Existing intervals for `resource_id` that overlap `[start, end)`.
///
/// Ordering of `start`/`end` is the caller's responsibility.
pub fn find_conflicts<'a>(
    existing: &'a [AppointmentInterval],
    resource_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore_id: Option<&str>,
) -> Vec<&'a AppointmentInterval> {
    existing
        .iter()
        .filter(|e| overlaps(e, resource_id, start, end, ignore_id))
        .collect()
}

/// Whether booking `[start, end)` for `resource_id` would double-book it.
pub fn has_conflict(
    existing: &[AppointmentInterval],
    resource_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore_id: Option<&str>,
) -> bool {
    existing
        .iter()
        .any(|e| overlaps(e, resource_id, start, end, ignore_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn booked(id: &str, resource: &str, from: (u32, u32), to: (u32, u32)) -> AppointmentInterval {
        AppointmentInterval::new(id, resource, at(from.0, from.1), at(to.0, to.1))
    }

    #[test]
    fn test_empty_schedule_never_conflicts() {
        assert!(!has_conflict(&[], "R", at(10, 0), at(11, 0), None));
    }

    #[test]
    fn test_other_resources_are_ignored() {
        let existing = vec![
            booked("a", "other", (10, 0), (10, 30)),
            booked("b", "another", (9, 0), (12, 0)),
        ];
        assert!(!has_conflict(&existing, "R", at(10, 0), at(10, 30), None));
    }

    #[test]
    fn test_touching_endpoints_do_not_conflict() {
        let existing = vec![booked("a", "R", (10, 0), (10, 30))];
        assert!(!has_conflict(&existing, "R", at(10, 30), at(11, 0), None));
        assert!(!has_conflict(&existing, "R", at(9, 30), at(10, 0), None));
    }

    #[test]
    fn test_overlaps_conflict() {
        let existing = vec![booked("a", "R", (10, 0), (10, 30))];
        // partial overlap
        assert!(has_conflict(&existing, "R", at(10, 15), at(10, 45), None));
        // identical
        assert!(has_conflict(&existing, "R", at(10, 0), at(10, 30), None));
        // containing
        assert!(has_conflict(&existing, "R", at(9, 0), at(11, 0), None));
        // contained
        assert!(has_conflict(&existing, "R", at(10, 5), at(10, 10), None));
    }

    #[test]
    fn test_reschedule_ignores_itself() {
        let existing = vec![booked("A", "R", (10, 0), (10, 30))];
        assert!(!has_conflict(&existing, "R", at(10, 0), at(10, 30), Some("A")));
        assert!(has_conflict(&existing, "R", at(10, 0), at(10, 30), Some("B")));
    }

    #[test]
    fn test_find_conflicts_lists_colliding_entries() {
        let existing = vec![
            booked("a", "R", (9, 0), (9, 30)),
            booked("b", "R", (10, 0), (10, 30)),
            booked("c", "R", (10, 30), (11, 0)),
            booked("d", "other", (10, 0), (11, 0)),
        ];

        let ids: Vec<_> = find_conflicts(&existing, "R", at(10, 15), at(10, 45), None)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);

        assert!(find_conflicts(&existing, "R", at(10, 15), at(10, 45), Some("b"))
            .iter()
            .all(|e| e.id == "c"));
    }

    #[test]
    fn test_has_conflict_matches_find_conflicts() {
        let existing = vec![
            booked("a", "R", (9, 0), (9, 30)),
            booked("b", "R", (10, 0), (10, 30)),
            booked("c", "other", (10, 0), (11, 0)),
        ];

        for hour in 8..12 {
            for minute in [0, 15, 30, 45] {
                for ignore in [None, Some("a"), Some("b")] {
                    let start = at(hour, minute);
                    let end = start + chrono::Duration::minutes(30);
                    assert_eq!(
                        has_conflict(&existing, "R", start, end, ignore),
                        !find_conflicts(&existing, "R", start, end, ignore).is_empty(),
                        "{}:{:02} ignoring {:?}",
                        hour,
                        minute,
                        ignore
                    );
                }
            }
        }
    }
}
