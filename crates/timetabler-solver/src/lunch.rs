//! Lunch windows
//!
//! Every class gets a lunch window per weekday. Start hours rotate
//! round-robin through the configured candidates (classes ordered by id) so
//! that classes eat at staggered times. Lesson 1 is never a lunch hour.
//!
//! With placed entries, a window that sits after a gap at the end of the
//! day slides up to follow the class's last lesson.

use std::collections::{BTreeMap, HashMap};

use timetabler_core::{
    ClassGroup, ClassGroupId, LunchWindows, SchoolSettings, TimetableEntry, WEEKDAYS,
};

/// Compute per-class, per-day lunch lesson indices.
///
/// Returns an empty map when lunch is not configured.
pub fn compute_lunch_windows(
    settings: &SchoolSettings,
    classes: &[ClassGroup],
    entries: &[TimetableEntry],
) -> LunchWindows {
    let mut windows = LunchWindows::new();
    if !settings.is_lunch_configured() {
        return windows;
    }

    let starts: Vec<u8> = settings
        .possible_lunch_hours
        .iter()
        .copied()
        .filter(|&h| h > 1)
        .collect();
    if starts.is_empty() {
        return windows;
    }
    let count = settings.lunch_hours_count();

    let mut last_lesson: HashMap<(ClassGroupId, u8), u8> = HashMap::new();
    for entry in entries {
        let last = last_lesson
            .entry((entry.class_group_id, entry.day_of_week))
            .or_insert(entry.lesson_index);
        *last = (*last).max(entry.lesson_index);
    }

    let mut ordered: Vec<&ClassGroup> = classes.iter().collect();
    ordered.sort_by_key(|c| c.id);

    for (position, class) in ordered.into_iter().enumerate() {
        let mut days = BTreeMap::new();
        for day in 0..WEEKDAYS {
            let start = starts[(position + usize::from(day)) % starts.len()];
            let mut window = run(start, count);

            if let (Some(&last), Some(&end)) =
                (last_lesson.get(&(class.id, day)), window.last())
            {
                if let Some(next) = last.checked_add(1).filter(|&n| last <= end && n < start) {
                    window = run(next, count);
                }
            }

            days.insert(day, window);
        }
        windows.insert(class.id, days);
    }
    windows
}

/// `count` consecutive lessons from `start`, cut short before lesson 1
fn run(start: u8, count: u8) -> Vec<u8> {
    (0..count)
        .map_while(|offset| start.checked_add(offset))
        .take_while(|&lesson| lesson > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;

    fn settings(lunch_minutes: u32, hours: &[u8]) -> SchoolSettings {
        SchoolSettings::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        )
        .lunch(lunch_minutes, hours.iter().copied())
    }

    fn entry(class: u32, day: u8, lesson: u8) -> TimetableEntry {
        TimetableEntry {
            class_group_id: class,
            day_of_week: day,
            lesson_index: lesson,
            subject_id: 1,
            teacher_id: 1,
            classroom_id: None,
        }
    }

    fn classes() -> Vec<ClassGroup> {
        // Deliberately out of id order
        vec![ClassGroup::new(20, 1), ClassGroup::new(10, 1)]
    }

    #[test]
    fn not_configured_is_empty() {
        assert!(compute_lunch_windows(&settings(0, &[4, 5]), &classes(), &[]).is_empty());
        assert!(compute_lunch_windows(&settings(30, &[]), &classes(), &[]).is_empty());
        // Only the first lesson was offered
        assert!(compute_lunch_windows(&settings(30, &[1]), &classes(), &[]).is_empty());
    }

    #[test]
    fn round_robin_by_class_id_and_day() {
        let windows = compute_lunch_windows(&settings(30, &[1, 4, 5]), &classes(), &[]);

        assert_eq!(windows[&10][&0], vec![4]);
        assert_eq!(windows[&10][&1], vec![5]);
        assert_eq!(windows[&10][&2], vec![4]);
        assert_eq!(windows[&20][&0], vec![5]);
        assert_eq!(windows[&20][&1], vec![4]);
        assert_eq!(windows[&20].len(), 5);
    }

    #[test]
    fn long_lunch_spans_several_lessons() {
        // 60 minutes of 45-minute lessons
        let windows = compute_lunch_windows(&settings(60, &[5]), &classes(), &[]);
        assert_eq!(windows[&10][&3], vec![5, 6]);
    }

    #[test]
    fn window_never_contains_first_lesson() {
        let entries = vec![entry(10, 0, 1)];
        let windows = compute_lunch_windows(&settings(90, &[1, 2, 3]), &classes(), &entries);
        for days in windows.values() {
            for window in days.values() {
                assert!(!window.contains(&1));
            }
        }
    }

    #[test]
    fn window_slides_to_close_end_of_day_gap() {
        let entries = vec![entry(10, 0, 1), entry(10, 0, 2), entry(10, 1, 3), entry(10, 1, 6)];
        let windows = compute_lunch_windows(&settings(30, &[5]), &classes(), &entries);

        // Lessons end at 2, window at 5: slide to 3
        assert_eq!(windows[&10][&0], vec![3]);
        // A lesson after the window keeps it in place
        assert_eq!(windows[&10][&1], vec![5]);
        // No lessons that day: planned window
        assert_eq!(windows[&10][&2], vec![5]);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let entries = vec![entry(10, 0, 2), entry(20, 3, 4)];
        let s = settings(60, &[3, 4, 5]);
        assert_eq!(
            compute_lunch_windows(&s, &classes(), &entries),
            compute_lunch_windows(&s, &classes(), &entries)
        );
    }

    #[test]
    fn slide_at_last_lesson_index() {
        let entries = vec![entry(10, 0, 255), entry(10, 1, 254)];
        let windows = compute_lunch_windows(&settings(30, &[255]), &classes(), &entries);

        // Nothing after lesson 255 to slide into
        assert_eq!(windows[&10][&0], vec![255]);
        assert_eq!(windows[&10][&1], vec![255]);
    }
}
