//! Integration tests for primary timetable generation
//!
//! Checks the placement invariants on a mixed school (lunch, blocks,
//! restricted subjects, classrooms) and the basic two-class scenario.

use std::collections::HashSet;

use chrono::NaiveTime;
use pretty_assertions::assert_eq;
use timetabler_core::{
    Capability, ClassGroup, Classroom, GenerationReport, SchoolSettings, SchoolSnapshot, Slot,
    Subject, SubjectAllocation, Teacher, WEEKDAYS,
};
use timetabler_solver::{
    compute_lunch_windows, generate_primary_timetable, lunch_windows_for, validate_timetable,
    ViolationKind,
};

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Three classes, lunch, a lab block and restricted subjects
fn mixed_school() -> SchoolSnapshot {
    let settings = SchoolSettings::new(time(8, 0), time(14, 0))
        .breaks([10])
        .lunch(45, [4, 5]);
    let mut snapshot = SchoolSnapshot::new(1, settings);

    snapshot.subjects = vec![
        Subject::new(1, "Mathematics"),
        Subject::new(2, "Physical education")
            .no_consecutive()
            .once_per_day(),
        Subject::new(3, "Chemistry").laboratory().block(2),
        Subject::new(4, "Language"),
    ];

    let allocations = |class: ClassGroup| {
        class
            .allocate(SubjectAllocation::new(1, 5))
            .allocate(SubjectAllocation::new(2, 2))
            .allocate(SubjectAllocation::new(3, 2))
            .allocate(SubjectAllocation::new(4, 4))
    };
    snapshot.class_groups = vec![
        allocations(ClassGroup::new(3, 2).name("2A").students(24)),
        allocations(ClassGroup::new(1, 1).name("1A").students(28)),
        allocations(ClassGroup::new(2, 1).name("1B").students(31)),
    ];

    snapshot.teachers = vec![
        Teacher::new(1, 25).name("Ada").capable_of(Capability::any_class(1)),
        Teacher::new(2, 25)
            .name("Blaise")
            .capable_of(Capability::any_class(1))
            .capable_of(Capability::any_class(4)),
        Teacher::new(3, 25)
            .name("Carl")
            .capable_of(Capability::any_class(2))
            .capable_of(Capability::any_class(3)),
        Teacher::new(4, 25)
            .name("Dorothy")
            .capable_of(Capability::for_grade(4, 2))
            .capable_of(Capability::for_grade(3, 2))
            .available(0, [2, 3, 4]),
    ];

    snapshot.classrooms = vec![
        Classroom::new(1).name("Lab").capacity(30).specialize(3),
        Classroom::new(2).name("101").capacity(30),
        Classroom::new(3).name("102").capacity(32),
    ];
    snapshot
}

fn assert_no_double_booking(report: &GenerationReport) {
    let mut classes = HashSet::new();
    let mut teachers = HashSet::new();
    let mut rooms = HashSet::new();
    for entry in &report.timetable.entries {
        let slot = entry.slot();
        assert!(classes.insert((entry.class_group_id, slot)), "class clash {entry:?}");
        assert!(teachers.insert((entry.teacher_id, slot)), "teacher clash {entry:?}");
        if let Some(room) = entry.classroom_id {
            assert!(rooms.insert((room, slot)), "room clash {entry:?}");
        }
    }
}

#[test]
fn mixed_school_respects_invariants() {
    let snapshot = mixed_school();
    let report = generate_primary_timetable(&snapshot).unwrap();
    let entries = &report.timetable.entries;

    assert_eq!(report.max_lessons_per_day, 5);
    assert!(report.timetable.is_primary);

    // Every requested hour is either placed or reported
    let requested: u32 = snapshot.class_groups.iter().map(ClassGroup::weekly_hours).sum();
    assert_eq!(entries.len() as u32 + report.hours_short(), requested);

    assert_no_double_booking(&report);

    for teacher in &snapshot.teachers {
        let hours = entries.iter().filter(|e| e.teacher_id == teacher.id).count() as u32;
        assert!(hours <= teacher.max_weekly_hours);
        for entry in entries.iter().filter(|e| e.teacher_id == teacher.id) {
            assert!(teacher.is_available(entry.slot()));
        }
    }

    for entry in entries {
        assert!(entry.day_of_week < WEEKDAYS);
        assert!((1..=report.max_lessons_per_day).contains(&entry.lesson_index));
        let window = &report.lunch_windows[&entry.class_group_id][&entry.day_of_week];
        assert!(!window.contains(&entry.lesson_index), "lesson in lunch {entry:?}");
    }

    // Laboratory lessons always get a classroom
    assert!(entries
        .iter()
        .filter(|e| e.subject_id == 3)
        .all(|e| e.classroom_id.is_some()));

    let violations = validate_timetable(&snapshot, &report.timetable);
    assert!(violations.iter().all(|v| matches!(
        v.kind,
        ViolationKind::WeeklyHoursShort | ViolationKind::MaxConsecutiveHours
    )));
}

#[test]
fn lunch_windows_never_take_first_lesson() {
    let snapshot = mixed_school();
    let report = generate_primary_timetable(&snapshot).unwrap();
    let settings = snapshot.settings.as_ref().unwrap();

    let displayed = lunch_windows_for(settings, &snapshot.class_groups, &report.timetable);
    for windows in [&report.lunch_windows, &displayed] {
        assert_eq!(windows.len(), 3);
        for days in windows.values() {
            assert_eq!(days.len(), usize::from(WEEKDAYS));
            assert!(days.values().all(|w| !w.is_empty() && !w.contains(&1)));
        }
    }

    // Sliding never moves a window onto a placed lesson
    for entry in &report.timetable.entries {
        let window = &displayed[&entry.class_group_id][&entry.day_of_week];
        assert!(!window.contains(&entry.lesson_index));
    }
}

#[test]
fn lunch_computation_is_idempotent() {
    let snapshot = mixed_school();
    let report = generate_primary_timetable(&snapshot).unwrap();
    let settings = snapshot.settings.as_ref().unwrap();

    let first = compute_lunch_windows(settings, &snapshot.class_groups, &report.timetable.entries);
    let second = compute_lunch_windows(settings, &snapshot.class_groups, &report.timetable.entries);
    assert_eq!(first, second);
}

#[test]
fn generation_is_deterministic() {
    let snapshot = mixed_school();
    let a = generate_primary_timetable(&snapshot).unwrap();
    let b = generate_primary_timetable(&snapshot).unwrap();
    assert_eq!(a.timetable.entries, b.timetable.entries);
    assert_eq!(a.unplaced, b.unplaced);
}

/// Two classes, subjects of 4/3/2 hours, two teachers able to teach
/// everything, a four-hour morning and no lunch
#[test]
fn basic_two_class_scenario() {
    let mut snapshot = SchoolSnapshot::new(1, SchoolSettings::new(time(8, 0), time(12, 0)));
    snapshot.subjects = vec![
        Subject::new(1, "Mathematics"),
        Subject::new(2, "Biology"),
        Subject::new(3, "History"),
    ];
    snapshot.class_groups = (1..=2)
        .map(|id| {
            ClassGroup::new(id, 1)
                .allocate(SubjectAllocation::new(1, 4))
                .allocate(SubjectAllocation::new(2, 3))
                .allocate(SubjectAllocation::new(3, 2))
        })
        .collect();
    snapshot.teachers = (1..=2)
        .map(|id| {
            (1..=3).fold(Teacher::new(id, 20), |t, subject| {
                t.capable_of(Capability::any_class(subject))
            })
        })
        .collect();

    let report = generate_primary_timetable(&snapshot).unwrap();
    assert!(report.is_complete());
    assert!(report.lunch_windows.is_empty());
    assert_no_double_booking(&report);

    for class in 1..=2 {
        let entries: Vec<_> = report.timetable.entries_for_class(class).collect();
        assert_eq!(entries.len(), 9);
        for day in 0..WEEKDAYS {
            assert!(
                entries.iter().any(|e| e.day_of_week == day),
                "class {class} has no lesson on {}",
                Slot::new(day, 1).day_name().unwrap()
            );
        }
    }
    assert!(validate_timetable(&snapshot, &report.timetable).is_empty());
}

#[test]
fn bound_teacher_teaches_every_lesson_of_a_pair() {
    let snapshot = mixed_school();
    let report = generate_primary_timetable(&snapshot).unwrap();

    for class in &snapshot.class_groups {
        for allocation in &class.allocations {
            let teachers: HashSet<_> = report
                .timetable
                .entries_for_class(class.id)
                .filter(|e| e.subject_id == allocation.subject_id)
                .map(|e| e.teacher_id)
                .collect();
            assert!(teachers.len() <= 1, "class {} subject {}", class.id, allocation.subject_id);
        }
    }
}

#[test]
fn blocks_fit_at_end_of_a_255_lesson_day() {
    // One-minute lessons over twelve hours clamp to the u8 lesson range
    let settings = SchoolSettings::new(time(6, 0), time(18, 0))
        .class_hour(1)
        .breaks([1]);
    let mut snapshot = SchoolSnapshot::new(1, settings);
    snapshot.subjects = vec![Subject::new(1, "Workshop").block(2)];
    snapshot.class_groups =
        vec![ClassGroup::new(1, 1).allocate(SubjectAllocation::new(1, 10))];
    snapshot.teachers = vec![Teacher::new(1, 40)
        .capable_of(Capability::any_class(1))
        .available(0, [254, 255])];

    let report = generate_primary_timetable(&snapshot).unwrap();
    assert_eq!(report.max_lessons_per_day, u8::MAX);

    let placed = report.timetable.entries.len() as u32;
    assert_eq!(placed + report.hours_short(), 10);

    let monday: Vec<u8> = report
        .timetable
        .entries
        .iter()
        .filter(|e| e.day_of_week == 0)
        .map(|e| e.lesson_index)
        .collect();
    assert!(monday.iter().all(|&l| l >= 254), "{monday:?}");
    assert!(validate_timetable(&snapshot, &report.timetable)
        .iter()
        .all(|v| v.kind == ViolationKind::WeeklyHoursShort));
}
