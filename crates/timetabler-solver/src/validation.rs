//! Timetable validation
//!
//! A caller-facing check that runs separately from generation. It reports
//! double bookings and broken subject rules. It also reports the
//! best-effort outcomes the generators accept: lessons that could not be
//! placed in a primary timetable, and absent teachers kept by the
//! substitute fallback.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use timetabler_core::{
    date_in_week, ClassGroupId, SchoolSnapshot, Slot, SubjectId, TeacherId, Timetable, WEEKDAYS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    TeacherConflict,
    ClassConflict,
    ClassroomConflict,
    TeacherHoursExceeded,
    ConsecutiveHours,
    MaxConsecutiveHours,
    MultipleInDay,
    WeeklyHoursShort,
    AbsentTeacher,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
    /// Index into `Timetable::entries` of the offending entry
    pub entry: Option<usize>,
}

impl Violation {
    fn new(kind: ViolationKind, message: String, entry: Option<usize>) -> Self {
        Self {
            kind,
            message,
            entry,
        }
    }
}

/// Check a timetable against the school's rules
pub fn validate_timetable(snapshot: &SchoolSnapshot, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_conflicts(timetable, &mut violations);
    check_teacher_hours(snapshot, timetable, &mut violations);
    check_subject_rules(snapshot, timetable, &mut violations);
    if timetable.is_primary {
        check_weekly_hours(snapshot, timetable, &mut violations);
    } else {
        check_absences(snapshot, timetable, &mut violations);
    }
    violations
}

fn check_conflicts(timetable: &Timetable, out: &mut Vec<Violation>) {
    let mut classes: HashMap<(ClassGroupId, Slot), usize> = HashMap::new();
    let mut teachers: HashMap<(TeacherId, Slot), usize> = HashMap::new();
    let mut rooms: HashMap<(u32, Slot), usize> = HashMap::new();

    for (i, entry) in timetable.entries.iter().enumerate() {
        let slot = entry.slot();
        if let Some(&first) = classes.get(&(entry.class_group_id, slot)) {
            out.push(Violation::new(
                ViolationKind::ClassConflict,
                format!(
                    "Class {} has two lessons at {slot} (entries {first} and {i})",
                    entry.class_group_id
                ),
                Some(i),
            ));
        } else {
            classes.insert((entry.class_group_id, slot), i);
        }

        if let Some(&first) = teachers.get(&(entry.teacher_id, slot)) {
            out.push(Violation::new(
                ViolationKind::TeacherConflict,
                format!(
                    "Teacher {} is double-booked at {slot} (entries {first} and {i})",
                    entry.teacher_id
                ),
                Some(i),
            ));
        } else {
            teachers.insert((entry.teacher_id, slot), i);
        }

        if let Some(room) = entry.classroom_id {
            if let Some(&first) = rooms.get(&(room, slot)) {
                out.push(Violation::new(
                    ViolationKind::ClassroomConflict,
                    format!("Classroom {room} is double-booked at {slot} (entries {first} and {i})"),
                    Some(i),
                ));
            } else {
                rooms.insert((room, slot), i);
            }
        }
    }
}

fn check_teacher_hours(snapshot: &SchoolSnapshot, timetable: &Timetable, out: &mut Vec<Violation>) {
    let mut hours: BTreeMap<TeacherId, u32> = BTreeMap::new();
    for entry in &timetable.entries {
        *hours.entry(entry.teacher_id).or_insert(0) += 1;
    }
    for (teacher_id, count) in hours {
        let Some(teacher) = snapshot.teacher(teacher_id) else {
            continue;
        };
        if count > teacher.max_weekly_hours {
            out.push(Violation::new(
                ViolationKind::TeacherHoursExceeded,
                format!(
                    "Teacher {teacher_id} teaches {count} lessons, maximum is {}",
                    teacher.max_weekly_hours
                ),
                None,
            ));
        }
    }
}

/// Maximal runs of consecutive lesson indices, with the entry index that
/// starts each run
fn runs(lessons: &mut [(u8, usize)]) -> Vec<(usize, usize)> {
    lessons.sort_unstable();
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut previous: Option<u8> = None;
    for &(lesson, index) in lessons.iter() {
        match (previous, runs.last_mut()) {
            (Some(p), Some(run)) if p.checked_add(1) == Some(lesson) => run.1 += 1,
            _ => runs.push((index, 1)),
        }
        previous = Some(lesson);
    }
    runs
}

fn check_subject_rules(snapshot: &SchoolSnapshot, timetable: &Timetable, out: &mut Vec<Violation>) {
    let mut days: BTreeMap<(ClassGroupId, u8, SubjectId), Vec<(u8, usize)>> = BTreeMap::new();
    for (i, entry) in timetable.entries.iter().enumerate() {
        days.entry((entry.class_group_id, entry.day_of_week, entry.subject_id))
            .or_default()
            .push((entry.lesson_index, i));
    }

    for ((class_id, day, subject_id), mut lessons) in days {
        let Some(subject) = snapshot.subject(subject_id) else {
            continue;
        };
        let allocation = snapshot
            .class_group(class_id)
            .and_then(|c| c.allocation_for(subject_id));
        let block = allocation
            .and_then(|a| a.block_length(subject))
            .or(subject.required_block_length.filter(|&n| n >= 2));
        let multiple = allocation.map_or(subject.allow_multiple_in_one_day, |a| {
            a.allows_multiple_per_day(subject)
        });

        let count = lessons.len();
        let runs = runs(&mut lessons);
        let slot_name = Slot::new(day, 1)
            .day_name()
            .map_or_else(|| format!("day {day}"), str::to_string);
        let unit = usize::from(block.unwrap_or(1));

        if !subject.allow_consecutive_hours {
            if let Some(&(entry, len)) = runs.iter().find(|&&(_, len)| len > unit) {
                out.push(Violation::new(
                    ViolationKind::ConsecutiveHours,
                    format!(
                        "Subject {subject_id} has {len} consecutive lessons for class {class_id} on {slot_name}"
                    ),
                    Some(entry),
                ));
            }
        }

        if let Some(max) = subject.max_consecutive_hours {
            if let Some(&(entry, len)) = runs.iter().find(|&&(_, len)| len > usize::from(max)) {
                out.push(Violation::new(
                    ViolationKind::MaxConsecutiveHours,
                    format!(
                        "Subject {subject_id} runs {len} lessons for class {class_id} on {slot_name}, maximum is {max}"
                    ),
                    Some(entry),
                ));
            }
        }

        let units = if block.is_some() { runs.len() } else { count };
        if !multiple && units > 1 {
            out.push(Violation::new(
                ViolationKind::MultipleInDay,
                format!(
                    "Subject {subject_id} occurs {units} times for class {class_id} on {slot_name}"
                ),
                runs.get(1).map(|&(entry, _)| entry),
            ));
        }
    }
}

fn check_weekly_hours(snapshot: &SchoolSnapshot, timetable: &Timetable, out: &mut Vec<Violation>) {
    let mut placed: HashMap<(ClassGroupId, SubjectId), u32> = HashMap::new();
    for entry in &timetable.entries {
        *placed
            .entry((entry.class_group_id, entry.subject_id))
            .or_insert(0) += 1;
    }

    let mut classes: Vec<_> = snapshot.class_groups.iter().collect();
    classes.sort_by_key(|c| c.id);
    for class in classes {
        for allocation in &class.allocations {
            let have = placed
                .get(&(class.id, allocation.subject_id))
                .copied()
                .unwrap_or(0);
            let want = u32::from(allocation.weekly_hours);
            if have < want {
                out.push(Violation::new(
                    ViolationKind::WeeklyHoursShort,
                    format!(
                        "Class {} has {have} of {want} weekly lessons of subject {}",
                        class.id, allocation.subject_id
                    ),
                    None,
                ));
            }
        }
    }
}

fn check_absences(snapshot: &SchoolSnapshot, timetable: &Timetable, out: &mut Vec<Violation>) {
    let Some(date) = timetable.substitute_for_date else {
        return;
    };
    let absent: Vec<_> = (0..WEEKDAYS)
        .map(|d| snapshot.absent_on(date_in_week(date, d)))
        .collect();

    for (i, entry) in timetable.entries.iter().enumerate() {
        let is_absent = absent
            .get(usize::from(entry.day_of_week))
            .is_some_and(|a| a.contains(&entry.teacher_id));
        if is_absent {
            out.push(Violation::new(
                ViolationKind::AbsentTeacher,
                format!(
                    "Teacher {} is absent on {} but teaches at {}",
                    entry.teacher_id,
                    date_in_week(date, entry.day_of_week),
                    entry.slot()
                ),
                Some(i),
            ));
        }
    }
}
