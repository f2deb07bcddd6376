//! Primary timetable generation
//!
//! Builds the weekly timetable for every class of a school. Classes are
//! processed in id order against one shared occupancy index, so later
//! classes see the teachers and rooms already taken by earlier ones.

use std::cmp::Reverse;

use timetabler_core::{
    ClassGroup, GenerationReport, ScheduleError, SchoolSnapshot, Subject, SubjectAllocation,
    Timetable, UnplacedLesson,
};
use tracing::{debug, info, warn};

use crate::allocator::{BoundTeachers, Lesson, SlotAllocator, StepBudget};
use crate::index::SchoolIndex;
use crate::lunch::compute_lunch_windows;
use crate::occupancy::Occupancy;
use crate::SolverOptions;

pub const DEFAULT_NAME: &str = "Primary timetable";

/// How hard a lesson is to place; harder lessons go first
pub fn difficulty(subject: &Subject, allocation: &SubjectAllocation) -> u32 {
    let mut score = 0;
    if subject.requires_specialized_classroom {
        score += 10;
    }
    if subject.is_laboratory {
        score += 5;
    }
    if let Some(len) = allocation.block_length(subject) {
        score += 3 * u32::from(len);
    }
    if !allocation.allows_multiple_per_day(subject) {
        score += 5;
    }
    if !subject.allow_consecutive_hours {
        score += 2;
    }
    score
}

/// One lesson per weekly hour, hardest first (stable within a score).
///
/// Allocations referencing unknown subjects cannot be placed and are
/// returned separately.
pub fn lesson_queue<'a>(
    index: &SchoolIndex<'a>,
    class: &'a ClassGroup,
) -> (Vec<Lesson<'a>>, Vec<UnplacedLesson>) {
    let mut queue = Vec::new();
    let mut missing = Vec::new();

    for allocation in class.allocations.iter().filter(|a| a.weekly_hours > 0) {
        let Some(subject) = index.subject(allocation.subject_id) else {
            warn!(
                class = class.id,
                subject = allocation.subject_id,
                "Allocation references unknown subject"
            );
            missing.push(UnplacedLesson {
                class_group_id: class.id,
                subject_id: allocation.subject_id,
                hours_short: allocation.weekly_hours,
            });
            continue;
        };
        let lesson = Lesson::new(class, subject, Some(allocation));
        queue.extend(std::iter::repeat(lesson).take(usize::from(allocation.weekly_hours)));
    }

    queue.sort_by_key(|l| {
        Reverse(l.allocation.map_or(0, |a| difficulty(l.subject, a)))
    });
    (queue, missing)
}

/// Generate a primary timetable for the snapshot's school
pub fn generate(
    snapshot: &SchoolSnapshot,
    options: &SolverOptions,
) -> Result<GenerationReport, ScheduleError> {
    let settings = snapshot.require_complete()?;
    let max_lessons = settings.max_lessons_per_day();
    if max_lessons == 0 {
        return Err(ScheduleError::Configuration(
            "School day is too short for a single lesson".into(),
        ));
    }

    info!(
        school = snapshot.school_id,
        classes = snapshot.class_groups.len(),
        teachers = snapshot.teachers.len(),
        max_lessons,
        "Generating primary timetable"
    );

    let lunch_windows = compute_lunch_windows(settings, &snapshot.class_groups, &[]);
    let index = SchoolIndex::new(snapshot, max_lessons);
    let mut allocator = SlotAllocator::new(
        &index,
        &lunch_windows,
        Occupancy::new(),
        StepBudget::new(options.allocator_step_budget),
    );
    let mut teachers = BoundTeachers::default();

    let mut classes: Vec<&ClassGroup> = snapshot.class_groups.iter().collect();
    classes.sort_by_key(|c| c.id);

    let mut timetable = Timetable::primary(snapshot.school_id, DEFAULT_NAME);
    let mut unplaced = Vec::new();

    for class in classes {
        let (queue, missing) = lesson_queue(&index, class);
        debug!(class = class.id, lessons = queue.len(), "Placing class");
        unplaced.extend(missing);

        let placement = allocator.allocate_class(queue, &mut teachers);
        for short in &placement.unplaced {
            warn!(
                class = short.class_group_id,
                subject = short.subject_id,
                hours_short = short.hours_short,
                "Lessons could not be placed"
            );
        }
        timetable.entries.extend(placement.entries);
        unplaced.extend(placement.unplaced);
    }

    if allocator.budget.is_exhausted() {
        warn!(
            budget = options.allocator_step_budget,
            "Allocator step budget exhausted; timetable is partial"
        );
    }

    timetable.sort_entries();
    info!(
        school = snapshot.school_id,
        entries = timetable.entries.len(),
        unplaced = unplaced.len(),
        "Primary timetable generated"
    );

    Ok(GenerationReport {
        timetable,
        unplaced,
        max_lessons_per_day: max_lessons,
        lunch_windows,
    })
}
