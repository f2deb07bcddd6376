//! Substitute timetable generation
//!
//! A substitute timetable overrides one day of a primary timetable. Classes
//! without lessons by absent teachers keep that day unchanged. Affected
//! classes are repaired in three steps:
//!
//! 1. Rearrangement: the class's lessons of the day are re-placed within
//!    the same day by backtracking, original slot first. Present teachers
//!    keep their lessons; absent ones are replaced by the allocation's
//!    primary teacher, then teachers holding a primary capability, then a
//!    shuffled pick of qualified teachers.
//! 2. Relocation: lessons of absent teachers move to later weekdays of the
//!    same week, keeping the original teacher where present that day.
//! 3. Fallback: the original entries stay, absent teacher included.
//!
//! One occupancy index seeded with the whole base week carries teacher
//! load across classes and both repair steps.

use std::collections::{BTreeMap, BTreeSet};
use std::iter;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use timetabler_core::{
    date_in_week, day_of_week, ClassGroupId, ClassRepair, Relocation, RepairStrategy,
    ScheduleError, SchoolSnapshot, Slot, SubstituteReport, TeacherId, Timetable, TimetableEntry,
    TimetableId, WEEKDAYS,
};
use tracing::{debug, info, warn};

use crate::allocator::{Lesson, SlotAllocator, StepBudget, TeacherSelection};
use crate::index::SchoolIndex;
use crate::lunch::compute_lunch_windows;
use crate::occupancy::Occupancy;
use crate::SolverOptions;

// ============================================================================
// Teacher selection
// ============================================================================

/// Per-slot teacher search without binding
pub(crate) struct SubstituteTeachers {
    /// Absent teachers per weekday of the target week
    pub(crate) absent: BTreeMap<u8, BTreeSet<TeacherId>>,
    /// Only the lesson's own teacher when present (rearrangement)
    pub(crate) keep_present: bool,
    pub(crate) rng: StdRng,
}

impl TeacherSelection for SubstituteTeachers {
    fn candidates(
        &mut self,
        lesson: &Lesson<'_>,
        slot: Slot,
        index: &SchoolIndex<'_>,
    ) -> Vec<TeacherId> {
        let absent = self.absent.get(&slot.day);
        let is_absent = |t: &TeacherId| absent.is_some_and(|a| a.contains(t));

        let mut out = Vec::new();
        if let Some(teacher) = lesson.teacher_hint.filter(|t| !is_absent(t)) {
            out.push(teacher);
            if self.keep_present {
                return out;
            }
        }
        if let Some(primary) = lesson
            .allocation
            .and_then(|a| a.primary_teacher_id)
            .filter(|t| !is_absent(t) && !out.contains(t))
        {
            out.push(primary);
        }

        let (preferred, mut pool): (Vec<TeacherId>, Vec<TeacherId>) = index
            .eligible(lesson.class.id, lesson.subject.id)
            .iter()
            .copied()
            .filter(|t| !is_absent(t) && !out.contains(t))
            .partition(|&t| {
                index
                    .teacher(t)
                    .is_some_and(|teacher| teacher.is_primary_for(lesson.subject.id, lesson.class))
            });
        out.extend(preferred);
        pool.shuffle(&mut self.rng);
        out.extend(pool);
        out
    }
}

pub(crate) fn shuffle_seed(base: u64, timetable: TimetableId, date: NaiveDate) -> u64 {
    base ^ (u64::from(timetable) << 32) ^ u64::from(date.num_days_from_ce().unsigned_abs())
}

// ============================================================================
// Repair
// ============================================================================

/// A base lesson of the target day
#[derive(Clone, Copy)]
struct DayLesson<'a, 'e> {
    lesson: Lesson<'a>,
    original: &'e TimetableEntry,
    absent_teacher: bool,
}

struct Repair<'s, 'a> {
    allocator: SlotAllocator<'s, 'a>,
    teachers: SubstituteTeachers,
    day: u8,
    rearrangement_budget: usize,
}

impl Repair<'_, '_> {
    /// Re-place all lessons of the day for one class; all or nothing
    fn rearrange(&mut self, lessons: &[DayLesson<'_, '_>]) -> Option<Vec<TimetableEntry>> {
        for l in lessons {
            self.allocator.release(l.original);
        }

        let mut ordered = lessons.to_vec();
        ordered.sort_by_key(|l| (!l.absent_teacher, l.original.lesson_index));
        let slots: Vec<Slot> = (1..=self.allocator.index().max_lessons)
            .map(|lesson| Slot::new(self.day, lesson))
            .collect();

        let outer = std::mem::replace(
            &mut self.allocator.budget,
            StepBudget::new(self.rearrangement_budget),
        );
        self.teachers.keep_present = true;
        let mut placed = Vec::new();
        let found = self.backtrack(&ordered, &slots, &mut placed);
        if self.allocator.budget.is_exhausted() {
            warn!(
                budget = self.rearrangement_budget,
                "Rearrangement step budget exhausted"
            );
        }
        self.allocator.budget = outer;

        if found {
            return Some(placed);
        }
        for entry in &placed {
            self.allocator.release(entry);
        }
        for l in lessons {
            self.allocator.occupancy.add(l.original);
        }
        None
    }

    fn backtrack(
        &mut self,
        lessons: &[DayLesson<'_, '_>],
        slots: &[Slot],
        placed: &mut Vec<TimetableEntry>,
    ) -> bool {
        let Some((first, rest)) = lessons.split_first() else {
            return true;
        };
        let original = first.original.slot();
        let order = iter::once(original).chain(slots.iter().copied().filter(|&s| s != original));

        for slot in order {
            if self.allocator.budget.is_exhausted() {
                return false;
            }
            let Some(entry) = self
                .allocator
                .try_place(&first.lesson, slot, &mut self.teachers)
            else {
                continue;
            };
            placed.push(entry);
            if self.backtrack(rest, slots, placed) {
                return true;
            }
            if let Some(entry) = placed.pop() {
                self.allocator.release(&entry);
            }
        }
        false
    }

    /// Move lessons of absent teachers to later days of the week.
    ///
    /// Returns the moved entries with their original slots.
    fn relocate(&mut self, lessons: &[DayLesson<'_, '_>]) -> Option<Vec<(TimetableEntry, Slot)>> {
        let moving: Vec<&DayLesson<'_, '_>> = lessons.iter().filter(|l| l.absent_teacher).collect();
        for l in &moving {
            self.allocator.release(l.original);
        }

        self.teachers.keep_present = false;
        let max = self.allocator.index().max_lessons;
        let mut moved: Vec<(TimetableEntry, Slot)> = Vec::new();

        for l in &moving {
            let target = (self.day + 1..WEEKDAYS)
                .flat_map(|d| (1..=max).map(move |lesson| Slot::new(d, lesson)))
                .find_map(|slot| self.allocator.try_place(&l.lesson, slot, &mut self.teachers));

            match target {
                Some(entry) => moved.push((entry, l.original.slot())),
                None => {
                    for (entry, _) in &moved {
                        self.allocator.release(entry);
                    }
                    for l in &moving {
                        self.allocator.occupancy.add(l.original);
                    }
                    return None;
                }
            }
        }
        Some(moved)
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Id of `base`, which must be a stored primary timetable of the school
pub(crate) fn stored_primary_base(
    snapshot: &SchoolSnapshot,
    base: &Timetable,
) -> Result<TimetableId, ScheduleError> {
    if base.school_id != snapshot.school_id {
        return Err(ScheduleError::Validation(
            "Base timetable not found for this school".into(),
        ));
    }
    if !base.is_primary {
        return Err(ScheduleError::Validation(
            "Base timetable must be a primary timetable".into(),
        ));
    }
    base.id.ok_or_else(|| {
        ScheduleError::Validation("Base timetable has not been stored".into())
    })
}

/// Generate a substitute timetable for `date` on top of `base`
pub fn generate(
    snapshot: &SchoolSnapshot,
    base: &Timetable,
    date: NaiveDate,
    options: &SolverOptions,
) -> Result<SubstituteReport, ScheduleError> {
    let base_id = stored_primary_base(snapshot, base)?;
    let Some(day) = day_of_week(date) else {
        return Err(ScheduleError::Validation(format!(
            "{date} is not a school day"
        )));
    };

    let settings = snapshot.require_complete()?;
    let max_lessons = settings.max_lessons_per_day();
    if max_lessons == 0 {
        return Err(ScheduleError::Configuration(
            "School day is too short for a single lesson".into(),
        ));
    }

    let absent_by_day: BTreeMap<u8, BTreeSet<TeacherId>> = (0..WEEKDAYS)
        .map(|d| (d, snapshot.absent_on(date_in_week(date, d))))
        .collect();
    let absent: Vec<TeacherId> = absent_by_day
        .get(&day)
        .map(|a| a.iter().copied().collect())
        .unwrap_or_default();

    info!(
        school = snapshot.school_id,
        base = base_id,
        %date,
        absent = absent.len(),
        "Generating substitute timetable"
    );

    let lunch_windows = compute_lunch_windows(settings, &snapshot.class_groups, &[]);
    let index = SchoolIndex::new(snapshot, max_lessons);
    let mut repair = Repair {
        allocator: SlotAllocator::new(
            &index,
            &lunch_windows,
            Occupancy::from_entries(&base.entries),
            StepBudget::new(options.allocator_step_budget),
        ),
        teachers: SubstituteTeachers {
            absent: absent_by_day,
            keep_present: true,
            rng: StdRng::seed_from_u64(shuffle_seed(options.shuffle_seed, base_id, date)),
        },
        day,
        rearrangement_budget: options.rearrangement_step_budget,
    };

    let mut by_class: BTreeMap<ClassGroupId, Vec<&TimetableEntry>> = BTreeMap::new();
    for entry in base.entries_on(day) {
        by_class.entry(entry.class_group_id).or_default().push(entry);
    }

    let mut timetable = Timetable::substitute(snapshot.school_id, base_id, date);
    let mut repairs = Vec::new();
    let mut relocations = Vec::new();

    for (class_id, entries) in by_class {
        let affected = entries.iter().filter(|e| absent.contains(&e.teacher_id)).count();
        let keep_all = |timetable: &mut Timetable| {
            timetable.entries.extend(entries.iter().map(|e| (*e).clone()));
        };

        if affected == 0 {
            keep_all(&mut timetable);
            repairs.push(ClassRepair {
                class_group_id: class_id,
                strategy: RepairStrategy::Unchanged,
                affected_lessons: 0,
            });
            continue;
        }

        let lessons = day_lessons(&index, class_id, &entries, &absent);
        let strategy = match lessons {
            None => {
                warn!(class = class_id, "Class or subject data missing; keeping base lessons");
                keep_all(&mut timetable);
                RepairStrategy::Unresolved
            }
            Some(lessons) => {
                if let Some(placed) = repair.rearrange(&lessons) {
                    timetable.entries.extend(placed);
                    RepairStrategy::Rearranged
                } else if let Some(moved) = repair.relocate(&lessons) {
                    timetable.entries.extend(
                        lessons
                            .iter()
                            .filter(|l| !l.absent_teacher)
                            .map(|l| l.original.clone()),
                    );
                    for (entry, from) in moved {
                        relocations.push(Relocation {
                            class_group_id: class_id,
                            subject_id: entry.subject_id,
                            from,
                            to: entry.slot(),
                            teacher_id: entry.teacher_id,
                        });
                        timetable.entries.push(entry);
                    }
                    RepairStrategy::Relocated
                } else {
                    warn!(
                        class = class_id,
                        affected,
                        "No substitute or relocation found; keeping absent teacher"
                    );
                    keep_all(&mut timetable);
                    RepairStrategy::Unresolved
                }
            }
        };

        debug!(class = class_id, affected, %strategy, "Class repaired");
        repairs.push(ClassRepair {
            class_group_id: class_id,
            strategy,
            affected_lessons: affected,
        });
    }

    if repair.allocator.budget.is_exhausted() {
        warn!(
            budget = options.allocator_step_budget,
            "Relocation step budget exhausted"
        );
    }

    timetable.sort_entries();
    info!(
        base = base_id,
        %date,
        entries = timetable.entries.len(),
        relocated = relocations.len(),
        "Substitute timetable generated"
    );

    Ok(SubstituteReport {
        timetable,
        absent_teachers: absent,
        repairs,
        relocations,
    })
}

/// Lessons of one class on the target day, or None if the class or a
/// subject is unknown
fn day_lessons<'a, 'e>(
    index: &SchoolIndex<'a>,
    class_id: ClassGroupId,
    entries: &[&'e TimetableEntry],
    absent: &[TeacherId],
) -> Option<Vec<DayLesson<'a, 'e>>> {
    let class = index.class_group(class_id)?;
    entries
        .iter()
        .map(|&entry| {
            let subject = index.subject(entry.subject_id)?;
            let lesson = Lesson::new(class, subject, class.allocation_for(subject.id))
                .with_hints(entry.teacher_id, entry.classroom_id);
            Some(DayLesson {
                lesson,
                original: entry,
                absent_teacher: absent.contains(&entry.teacher_id),
            })
        })
        .collect()
}
