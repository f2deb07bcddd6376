//! Per-absence substitution records
//!
//! Where the substitute timetable repairs a single day, this pass walks an
//! absence's whole date range and proposes one cover teacher per affected
//! base lesson. Lessons keep their slot and classroom; a lesson nobody can
//! take is still recorded, without a substitute.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use timetabler_core::{
    date_in_week, day_of_week, ScheduleError, SchoolSnapshot, Substitution, SubstitutionStatus,
    TeacherAbsence, TeacherId, Timetable, TimetableEntry,
};
use tracing::{debug, info, warn};

use crate::allocator::{Lesson, TeacherSelection};
use crate::constraints::teacher_can_take;
use crate::index::SchoolIndex;
use crate::occupancy::Occupancy;
use crate::substitute::{shuffle_seed, stored_primary_base, SubstituteTeachers};
use crate::SolverOptions;

/// Propose substitutes for every lesson `absence` removes from `base`
pub fn generate(
    snapshot: &SchoolSnapshot,
    base: &Timetable,
    absence: &TeacherAbsence,
    options: &SolverOptions,
) -> Result<Vec<Substitution>, ScheduleError> {
    let base_id = stored_primary_base(snapshot, base)?;
    if absence.date_to < absence.date_from {
        return Err(ScheduleError::Validation(format!(
            "Absence ends ({}) before it starts ({})",
            absence.date_to, absence.date_from
        )));
    }
    if snapshot.teacher(absence.teacher_id).is_none() {
        return Err(ScheduleError::Validation(format!(
            "Teacher {} not found",
            absence.teacher_id
        )));
    }

    let settings = snapshot.require_complete()?;
    let index = SchoolIndex::new(snapshot, settings.max_lessons_per_day());
    let mut teachers = SubstituteTeachers {
        absent: BTreeMap::new(),
        keep_present: false,
        rng: StdRng::seed_from_u64(shuffle_seed(
            options.shuffle_seed,
            base_id,
            absence.date_from,
        )),
    };

    info!(
        school = snapshot.school_id,
        base = base_id,
        teacher = absence.teacher_id,
        from = %absence.date_from,
        to = %absence.date_to,
        "Generating substitutions"
    );

    // Cover lessons count towards the weekly cap of their week only
    let mut weeks: HashMap<NaiveDate, Occupancy> = HashMap::new();
    let mut substitutions = Vec::new();

    let dates = absence
        .date_from
        .iter_days()
        .take_while(|date| *date <= absence.date_to);
    for date in dates {
        let Some(day) = day_of_week(date) else {
            continue;
        };
        let occupancy = weeks
            .entry(date_in_week(date, 0))
            .or_insert_with(|| Occupancy::from_entries(&base.entries));

        let mut absent = snapshot.absent_on(date);
        absent.insert(absence.teacher_id);
        teachers.absent = BTreeMap::from([(day, absent)]);

        for entry in base
            .entries_on(day)
            .filter(|e| e.teacher_id == absence.teacher_id)
        {
            let substitute = find_substitute(&index, &mut teachers, occupancy, entry);
            match substitute {
                Some(teacher) => occupancy.add(&TimetableEntry {
                    teacher_id: teacher,
                    ..entry.clone()
                }),
                None => debug!(
                    %date,
                    slot = %entry.slot(),
                    class = entry.class_group_id,
                    "No substitute available"
                ),
            }
            substitutions.push(Substitution {
                date,
                entry: entry.clone(),
                original_teacher_id: absence.teacher_id,
                substitute_teacher_id: substitute,
                status: SubstitutionStatus::AutoGenerated,
                new_classroom_id: None,
            });
        }
    }

    let uncovered = substitutions.iter().filter(|s| !s.is_covered()).count();
    if uncovered > 0 {
        warn!(
            teacher = absence.teacher_id,
            uncovered,
            "Some lessons have no substitute"
        );
    }
    info!(
        teacher = absence.teacher_id,
        lessons = substitutions.len(),
        uncovered,
        "Substitutions generated"
    );
    Ok(substitutions)
}

/// First candidate that is qualified, present, free and under the weekly cap
fn find_substitute(
    index: &SchoolIndex<'_>,
    teachers: &mut SubstituteTeachers,
    occupancy: &Occupancy,
    entry: &TimetableEntry,
) -> Option<TeacherId> {
    let class = index.class_group(entry.class_group_id)?;
    let subject = index.subject(entry.subject_id)?;
    let lesson = Lesson::new(class, subject, class.allocation_for(subject.id))
        .with_hints(entry.teacher_id, entry.classroom_id);
    let slot = entry.slot();

    teachers
        .candidates(&lesson, slot, index)
        .into_iter()
        .find(|&id| {
            index
                .teacher(id)
                .is_some_and(|t| teacher_can_take(t, slot, occupancy))
        })
}
