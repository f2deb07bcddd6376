//! Placement rules
//!
//! Pure predicates deciding whether a lesson may go into a slot. Nothing
//! here mutates state; callers combine the checks with an `Occupancy`.
//!
//! - Subject rules: no adjacent lessons when consecutive hours are
//!   disallowed; one lesson per day when multiple-per-day is off
//!   (allocation override first, then the subject flag)
//! - Teacher rules: availability, no double booking, weekly cap
//! - Classroom preference for subjects needing a room:
//!   specialized+fitting, specialized, fitting, any free
//!
//! `max_consecutive_hours` is not enforced during placement; the validator
//! reports runs that exceed it.

use timetabler_core::{
    ClassGroup, Classroom, ClassroomId, Slot, Subject, SubjectAllocation, SubjectId, Teacher,
};

use crate::occupancy::Occupancy;

/// Outcome of classroom selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomPick {
    Assigned(ClassroomId),
    /// No room needed or none available for a subject that can do without
    Unassigned,
    /// A room is required but every candidate is busy
    Blocked,
}

impl RoomPick {
    pub fn room(self) -> Option<ClassroomId> {
        match self {
            RoomPick::Assigned(id) => Some(id),
            _ => None,
        }
    }
}

fn allows_multiple(subject: &Subject, allocation: Option<&SubjectAllocation>) -> bool {
    allocation.map_or(subject.allow_multiple_in_one_day, |a| {
        a.allows_multiple_per_day(subject)
    })
}

/// Subject rules for a single lesson at `lesson` given the class's other
/// lessons that day
pub fn subject_rules_allow(
    subject: &Subject,
    allocation: Option<&SubjectAllocation>,
    day_lessons: &[(u8, SubjectId)],
    lesson: u8,
) -> bool {
    let mut same_subject = day_lessons
        .iter()
        .filter(|&&(_, s)| s == subject.id)
        .map(|&(l, _)| l);

    if !subject.allow_consecutive_hours
        && same_subject.clone().any(|l| l.abs_diff(lesson) == 1)
    {
        return false;
    }

    if !allows_multiple(subject, allocation) && same_subject.next().is_some() {
        return false;
    }

    true
}

/// Subject rules for a consecutive block `start..start + len`.
///
/// Lessons inside the block are exempt from the consecutive and
/// multiple-per-day rules among themselves; the rules apply against the
/// subject's other lessons that day.
pub fn block_rules_allow(
    subject: &Subject,
    allocation: Option<&SubjectAllocation>,
    day_lessons: &[(u8, SubjectId)],
    start: u8,
    len: u8,
) -> bool {
    let end = u16::from(start) + u16::from(len) - 1;
    let mut same_subject = day_lessons
        .iter()
        .filter(|&&(_, s)| s == subject.id)
        .map(|&(l, _)| l);

    if !allows_multiple(subject, allocation) && same_subject.clone().next().is_some() {
        return false;
    }

    if !subject.allow_consecutive_hours
        && same_subject.any(|l| {
            let l = u16::from(l);
            l + 1 == u16::from(start) || l == end + 1
        })
    {
        return false;
    }

    true
}

/// Can this teacher take one more lesson at `slot`?
pub fn teacher_can_take(teacher: &Teacher, slot: Slot, occupancy: &Occupancy) -> bool {
    teacher.is_available(slot)
        && !occupancy.teacher_busy(teacher.id, slot)
        && occupancy.teacher_hours(teacher.id) < teacher.max_weekly_hours
}

/// Can this teacher take every slot of a block?
pub fn teacher_can_take_all(teacher: &Teacher, slots: &[Slot], occupancy: &Occupancy) -> bool {
    let needed = slots.len() as u32;
    slots
        .iter()
        .all(|&s| teacher.is_available(s) && !occupancy.teacher_busy(teacher.id, s))
        && occupancy.teacher_hours(teacher.id) + needed <= teacher.max_weekly_hours
}

/// Choose a classroom free at all `slots`.
///
/// A school without classrooms never blocks placement.
pub fn pick_classroom(
    subject: &Subject,
    class: &ClassGroup,
    slots: &[Slot],
    occupancy: &Occupancy,
    classrooms: &[Classroom],
) -> RoomPick {
    if classrooms.is_empty() {
        return RoomPick::Unassigned;
    }

    let free: Vec<&Classroom> = classrooms
        .iter()
        .filter(|r| slots.iter().all(|&s| !occupancy.room_busy(r.id, s)))
        .collect();

    let first = |pred: &dyn Fn(&Classroom) -> bool| free.iter().find(|r| pred(r)).map(|r| r.id);

    if subject.needs_classroom() {
        let special = |r: &Classroom| r.specializes_in(subject.id);
        first(&|r| special(r) && r.fits(class))
            .or_else(|| first(&special))
            .or_else(|| first(&|r| r.fits(class)))
            .or_else(|| first(&|_| true))
            .map_or(RoomPick::Blocked, RoomPick::Assigned)
    } else {
        // Keep specialized rooms for the subjects that need them
        first(&|r| !r.is_specialized() && r.fits(class))
            .or_else(|| first(&|r| !r.is_specialized()))
            .or_else(|| first(&|r| r.fits(class)))
            .or_else(|| first(&|_| true))
            .map_or(RoomPick::Unassigned, RoomPick::Assigned)
    }
}
