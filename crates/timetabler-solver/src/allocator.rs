//! Slot allocation
//!
//! The placement primitive shared by both generators. A `SlotAllocator`
//! owns the occupancy index and a step budget; `try_place` and
//! `place_block` test one candidate against every rule and commit it on
//! success.
//!
//! `allocate_class` runs the two-phase primary placement for one class:
//!
//! 1. Blocks: one attempt per full block quota of allocations that demand
//!    consecutive hours
//! 2. Coverage: each weekday without a lesson receives the first lesson of
//!    the queue that fits anywhere on it
//! 3. Distribution: remaining lessons go to the best-ranked legal slot,
//!    ranked by `(adjacent to a lesson that day, day load, day, lesson)`
//!
//! Lessons with no legal slot are returned as `UnplacedLesson`s.

use std::collections::{BTreeMap, HashMap, HashSet};

use timetabler_core::{
    ClassGroup, ClassGroupId, ClassroomId, LunchWindows, Slot, Subject, SubjectAllocation,
    SubjectId, TeacherId, TimetableEntry, UnplacedLesson, WEEKDAYS,
};
use tracing::debug;

use crate::constraints::{
    block_rules_allow, pick_classroom, subject_rules_allow, teacher_can_take,
    teacher_can_take_all, RoomPick,
};
use crate::index::SchoolIndex;
use crate::occupancy::Occupancy;

// ============================================================================
// Budget
// ============================================================================

/// Upper bound on candidate evaluations
#[derive(Clone, Copy, Debug)]
pub struct StepBudget {
    remaining: usize,
    exhausted: bool,
}

impl StepBudget {
    pub fn new(steps: usize) -> Self {
        Self {
            remaining: steps,
            exhausted: false,
        }
    }

    /// Consume one step; false once the budget is spent
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

// ============================================================================
// Lessons and teacher selection
// ============================================================================

/// One teaching hour waiting for a slot
#[derive(Clone, Copy, Debug)]
pub struct Lesson<'a> {
    pub class: &'a ClassGroup,
    pub subject: &'a Subject,
    pub allocation: Option<&'a SubjectAllocation>,
    /// Teacher to try first (the base timetable's teacher when repairing)
    pub teacher_hint: Option<TeacherId>,
    /// Classroom to keep when it is still free
    pub room_hint: Option<ClassroomId>,
}

impl<'a> Lesson<'a> {
    pub fn new(
        class: &'a ClassGroup,
        subject: &'a Subject,
        allocation: Option<&'a SubjectAllocation>,
    ) -> Self {
        Self {
            class,
            subject,
            allocation,
            teacher_hint: None,
            room_hint: None,
        }
    }

    pub fn with_hints(mut self, teacher: TeacherId, room: Option<ClassroomId>) -> Self {
        self.teacher_hint = Some(teacher);
        self.room_hint = room;
        self
    }

    fn key(&self) -> (ClassGroupId, SubjectId) {
        (self.class.id, self.subject.id)
    }
}

/// Teacher search policy for a lesson at a slot
pub trait TeacherSelection {
    /// Teachers to try, in order of preference
    fn candidates(&mut self, lesson: &Lesson<'_>, slot: Slot, index: &SchoolIndex<'_>)
        -> Vec<TeacherId>;

    /// Called after a lesson was placed with `teacher`
    fn commit(&mut self, _lesson: &Lesson<'_>, _teacher: TeacherId) {}
}

/// Primary-timetable policy: each (class, subject) pair is bound to one
/// teacher, either the declared primary teacher or the first one that
/// could be placed. Bound pairs never search for alternates.
#[derive(Debug, Default)]
pub struct BoundTeachers {
    bound: HashMap<(ClassGroupId, SubjectId), TeacherId>,
}

impl BoundTeachers {
    pub fn bound(&self, class: ClassGroupId, subject: SubjectId) -> Option<TeacherId> {
        self.bound.get(&(class, subject)).copied()
    }
}

impl TeacherSelection for BoundTeachers {
    fn candidates(
        &mut self,
        lesson: &Lesson<'_>,
        _slot: Slot,
        index: &SchoolIndex<'_>,
    ) -> Vec<TeacherId> {
        if let Some(teacher) = self.bound.get(&lesson.key()) {
            return vec![*teacher];
        }
        if let Some(teacher) = lesson.allocation.and_then(|a| a.primary_teacher_id) {
            return vec![teacher];
        }
        index.eligible(lesson.class.id, lesson.subject.id).to_vec()
    }

    fn commit(&mut self, lesson: &Lesson<'_>, teacher: TeacherId) {
        self.bound.entry(lesson.key()).or_insert_with(|| {
            debug!(
                class = lesson.class.id,
                subject = lesson.subject.id,
                teacher,
                "Bound teacher"
            );
            teacher
        });
    }
}

// ============================================================================
// Allocator
// ============================================================================

/// Result of placing one class's queue
#[derive(Debug, Default)]
pub struct ClassPlacement {
    pub entries: Vec<TimetableEntry>,
    pub unplaced: Vec<UnplacedLesson>,
}

pub struct SlotAllocator<'s, 'a> {
    index: &'s SchoolIndex<'a>,
    lunch: &'s LunchWindows,
    pub occupancy: Occupancy,
    pub budget: StepBudget,
}

impl<'s, 'a> SlotAllocator<'s, 'a> {
    pub fn new(
        index: &'s SchoolIndex<'a>,
        lunch: &'s LunchWindows,
        occupancy: Occupancy,
        budget: StepBudget,
    ) -> Self {
        Self {
            index,
            lunch,
            occupancy,
            budget,
        }
    }

    pub fn index(&self) -> &'s SchoolIndex<'a> {
        self.index
    }

    /// Is this slot inside the class's lunch window?
    pub fn is_lunch(&self, class: ClassGroupId, slot: Slot) -> bool {
        self.lunch
            .get(&class)
            .and_then(|days| days.get(&slot.day))
            .is_some_and(|lessons| lessons.contains(&slot.lesson))
    }

    fn in_range(&self, slot: Slot) -> bool {
        slot.day < WEEKDAYS && slot.lesson >= 1 && slot.lesson <= self.index.max_lessons
    }

    /// Slot is inside the day, outside lunch and the class is free
    pub fn is_open(&self, class: ClassGroupId, slot: Slot) -> bool {
        self.in_range(slot) && !self.is_lunch(class, slot) && !self.occupancy.class_busy(class, slot)
    }

    fn room_for(&self, lesson: &Lesson<'_>, slots: &[Slot]) -> RoomPick {
        if let Some(room) = lesson.room_hint {
            if slots.iter().all(|&s| !self.occupancy.room_busy(room, s)) {
                return RoomPick::Assigned(room);
            }
        }
        pick_classroom(
            lesson.subject,
            lesson.class,
            slots,
            &self.occupancy,
            self.index.classrooms(),
        )
    }

    /// Place a single lesson at `slot` if every rule allows it
    pub fn try_place(
        &mut self,
        lesson: &Lesson<'_>,
        slot: Slot,
        teachers: &mut impl TeacherSelection,
    ) -> Option<TimetableEntry> {
        if !self.budget.tick() || !self.is_open(lesson.class.id, slot) {
            return None;
        }
        let day_lessons = self.occupancy.day_lessons(lesson.class.id, slot.day);
        if !subject_rules_allow(lesson.subject, lesson.allocation, day_lessons, slot.lesson) {
            return None;
        }
        let room = match self.room_for(lesson, &[slot]) {
            RoomPick::Blocked => return None,
            pick => pick.room(),
        };

        let teacher = teachers
            .candidates(lesson, slot, self.index)
            .into_iter()
            .find(|&id| {
                self.index
                    .teacher(id)
                    .is_some_and(|t| teacher_can_take(t, slot, &self.occupancy))
            })?;

        let entry = TimetableEntry {
            class_group_id: lesson.class.id,
            day_of_week: slot.day,
            lesson_index: slot.lesson,
            subject_id: lesson.subject.id,
            teacher_id: teacher,
            classroom_id: room,
        };
        self.occupancy.add(&entry);
        teachers.commit(lesson, teacher);
        Some(entry)
    }

    /// Place `len` consecutive lessons with one teacher and one classroom
    pub fn place_block(
        &mut self,
        lesson: &Lesson<'_>,
        len: u8,
        teachers: &mut impl TeacherSelection,
    ) -> Option<Vec<TimetableEntry>> {
        let class = lesson.class.id;
        let max = self.index.max_lessons;
        if len == 0 || len > max {
            return None;
        }

        let mut days: Vec<u8> = (0..WEEKDAYS).collect();
        days.sort_by_key(|&d| (self.occupancy.day_load(class, d), d));

        for day in days {
            for start in 1..=max - len + 1 {
                if !self.budget.tick() {
                    return None;
                }
                let end = start + (len - 1);
                let slots: Vec<Slot> = (start..=end).map(|l| Slot::new(day, l)).collect();
                if !slots.iter().all(|&s| self.is_open(class, s)) {
                    continue;
                }
                let day_lessons = self.occupancy.day_lessons(class, day);
                if !block_rules_allow(lesson.subject, lesson.allocation, day_lessons, start, len) {
                    continue;
                }
                let room = match self.room_for(lesson, &slots) {
                    RoomPick::Blocked => continue,
                    pick => pick.room(),
                };
                let Some(teacher) = teachers
                    .candidates(lesson, slots[0], self.index)
                    .into_iter()
                    .find(|&id| {
                        self.index
                            .teacher(id)
                            .is_some_and(|t| teacher_can_take_all(t, &slots, &self.occupancy))
                    })
                else {
                    continue;
                };

                let entries: Vec<TimetableEntry> = slots
                    .iter()
                    .map(|s| TimetableEntry {
                        class_group_id: class,
                        day_of_week: s.day,
                        lesson_index: s.lesson,
                        subject_id: lesson.subject.id,
                        teacher_id: teacher,
                        classroom_id: room,
                    })
                    .collect();
                for entry in &entries {
                    self.occupancy.add(entry);
                }
                teachers.commit(lesson, teacher);
                return Some(entries);
            }
        }
        None
    }

    /// Undo a committed placement
    pub fn release(&mut self, entry: &TimetableEntry) {
        self.occupancy.remove(entry);
    }

    /// Place a class's lesson queue (one item per weekly hour)
    pub fn allocate_class(
        &mut self,
        mut queue: Vec<Lesson<'_>>,
        teachers: &mut impl TeacherSelection,
    ) -> ClassPlacement {
        let mut placement = ClassPlacement::default();
        let Some(first) = queue.first() else {
            return placement;
        };
        let class = first.class.id;

        self.place_blocks(&mut queue, teachers, &mut placement.entries);
        self.cover_days(class, &mut queue, teachers, &mut placement.entries);

        // Distribution; a lesson that fits nowhere leaves every later copy
        // of the same subject without a slot too
        let mut failed: HashSet<SubjectId> = HashSet::new();
        let mut short: BTreeMap<SubjectId, u8> = BTreeMap::new();
        for lesson in &queue {
            if failed.contains(&lesson.subject.id) {
                *short.entry(lesson.subject.id).or_insert(0) += 1;
                continue;
            }
            let mut candidates: Vec<Slot> = (0..WEEKDAYS)
                .flat_map(|d| (1..=self.index.max_lessons).map(move |l| Slot::new(d, l)))
                .filter(|&s| self.is_open(class, s))
                .collect();
            candidates.sort_by_key(|&s| {
                (
                    u8::from(!self.occupancy.is_adjacent(class, s)),
                    self.occupancy.day_load(class, s.day),
                    s.day,
                    s.lesson,
                )
            });

            let placed = candidates
                .into_iter()
                .find_map(|s| self.try_place(lesson, s, teachers));
            match placed {
                Some(entry) => placement.entries.push(entry),
                None => {
                    failed.insert(lesson.subject.id);
                    *short.entry(lesson.subject.id).or_insert(0) += 1;
                }
            }
        }

        placement.unplaced = short
            .into_iter()
            .map(|(subject_id, hours_short)| UnplacedLesson {
                class_group_id: class,
                subject_id,
                hours_short,
            })
            .collect();
        placement
    }

    /// One attempt per full block quota; placed hours leave the queue
    fn place_blocks(
        &mut self,
        queue: &mut Vec<Lesson<'_>>,
        teachers: &mut impl TeacherSelection,
        entries: &mut Vec<TimetableEntry>,
    ) {
        let mut seen: HashSet<SubjectId> = HashSet::new();
        let block_lessons: Vec<(Lesson<'_>, u8, u8)> = queue
            .iter()
            .filter(|l| seen.insert(l.subject.id))
            .filter_map(|l| {
                let allocation = l.allocation?;
                let len = allocation.block_length(l.subject)?;
                Some((*l, len, allocation.weekly_hours / len))
            })
            .collect();

        for (lesson, len, quota) in block_lessons {
            for _ in 0..quota {
                let Some(block) = self.place_block(&lesson, len, teachers) else {
                    debug!(
                        class = lesson.class.id,
                        subject = lesson.subject.id,
                        len,
                        "No block fits; falling back to single lessons"
                    );
                    continue;
                };
                for _ in 0..block.len() {
                    if let Some(pos) = queue.iter().position(|q| q.subject.id == lesson.subject.id) {
                        queue.remove(pos);
                    }
                }
                entries.extend(block);
            }
        }
    }

    /// Give every empty weekday its first placeable lesson
    fn cover_days(
        &mut self,
        class: ClassGroupId,
        queue: &mut Vec<Lesson<'_>>,
        teachers: &mut impl TeacherSelection,
        entries: &mut Vec<TimetableEntry>,
    ) {
        for day in 0..WEEKDAYS {
            if queue.is_empty() {
                break;
            }
            if self.occupancy.day_load(class, day) > 0 {
                continue;
            }
            let mut tried: HashSet<SubjectId> = HashSet::new();
            let found = (0..queue.len()).find_map(|i| {
                if !tried.insert(queue[i].subject.id) {
                    return None;
                }
                (1..=self.index.max_lessons)
                    .find_map(|l| self.try_place(&queue[i], Slot::new(day, l), teachers))
                    .map(|entry| (i, entry))
            });
            if let Some((i, entry)) = found {
                queue.remove(i);
                entries.push(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;
    use timetabler_core::{Capability, Classroom, SchoolSettings, SchoolSnapshot, Teacher};

    fn snapshot() -> SchoolSnapshot {
        let settings = SchoolSettings::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        let mut snapshot = SchoolSnapshot::new(1, settings);
        snapshot.subjects = vec![
            Subject::new(1, "Math"),
            Subject::new(2, "Lab").laboratory(),
        ];
        snapshot.class_groups = vec![ClassGroup::new(10, 1)
            .allocate(SubjectAllocation::new(1, 4))
            .allocate(SubjectAllocation::new(2, 2).consecutive_block(2))];
        snapshot.teachers = vec![
            Teacher::new(1, 20)
                .capable_of(Capability::any_class(1))
                .capable_of(Capability::any_class(2)),
            Teacher::new(2, 20).capable_of(Capability::any_class(1)),
        ];
        snapshot
    }

    fn queue<'a>(snapshot: &'a SchoolSnapshot) -> Vec<Lesson<'a>> {
        let class = &snapshot.class_groups[0];
        class
            .allocations
            .iter()
            .flat_map(|a| {
                let subject = snapshot.subject(a.subject_id).unwrap();
                (0..a.weekly_hours).map(move |_| Lesson::new(class, subject, Some(a)))
            })
            .collect()
    }

    #[test]
    fn budget_runs_out() {
        let mut budget = StepBudget::new(2);
        assert!(budget.tick());
        assert!(budget.tick());
        assert!(!budget.is_exhausted());
        assert!(!budget.tick());
        assert!(budget.is_exhausted());
    }

    #[test]
    fn try_place_respects_lunch_and_busy_class() {
        let snapshot = snapshot();
        let index = SchoolIndex::new(&snapshot, 4);
        let lunch = LunchWindows::from([(10, BTreeMap::from([(0, vec![3])]))]);
        let mut allocator =
            SlotAllocator::new(&index, &lunch, Occupancy::new(), StepBudget::new(1_000));
        let mut teachers = BoundTeachers::default();
        let lessons = queue(&snapshot);

        assert!(allocator.try_place(&lessons[0], Slot::new(0, 3), &mut teachers).is_none());
        assert!(allocator.try_place(&lessons[0], Slot::new(0, 5), &mut teachers).is_none());

        let entry = allocator
            .try_place(&lessons[0], Slot::new(0, 1), &mut teachers)
            .unwrap();
        assert_eq!(entry.teacher_id, 1);
        assert!(allocator.try_place(&lessons[1], Slot::new(0, 1), &mut teachers).is_none());

        // Bound to teacher 1 from now on
        assert_eq!(teachers.bound(10, 1), Some(1));
    }

    #[test]
    fn bound_teacher_is_never_replaced() {
        let snapshot = snapshot();
        let index = SchoolIndex::new(&snapshot, 4);
        let lunch = LunchWindows::new();
        let mut allocator =
            SlotAllocator::new(&index, &lunch, Occupancy::new(), StepBudget::new(1_000));
        let mut teachers = BoundTeachers::default();
        let lessons = queue(&snapshot);

        allocator.try_place(&lessons[0], Slot::new(0, 1), &mut teachers).unwrap();
        // Teacher 1 busy elsewhere at (1, 1); teacher 2 would be free
        allocator.occupancy.add(&TimetableEntry {
            class_group_id: 11,
            day_of_week: 1,
            lesson_index: 1,
            subject_id: 1,
            teacher_id: 1,
            classroom_id: None,
        });
        assert!(allocator.try_place(&lessons[1], Slot::new(1, 1), &mut teachers).is_none());
    }

    #[test]
    fn block_uses_one_teacher_and_room() {
        let mut snapshot = snapshot();
        snapshot.classrooms = vec![Classroom::new(5).specialize(2), Classroom::new(6)];
        let index = SchoolIndex::new(&snapshot, 4);
        let lunch = LunchWindows::new();
        let mut allocator =
            SlotAllocator::new(&index, &lunch, Occupancy::new(), StepBudget::new(1_000));
        let mut teachers = BoundTeachers::default();
        let lab = queue(&snapshot)[4];

        let block = allocator.place_block(&lab, 2, &mut teachers).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block[0].lesson_index + 1, block[1].lesson_index);
        assert_eq!(block[0].day_of_week, block[1].day_of_week);
        assert!(block.iter().all(|e| e.teacher_id == 1 && e.classroom_id == Some(5)));
    }

    #[test]
    fn allocate_class_covers_every_day() {
        let snapshot = snapshot();
        let index = SchoolIndex::new(&snapshot, 4);
        let lunch = LunchWindows::new();
        let mut allocator =
            SlotAllocator::new(&index, &lunch, Occupancy::new(), StepBudget::new(100_000));
        let mut teachers = BoundTeachers::default();

        let placement = allocator.allocate_class(queue(&snapshot), &mut teachers);
        assert!(placement.unplaced.is_empty());
        assert_eq!(placement.entries.len(), 6);
        for day in 0..WEEKDAYS {
            assert!(placement.entries.iter().any(|e| e.day_of_week == day));
        }
        let lab: Vec<&TimetableEntry> =
            placement.entries.iter().filter(|e| e.subject_id == 2).collect();
        assert_eq!(lab.len(), 2);
        assert_eq!(lab[0].day_of_week, lab[1].day_of_week);
    }

    #[test]
    fn unplaceable_lessons_are_reported() {
        let mut snapshot = snapshot();
        // Nobody teaches the lab any more
        snapshot.teachers[0].capabilities.retain(|c| c.subject_id != 2);
        let index = SchoolIndex::new(&snapshot, 4);
        let lunch = LunchWindows::new();
        let mut allocator =
            SlotAllocator::new(&index, &lunch, Occupancy::new(), StepBudget::new(100_000));

        let placement = allocator.allocate_class(queue(&snapshot), &mut BoundTeachers::default());
        assert_eq!(
            placement.unplaced,
            vec![UnplacedLesson {
                class_group_id: 10,
                subject_id: 2,
                hours_short: 2,
            }]
        );
        assert_eq!(placement.entries.len(), 4);
    }
}
