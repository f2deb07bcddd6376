//! Slot occupancy index
//!
//! Tracks which classes, teachers and classrooms are busy at each slot,
//! plus per-teacher weekly load and per-class daily lesson lists. Entries
//! are added and removed incrementally, so backtracking can undo a
//! placement in O(1) instead of rescanning a growing entry list.

use std::collections::{HashMap, HashSet};
use timetabler_core::{ClassGroupId, ClassroomId, Slot, SubjectId, TeacherId, TimetableEntry};

#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    classes: HashSet<(ClassGroupId, Slot)>,
    teachers: HashSet<(TeacherId, Slot)>,
    rooms: HashSet<(ClassroomId, Slot)>,
    teacher_hours: HashMap<TeacherId, u32>,
    /// (lesson index, subject) of each lesson per class and day
    class_days: HashMap<(ClassGroupId, u8), Vec<(u8, SubjectId)>>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'e>(entries: impl IntoIterator<Item = &'e TimetableEntry>) -> Self {
        let mut occupancy = Self::new();
        for entry in entries {
            occupancy.add(entry);
        }
        occupancy
    }

    /// Mark all resources of an entry as busy
    pub fn add(&mut self, entry: &TimetableEntry) {
        let slot = entry.slot();
        self.classes.insert((entry.class_group_id, slot));
        self.teachers.insert((entry.teacher_id, slot));
        if let Some(room) = entry.classroom_id {
            self.rooms.insert((room, slot));
        }
        *self.teacher_hours.entry(entry.teacher_id).or_insert(0) += 1;
        self.class_days
            .entry((entry.class_group_id, entry.day_of_week))
            .or_default()
            .push((entry.lesson_index, entry.subject_id));
    }

    /// Undo a previous `add` of the same entry
    pub fn remove(&mut self, entry: &TimetableEntry) {
        let slot = entry.slot();
        self.classes.remove(&(entry.class_group_id, slot));
        self.teachers.remove(&(entry.teacher_id, slot));
        if let Some(room) = entry.classroom_id {
            self.rooms.remove(&(room, slot));
        }
        if let Some(hours) = self.teacher_hours.get_mut(&entry.teacher_id) {
            *hours = hours.saturating_sub(1);
        }
        if let Some(day) = self
            .class_days
            .get_mut(&(entry.class_group_id, entry.day_of_week))
        {
            if let Some(pos) = day
                .iter()
                .position(|&(lesson, subject)| lesson == entry.lesson_index && subject == entry.subject_id)
            {
                day.swap_remove(pos);
            }
        }
    }

    pub fn class_busy(&self, class: ClassGroupId, slot: Slot) -> bool {
        self.classes.contains(&(class, slot))
    }

    pub fn teacher_busy(&self, teacher: TeacherId, slot: Slot) -> bool {
        self.teachers.contains(&(teacher, slot))
    }

    pub fn room_busy(&self, room: ClassroomId, slot: Slot) -> bool {
        self.rooms.contains(&(room, slot))
    }

    /// Lessons currently assigned to a teacher across all classes and days
    pub fn teacher_hours(&self, teacher: TeacherId) -> u32 {
        self.teacher_hours.get(&teacher).copied().unwrap_or(0)
    }

    /// (lesson index, subject) pairs of a class on a day, unordered
    pub fn day_lessons(&self, class: ClassGroupId, day: u8) -> &[(u8, SubjectId)] {
        self.class_days
            .get(&(class, day))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of lessons a class has on a day
    pub fn day_load(&self, class: ClassGroupId, day: u8) -> usize {
        self.day_lessons(class, day).len()
    }

    /// Does the class have a lesson directly before or after this slot?
    pub fn is_adjacent(&self, class: ClassGroupId, slot: Slot) -> bool {
        self.day_lessons(class, slot.day)
            .iter()
            .any(|&(lesson, _)| lesson.abs_diff(slot.lesson) == 1)
    }
}
