//! Precomputed lookups over a school snapshot
//!
//! Capability lists are resolved once into `(class, subject) -> teachers`
//! so the placement loops never scan capabilities again.

use std::collections::HashMap;
use timetabler_core::{
    ClassGroup, ClassGroupId, Classroom, SchoolSnapshot, Subject, SubjectId, Teacher, TeacherId,
};

/// Read-only lookup tables shared by all placement passes
#[derive(Debug)]
pub struct SchoolIndex<'a> {
    pub snapshot: &'a SchoolSnapshot,
    /// Highest lesson index of a day
    pub max_lessons: u8,
    teachers: HashMap<TeacherId, &'a Teacher>,
    subjects: HashMap<SubjectId, &'a Subject>,
    classes: HashMap<ClassGroupId, &'a ClassGroup>,
    /// Qualified teachers per (class, subject), in snapshot order
    eligible: HashMap<(ClassGroupId, SubjectId), Vec<TeacherId>>,
}

impl<'a> SchoolIndex<'a> {
    pub fn new(snapshot: &'a SchoolSnapshot, max_lessons: u8) -> Self {
        let teachers = snapshot.teachers.iter().map(|t| (t.id, t)).collect();
        let subjects = snapshot.subjects.iter().map(|s| (s.id, s)).collect();
        let classes = snapshot.class_groups.iter().map(|c| (c.id, c)).collect();

        let mut eligible: HashMap<(ClassGroupId, SubjectId), Vec<TeacherId>> = HashMap::new();
        for class in &snapshot.class_groups {
            for subject in &snapshot.subjects {
                let qualified: Vec<TeacherId> = snapshot
                    .teachers
                    .iter()
                    .filter(|t| t.qualifies_for(subject.id, class))
                    .map(|t| t.id)
                    .collect();
                if !qualified.is_empty() {
                    eligible.insert((class.id, subject.id), qualified);
                }
            }
        }

        Self {
            snapshot,
            max_lessons,
            teachers,
            subjects,
            classes,
            eligible,
        }
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&'a Teacher> {
        self.teachers.get(&id).copied()
    }

    pub fn subject(&self, id: SubjectId) -> Option<&'a Subject> {
        self.subjects.get(&id).copied()
    }

    pub fn class_group(&self, id: ClassGroupId) -> Option<&'a ClassGroup> {
        self.classes.get(&id).copied()
    }

    pub fn classrooms(&self) -> &'a [Classroom] {
        &self.snapshot.classrooms
    }

    /// Teachers qualified to teach `subject` to `class`
    pub fn eligible(&self, class: ClassGroupId, subject: SubjectId) -> &[TeacherId] {
        self.eligible
            .get(&(class, subject))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
