//! In-memory store
//!
//! A simple implementation of both collaborator traits. It backs the tests and
//! is what the command-line tool serializes to and from JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    ClassGroup, Classroom, SchoolId, SchoolRepository, SchoolSettings, StoreError, Subject,
    Teacher, TeacherAbsence, Timetable, TimetableId, TimetableStore,
};

/// All stored data of one school
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub id: SchoolId,
    #[serde(default)]
    pub name: String,
    pub settings: Option<SchoolSettings>,
    #[serde(default)]
    pub class_groups: Vec<ClassGroup>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
    #[serde(default)]
    pub absences: Vec<TeacherAbsence>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    #[serde(default)]
    pub schools: Vec<SchoolRecord>,
    #[serde(default)]
    pub timetables: Vec<Timetable>,
    /// Last id handed out; ids are never reused after a delete
    #[serde(default)]
    pub last_timetable_id: TimetableId,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_school(mut self, school: SchoolRecord) -> Self {
        self.schools.push(school);
        self
    }

    pub fn school(&self, id: SchoolId) -> Result<&SchoolRecord, StoreError> {
        self.schools
            .iter()
            .find(|s| s.id == id)
            .ok_or(StoreError::SchoolNotFound(id))
    }

    pub fn school_mut(&mut self, id: SchoolId) -> Result<&mut SchoolRecord, StoreError> {
        self.schools
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::SchoolNotFound(id))
    }

    /// All timetables of a school (primary and substitute)
    pub fn timetables_of(&self, school: SchoolId) -> impl Iterator<Item = &Timetable> {
        self.timetables.iter().filter(move |t| t.school_id == school)
    }

    /// Files written before the counter existed start from the highest
    /// stored id
    fn next_id(&mut self) -> Result<TimetableId, StoreError> {
        let stored = self.timetables.iter().filter_map(|t| t.id).max().unwrap_or(0);
        let id = self
            .last_timetable_id
            .max(stored)
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted)?;
        self.last_timetable_id = id;
        Ok(id)
    }
}

impl SchoolRepository for InMemoryStore {
    fn settings(&self, school: SchoolId) -> Result<Option<SchoolSettings>, StoreError> {
        Ok(self.school(school)?.settings.clone())
    }

    fn class_groups(&self, school: SchoolId) -> Result<Vec<ClassGroup>, StoreError> {
        Ok(self.school(school)?.class_groups.clone())
    }

    fn subjects(&self, school: SchoolId) -> Result<Vec<Subject>, StoreError> {
        Ok(self.school(school)?.subjects.clone())
    }

    fn teachers(&self, school: SchoolId) -> Result<Vec<Teacher>, StoreError> {
        Ok(self.school(school)?.teachers.clone())
    }

    fn classrooms(&self, school: SchoolId) -> Result<Vec<Classroom>, StoreError> {
        Ok(self.school(school)?.classrooms.clone())
    }

    fn absences(&self, school: SchoolId) -> Result<Vec<TeacherAbsence>, StoreError> {
        Ok(self.school(school)?.absences.clone())
    }
}

impl TimetableStore for InMemoryStore {
    fn timetable(&self, id: TimetableId) -> Result<Option<Timetable>, StoreError> {
        Ok(self.timetables.iter().find(|t| t.id == Some(id)).cloned())
    }

    fn insert_timetable(&mut self, mut timetable: Timetable) -> Result<TimetableId, StoreError> {
        let id = self.next_id()?;
        timetable.id = Some(id);
        self.timetables.push(timetable);
        Ok(id)
    }

    fn delete_timetable(&mut self, id: TimetableId) -> Result<(), StoreError> {
        if !self.timetables.iter().any(|t| t.id == Some(id)) {
            return Err(StoreError::TimetableNotFound(id));
        }
        // Substitutes reference their base; they go with it
        self.timetables
            .retain(|t| t.id != Some(id) && t.base_timetable_id != Some(id));
        Ok(())
    }

    fn find_substitute(
        &self,
        base: TimetableId,
        date: NaiveDate,
    ) -> Result<Option<TimetableId>, StoreError> {
        Ok(self
            .timetables
            .iter()
            .find(|t| {
                !t.is_primary
                    && t.base_timetable_id == Some(base)
                    && t.substitute_for_date == Some(date)
            })
            .and_then(|t| t.id))
    }
}
