//! Domain snapshot loading
//!
//! Generation never touches the persistence boundary directly. Everything it
//! needs for one school is loaded up front into a `SchoolSnapshot`, and the
//! algorithms run as pure functions over it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    ClassGroup, ClassGroupId, Classroom, ClassroomId, SchoolId, SchoolRepository, SchoolSettings,
    ScheduleError, Subject, SubjectId, Teacher, TeacherAbsence, TeacherId,
};

/// Fully-resolved, read-only view of one school
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchoolSnapshot {
    pub school_id: SchoolId,
    pub settings: Option<SchoolSettings>,
    pub class_groups: Vec<ClassGroup>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub classrooms: Vec<Classroom>,
    pub absences: Vec<TeacherAbsence>,
}

impl SchoolSnapshot {
    pub fn new(school_id: SchoolId, settings: SchoolSettings) -> Self {
        Self {
            school_id,
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn class_group(&self, id: ClassGroupId) -> Option<&ClassGroup> {
        self.class_groups.iter().find(|c| c.id == id)
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    pub fn classroom(&self, id: ClassroomId) -> Option<&Classroom> {
        self.classrooms.iter().find(|r| r.id == id)
    }

    /// Settings, or a configuration error when they are missing or invalid
    pub fn require_settings(&self) -> Result<&SchoolSettings, ScheduleError> {
        let settings = self.settings.as_ref().ok_or_else(|| {
            ScheduleError::Configuration(format!(
                "School settings not found for school {}",
                self.school_id
            ))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Settings, classes and teachers must all be present before generation
    pub fn require_complete(&self) -> Result<&SchoolSettings, ScheduleError> {
        let settings = self.require_settings()?;
        if self.class_groups.is_empty() {
            return Err(ScheduleError::Configuration(format!(
                "No classes found for school {}",
                self.school_id
            )));
        }
        if self.teachers.is_empty() {
            return Err(ScheduleError::Configuration(format!(
                "No teachers found for school {}",
                self.school_id
            )));
        }
        Ok(settings)
    }

    /// Teachers with an absence covering `date`
    pub fn absent_on(&self, date: NaiveDate) -> BTreeSet<TeacherId> {
        self.absences
            .iter()
            .filter(|a| a.covers(date))
            .map(|a| a.teacher_id)
            .collect()
    }
}

/// Load everything generation needs for one school.
///
/// Fails with a configuration error when settings, classes or teachers are
/// missing; generation cannot proceed without all three.
pub fn load_snapshot<R: SchoolRepository + ?Sized>(
    repo: &R,
    school_id: SchoolId,
) -> Result<SchoolSnapshot, ScheduleError> {
    let snapshot = SchoolSnapshot {
        school_id,
        settings: repo.settings(school_id)?,
        class_groups: repo.class_groups(school_id)?,
        subjects: repo.subjects(school_id)?,
        teachers: repo.teachers(school_id)?,
        classrooms: repo.classrooms(school_id)?,
        absences: repo.absences(school_id)?,
    };
    snapshot.require_complete()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, SchoolRecord, SubjectAllocation};
    use chrono::NaiveTime;

    fn settings() -> SchoolSettings {
        SchoolSettings::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        )
    }

    fn record() -> SchoolRecord {
        SchoolRecord {
            id: 1,
            name: "Test School".into(),
            settings: Some(settings()),
            class_groups: vec![ClassGroup::new(1, 1).allocate(SubjectAllocation::new(1, 2))],
            subjects: vec![Subject::new(1, "Math")],
            teachers: vec![Teacher::new(1, 10)],
            classrooms: Vec::new(),
            absences: Vec::new(),
        }
    }

    #[test]
    fn loads_complete_school() {
        let mut store = InMemoryStore::default();
        store.schools.push(record());

        let snapshot = load_snapshot(&store, 1).unwrap();
        assert_eq!(snapshot.class_groups.len(), 1);
        assert_eq!(snapshot.teachers.len(), 1);
        assert!(snapshot.subject(1).is_some());
    }

    #[test]
    fn missing_settings_is_configuration_error() {
        let mut store = InMemoryStore::default();
        store.schools.push(SchoolRecord {
            settings: None,
            ..record()
        });

        let err = load_snapshot(&store, 1).unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(_)), "{err}");
    }

    #[test]
    fn missing_classes_or_teachers_is_configuration_error() {
        let mut store = InMemoryStore::default();
        store.schools.push(SchoolRecord {
            class_groups: Vec::new(),
            ..record()
        });
        assert!(matches!(
            load_snapshot(&store, 1),
            Err(ScheduleError::Configuration(_))
        ));

        let mut store = InMemoryStore::default();
        store.schools.push(SchoolRecord {
            teachers: Vec::new(),
            ..record()
        });
        assert!(matches!(
            load_snapshot(&store, 1),
            Err(ScheduleError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_school_is_storage_error() {
        let store = InMemoryStore::default();
        assert!(matches!(
            load_snapshot(&store, 42),
            Err(ScheduleError::Storage(_))
        ));
    }
}
