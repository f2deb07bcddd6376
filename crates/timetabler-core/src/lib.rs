//! # timetabler-core
//!
//! Core domain model and collaborator traits for the timetabler engine.
//!
//! This crate provides:
//! - Domain types: `ClassGroup`, `Subject`, `Teacher`, `Classroom`, `Timetable`
//! - School settings arithmetic (lessons per day, lesson clock times)
//! - The read-only `SchoolSnapshot` and its loader
//! - Collaborator traits: `SchoolRepository`, `TimetableStore`, `TimetableGenerator`
//! - Error types, report types and per-absence substitution records
//!
//! ## Example
//!
//! ```rust
//! use timetabler_core::{ClassGroup, Subject, SubjectAllocation, Teacher, Capability};
//!
//! let math = Subject::new(1, "Mathematics").once_per_day();
//! let class = ClassGroup::new(10, 1)
//!     .name("1.A")
//!     .allocate(SubjectAllocation::new(math.id, 4));
//! let teacher = Teacher::new(100, 20)
//!     .name("Ada")
//!     .capable_of(Capability::any_class(math.id));
//!
//! assert!(teacher.qualifies_for(math.id, &class));
//! assert_eq!(class.weekly_hours(), 4);
//! ```

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod settings;
pub mod snapshot;
pub mod store;

pub use settings::{LessonPeriod, SchoolSettings};
pub use snapshot::{load_snapshot, SchoolSnapshot};
pub use store::{InMemoryStore, SchoolRecord};

// ============================================================================
// Type Aliases
// ============================================================================

pub type SchoolId = u32;
pub type ClassGroupId = u32;
pub type GradeLevelId = u32;
pub type SubjectId = u32;
pub type TeacherId = u32;
pub type ClassroomId = u32;
pub type TimetableId = u32;

/// Lesson slots blocked for lunch: class -> day -> lesson indices
pub type LunchWindows = BTreeMap<ClassGroupId, BTreeMap<u8, Vec<u8>>>;

/// Number of school days in a week (Monday to Friday)
pub const WEEKDAYS: u8 = 5;

/// Availability map keys, indexed by day of week
pub const DAY_NAMES: [&str; WEEKDAYS as usize] =
    ["monday", "tuesday", "wednesday", "thursday", "friday"];

// ============================================================================
// Slot
// ============================================================================

/// A (day of week, lesson index) position in the weekly grid.
///
/// `day` is 0 for Monday through 4 for Friday; `lesson` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub day: u8,
    pub lesson: u8,
}

impl Slot {
    pub const fn new(day: u8, lesson: u8) -> Self {
        Self { day, lesson }
    }

    /// Lowercase English day name used as availability key, `None` for
    /// days outside the school week
    pub fn day_name(&self) -> Option<&'static str> {
        DAY_NAMES.get(usize::from(self.day)).copied()
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.day_name() {
            Some(name) => write!(f, "{name}#{}", self.lesson),
            None => write!(f, "day{}#{}", self.day, self.lesson),
        }
    }
}

/// Day of week for a calendar date (Monday = 0). Weekends yield `None`.
pub fn day_of_week(date: NaiveDate) -> Option<u8> {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => None,
        other => Some(other.num_days_from_monday() as u8),
    }
}

/// Calendar date of the given weekday in the same week as `date`
pub fn date_in_week(date: NaiveDate, day: u8) -> NaiveDate {
    let monday = date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday + chrono::Duration::days(i64::from(day))
}

// ============================================================================
// Subject
// ============================================================================

/// A taught subject and its placement rules
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Unique identifier
    pub id: SubjectId,
    /// Human-readable name
    pub name: String,
    /// May two lessons of this subject follow each other directly?
    pub allow_consecutive_hours: bool,
    /// Longest permitted run of consecutive lessons (reported, not enforced)
    pub max_consecutive_hours: Option<u8>,
    /// May the subject occur more than once per day for a class?
    pub allow_multiple_in_one_day: bool,
    /// Lessons must be placed as a consecutive block of this length
    pub required_block_length: Option<u8>,
    pub is_laboratory: bool,
    pub requires_specialized_classroom: bool,
}

impl Subject {
    /// Create a subject without restrictions
    pub fn new(id: SubjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            allow_consecutive_hours: true,
            max_consecutive_hours: None,
            allow_multiple_in_one_day: true,
            required_block_length: None,
            is_laboratory: false,
            requires_specialized_classroom: false,
        }
    }

    /// Forbid directly adjacent lessons of this subject
    pub fn no_consecutive(mut self) -> Self {
        self.allow_consecutive_hours = false;
        self
    }

    /// Cap the length of consecutive runs
    pub fn max_consecutive(mut self, hours: u8) -> Self {
        self.max_consecutive_hours = Some(hours);
        self
    }

    /// Allow at most one lesson per class and day
    pub fn once_per_day(mut self) -> Self {
        self.allow_multiple_in_one_day = false;
        self
    }

    /// Require lessons to be placed in consecutive blocks
    pub fn block(mut self, length: u8) -> Self {
        self.required_block_length = Some(length);
        self
    }

    /// Mark as laboratory subject
    pub fn laboratory(mut self) -> Self {
        self.is_laboratory = true;
        self
    }

    /// Require a classroom specialized for this subject
    pub fn specialized_room(mut self) -> Self {
        self.requires_specialized_classroom = true;
        self
    }

    /// Does placement need a (preferably specialized) classroom?
    pub fn needs_classroom(&self) -> bool {
        self.is_laboratory || self.requires_specialized_classroom
    }
}

// ============================================================================
// Class Groups and Allocations
// ============================================================================

/// Weekly-hours contract between a class group and a subject
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAllocation {
    pub subject_id: SubjectId,
    /// Lessons per week
    pub weekly_hours: u8,
    /// Teacher bound to this class-subject pair in primary timetables
    pub primary_teacher_id: Option<TeacherId>,
    /// Overrides `Subject::allow_multiple_in_one_day` when set
    pub allow_multiple_in_one_day: Option<bool>,
    /// Block size for this class-subject pair (distinct from the subject's)
    pub required_consecutive_hours: Option<u8>,
}

impl SubjectAllocation {
    pub fn new(subject_id: SubjectId, weekly_hours: u8) -> Self {
        Self {
            subject_id,
            weekly_hours,
            primary_teacher_id: None,
            allow_multiple_in_one_day: None,
            required_consecutive_hours: None,
        }
    }

    /// Bind the class-subject pair to a teacher
    pub fn primary_teacher(mut self, teacher: TeacherId) -> Self {
        self.primary_teacher_id = Some(teacher);
        self
    }

    /// Override the subject's multiple-per-day flag
    pub fn multiple_per_day(mut self, allowed: bool) -> Self {
        self.allow_multiple_in_one_day = Some(allowed);
        self
    }

    /// Require consecutive blocks of `hours` lessons
    pub fn consecutive_block(mut self, hours: u8) -> Self {
        self.required_consecutive_hours = Some(hours);
        self
    }

    /// Effective multiple-per-day flag: allocation override, else subject flag
    pub fn allows_multiple_per_day(&self, subject: &Subject) -> bool {
        self.allow_multiple_in_one_day
            .unwrap_or(subject.allow_multiple_in_one_day)
    }

    /// Effective block length, if one of at least two lessons applies
    pub fn block_length(&self, subject: &Subject) -> Option<u8> {
        self.required_consecutive_hours
            .or(subject.required_block_length)
            .filter(|&n| n >= 2)
    }
}

/// A class of students that receives lessons together
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub id: ClassGroupId,
    pub name: String,
    pub grade_level_id: GradeLevelId,
    pub student_count: Option<u32>,
    pub allocations: Vec<SubjectAllocation>,
}

impl ClassGroup {
    pub fn new(id: ClassGroupId, grade_level_id: GradeLevelId) -> Self {
        Self {
            id,
            name: format!("class-{id}"),
            grade_level_id,
            student_count: None,
            allocations: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn students(mut self, count: u32) -> Self {
        self.student_count = Some(count);
        self
    }

    pub fn allocate(mut self, allocation: SubjectAllocation) -> Self {
        self.allocations.push(allocation);
        self
    }

    pub fn allocation_for(&self, subject: SubjectId) -> Option<&SubjectAllocation> {
        self.allocations.iter().find(|a| a.subject_id == subject)
    }

    /// Total lessons per week across all allocations
    pub fn weekly_hours(&self) -> u32 {
        self.allocations.iter().map(|a| u32::from(a.weekly_hours)).sum()
    }
}

// ============================================================================
// Teachers
// ============================================================================

/// Eligibility to teach a subject, optionally scoped to a grade or class
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub subject_id: SubjectId,
    pub grade_level_id: Option<GradeLevelId>,
    pub class_group_id: Option<ClassGroupId>,
    /// Preferred teacher for this scope when lessons need covering
    #[serde(default)]
    pub is_primary: bool,
}

impl Capability {
    /// Capability valid for every class
    pub fn any_class(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            grade_level_id: None,
            class_group_id: None,
            is_primary: false,
        }
    }

    pub fn for_grade(subject_id: SubjectId, grade: GradeLevelId) -> Self {
        Self {
            subject_id,
            grade_level_id: Some(grade),
            class_group_id: None,
            is_primary: false,
        }
    }

    pub fn for_class(subject_id: SubjectId, class: ClassGroupId) -> Self {
        Self {
            subject_id,
            grade_level_id: None,
            class_group_id: Some(class),
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Matches by explicit class, by grade level, or by carrying no scope at all
    pub fn covers(&self, subject: SubjectId, class: &ClassGroup) -> bool {
        if self.subject_id != subject {
            return false;
        }
        match (self.class_group_id, self.grade_level_id) {
            (Some(c), _) if c == class.id => true,
            (_, Some(g)) if g == class.grade_level_id => true,
            (None, None) => true,
            _ => false,
        }
    }
}

/// A teacher with weekly load cap, availability and capabilities
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub max_weekly_hours: u32,
    /// Day name -> allowed lesson indices. A missing day or an empty list
    /// both mean the teacher is available for the whole day.
    pub availability: BTreeMap<String, Vec<u8>>,
    pub capabilities: Vec<Capability>,
}

impl Teacher {
    pub fn new(id: TeacherId, max_weekly_hours: u32) -> Self {
        Self {
            id,
            name: format!("teacher-{id}"),
            max_weekly_hours,
            availability: BTreeMap::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restrict availability on a day to the given lesson indices
    pub fn available(mut self, day: u8, lessons: impl IntoIterator<Item = u8>) -> Self {
        if let Some(key) = Slot::new(day, 1).day_name() {
            self.availability
                .insert(key.to_string(), lessons.into_iter().collect());
        }
        self
    }

    pub fn capable_of(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Availability check for one slot.
    ///
    /// Note: an explicit empty list is treated like a missing day (available).
    pub fn is_available(&self, slot: Slot) -> bool {
        let Some(day) = slot.day_name() else {
            return false;
        };
        match self.availability.get(day) {
            Some(lessons) if !lessons.is_empty() => lessons.contains(&slot.lesson),
            _ => true,
        }
    }

    /// Does any capability cover this subject for this class?
    pub fn qualifies_for(&self, subject: SubjectId, class: &ClassGroup) -> bool {
        self.capabilities.iter().any(|c| c.covers(subject, class))
    }

    /// Is a covering capability marked primary?
    pub fn is_primary_for(&self, subject: SubjectId, class: &ClassGroup) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.is_primary && c.covers(subject, class))
    }
}

/// A period during which a teacher cannot teach (inclusive range)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherAbsence {
    pub teacher_id: TeacherId,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub reason: Option<String>,
}

impl TeacherAbsence {
    pub fn new(teacher_id: TeacherId, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            teacher_id,
            date_from,
            date_to,
            reason: None,
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.date_from && date <= self.date_to
    }
}

// ============================================================================
// Classrooms
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    pub capacity: Option<u32>,
    /// Subjects this room is equipped for
    pub specializations: Vec<SubjectId>,
    /// Free-form restriction tags (carried, not interpreted)
    pub restrictions: Vec<String>,
}

impl Classroom {
    pub fn new(id: ClassroomId) -> Self {
        Self {
            id,
            name: format!("room-{id}"),
            capacity: None,
            specializations: Vec::new(),
            restrictions: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn capacity(mut self, seats: u32) -> Self {
        self.capacity = Some(seats);
        self
    }

    pub fn specialize(mut self, subject: SubjectId) -> Self {
        self.specializations.push(subject);
        self
    }

    pub fn restrict(mut self, tag: impl Into<String>) -> Self {
        self.restrictions.push(tag.into());
        self
    }

    pub fn specializes_in(&self, subject: SubjectId) -> bool {
        self.specializations.contains(&subject)
    }

    pub fn is_specialized(&self) -> bool {
        !self.specializations.is_empty()
    }

    /// Unknown capacity or unknown class size always fits
    pub fn fits(&self, class: &ClassGroup) -> bool {
        match (self.capacity, class.student_count) {
            (Some(seats), Some(students)) => students <= seats,
            _ => true,
        }
    }
}

// ============================================================================
// Timetable
// ============================================================================

/// One scheduled lesson
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub class_group_id: ClassGroupId,
    pub day_of_week: u8,
    pub lesson_index: u8,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub classroom_id: Option<ClassroomId>,
}

impl TimetableEntry {
    pub fn slot(&self) -> Slot {
        Slot::new(self.day_of_week, self.lesson_index)
    }
}

/// A primary weekly timetable or a one-day substitute override
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    /// Assigned by the store on insert
    pub id: Option<TimetableId>,
    pub school_id: SchoolId,
    pub name: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub is_primary: bool,
    pub substitute_for_date: Option<NaiveDate>,
    pub base_timetable_id: Option<TimetableId>,
    pub entries: Vec<TimetableEntry>,
}

impl Timetable {
    /// Create an empty primary timetable
    pub fn primary(school_id: SchoolId, name: impl Into<String>) -> Self {
        Self {
            id: None,
            school_id,
            name: name.into(),
            valid_from: None,
            valid_to: None,
            is_primary: true,
            substitute_for_date: None,
            base_timetable_id: None,
            entries: Vec::new(),
        }
    }

    /// Create an empty substitute timetable overriding `base` on `date`
    pub fn substitute(school_id: SchoolId, base: TimetableId, date: NaiveDate) -> Self {
        Self {
            id: None,
            school_id,
            name: format!("Substitute for {}", date.format("%Y-%m-%d")),
            valid_from: Some(date),
            valid_to: Some(date),
            is_primary: false,
            substitute_for_date: Some(date),
            base_timetable_id: Some(base),
            entries: Vec::new(),
        }
    }

    pub fn valid_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.valid_from = from;
        self.valid_to = to;
        self
    }

    pub fn entries_on(&self, day: u8) -> impl Iterator<Item = &TimetableEntry> {
        self.entries.iter().filter(move |e| e.day_of_week == day)
    }

    pub fn entries_for_class(&self, class: ClassGroupId) -> impl Iterator<Item = &TimetableEntry> {
        self.entries.iter().filter(move |e| e.class_group_id == class)
    }

    /// Sort entries by (class, day, lesson) for stable output
    pub fn sort_entries(&mut self) {
        self.entries.sort();
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Lessons of an allocation that could not be placed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedLesson {
    pub class_group_id: ClassGroupId,
    pub subject_id: SubjectId,
    pub hours_short: u8,
}

/// Result of primary timetable generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationReport {
    pub timetable: Timetable,
    /// Best-effort shortfall: lessons dropped because no legal slot existed
    pub unplaced: Vec<UnplacedLesson>,
    pub max_lessons_per_day: u8,
    /// Lunch windows that were blocked during placement
    pub lunch_windows: LunchWindows,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn hours_short(&self) -> u32 {
        self.unplaced.iter().map(|u| u32::from(u.hours_short)).sum()
    }
}

/// How a class's lessons on the substitute day were handled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairStrategy {
    /// No lesson taught by an absent teacher
    Unchanged,
    /// Re-placed within the same day, with replacement teachers
    Rearranged,
    /// Lessons of absent teachers moved to other days of the week
    Relocated,
    /// Nothing worked; original entries kept with the absent teacher
    Unresolved,
}

impl std::fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairStrategy::Unchanged => write!(f, "unchanged"),
            RepairStrategy::Rearranged => write!(f, "rearranged"),
            RepairStrategy::Relocated => write!(f, "relocated"),
            RepairStrategy::Unresolved => write!(f, "unresolved"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRepair {
    pub class_group_id: ClassGroupId,
    pub strategy: RepairStrategy,
    /// Lessons of the day taught by absent teachers in the base timetable
    pub affected_lessons: usize,
}

/// A lesson moved away from the substitute day
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub class_group_id: ClassGroupId,
    pub subject_id: SubjectId,
    pub from: Slot,
    pub to: Slot,
    pub teacher_id: TeacherId,
}

/// Result of substitute timetable generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubstituteReport {
    pub timetable: Timetable,
    pub absent_teachers: Vec<TeacherId>,
    pub repairs: Vec<ClassRepair>,
    pub relocations: Vec<Relocation>,
}

impl SubstituteReport {
    pub fn unresolved_classes(&self) -> Vec<ClassGroupId> {
        self.repairs
            .iter()
            .filter(|r| r.strategy == RepairStrategy::Unresolved)
            .map(|r| r.class_group_id)
            .collect()
    }
}

/// Review state of a substitution record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubstitutionStatus {
    #[default]
    AutoGenerated,
    Confirmed,
    ManualOverride,
}

impl std::fmt::Display for SubstitutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubstitutionStatus::AutoGenerated => write!(f, "auto-generated"),
            SubstitutionStatus::Confirmed => write!(f, "confirmed"),
            SubstitutionStatus::ManualOverride => write!(f, "manual override"),
        }
    }
}

/// Cover for one base lesson of an absent teacher on one date
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub date: NaiveDate,
    pub entry: TimetableEntry,
    pub original_teacher_id: TeacherId,
    /// `None` when no qualified, free teacher was found
    pub substitute_teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub status: SubstitutionStatus,
    pub new_classroom_id: Option<ClassroomId>,
}

impl Substitution {
    pub fn is_covered(&self) -> bool {
        self.substitute_teacher_id.is_some()
    }

    pub fn confirm(mut self) -> Self {
        self.status = SubstitutionStatus::Confirmed;
        self
    }

    /// Replace the chosen teacher, optionally moving the lesson to another room
    pub fn override_with(mut self, teacher: TeacherId, classroom: Option<ClassroomId>) -> Self {
        self.substitute_teacher_id = Some(teacher);
        self.new_classroom_id = classroom;
        self.status = SubstitutionStatus::ManualOverride;
        self
    }

    /// Classroom the lesson takes place in after substitution
    pub fn classroom_id(&self) -> Option<ClassroomId> {
        self.new_classroom_id.or(self.entry.classroom_id)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Core timetable generation abstraction
pub trait TimetableGenerator: Send + Sync {
    /// Build a full-week primary timetable for the snapshot's school
    fn generate_primary(&self, snapshot: &SchoolSnapshot) -> Result<GenerationReport, ScheduleError>;

    /// Build a one-day substitute timetable for `date` on top of `base`
    fn generate_substitute(
        &self,
        snapshot: &SchoolSnapshot,
        base: &Timetable,
        date: NaiveDate,
    ) -> Result<SubstituteReport, ScheduleError>;
}

/// Read-only source of school data (the persistence boundary on input)
pub trait SchoolRepository {
    fn settings(&self, school: SchoolId) -> Result<Option<SchoolSettings>, StoreError>;
    fn class_groups(&self, school: SchoolId) -> Result<Vec<ClassGroup>, StoreError>;
    fn subjects(&self, school: SchoolId) -> Result<Vec<Subject>, StoreError>;
    fn teachers(&self, school: SchoolId) -> Result<Vec<Teacher>, StoreError>;
    fn classrooms(&self, school: SchoolId) -> Result<Vec<Classroom>, StoreError>;
    fn absences(&self, school: SchoolId) -> Result<Vec<TeacherAbsence>, StoreError>;
}

/// Persistence sink for generated timetables
pub trait TimetableStore {
    fn timetable(&self, id: TimetableId) -> Result<Option<Timetable>, StoreError>;

    /// Persist a timetable with all its entries as one unit; returns its id
    fn insert_timetable(&mut self, timetable: Timetable) -> Result<TimetableId, StoreError>;

    /// Delete a timetable, its entries, and every substitute based on it
    fn delete_timetable(&mut self, id: TimetableId) -> Result<(), StoreError>;

    /// Existing substitute for (base, date), if any
    fn find_substitute(
        &self,
        base: TimetableId,
        date: NaiveDate,
    ) -> Result<Option<TimetableId>, StoreError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Scheduling error
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Required school data is missing or inconsistent; generation cannot start
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller supplied invalid input (wrong school, non-primary base, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Collaborator (persistence) error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("School not found: {0}")]
    SchoolNotFound(SchoolId),

    #[error("Timetable not found: {0}")]
    TimetableNotFound(TimetableId),

    #[error("Timetable ids exhausted")]
    IdsExhausted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn substitution_review_flow() {
        let auto = Substitution {
            date: date(2025, 3, 3),
            entry: TimetableEntry {
                class_group_id: 1,
                day_of_week: 0,
                lesson_index: 2,
                subject_id: 1,
                teacher_id: 10,
                classroom_id: Some(4),
            },
            original_teacher_id: 10,
            substitute_teacher_id: None,
            status: SubstitutionStatus::AutoGenerated,
            new_classroom_id: None,
        };
        assert!(!auto.is_covered());
        assert_eq!(auto.classroom_id(), Some(4));

        let confirmed = auto.clone().confirm();
        assert_eq!(confirmed.status, SubstitutionStatus::Confirmed);

        let manual = auto.override_with(11, Some(5));
        assert!(manual.is_covered());
        assert_eq!(manual.status, SubstitutionStatus::ManualOverride);
        assert_eq!(manual.classroom_id(), Some(5));

        let json = serde_json::to_value(&manual).unwrap();
        assert_eq!(json["status"], "MANUAL_OVERRIDE");
        assert_eq!(SubstitutionStatus::default().to_string(), "auto-generated");
    }

    #[test]
    fn capability_scopes() {
        let class = ClassGroup::new(7, 2);

        assert!(Capability::any_class(1).covers(1, &class));
        assert!(Capability::for_grade(1, 2).covers(1, &class));
        assert!(Capability::for_class(1, 7).covers(1, &class));

        // Wrong subject, grade or class
        assert!(!Capability::any_class(2).covers(1, &class));
        assert!(!Capability::for_grade(1, 3).covers(1, &class));
        assert!(!Capability::for_class(1, 8).covers(1, &class));
    }

    #[test]
    fn primary_capability_is_scoped() {
        let class = ClassGroup::new(7, 2);
        let teacher = Teacher::new(1, 20)
            .capable_of(Capability::for_grade(1, 2).primary())
            .capable_of(Capability::any_class(2))
            .capable_of(Capability::for_class(3, 8).primary());

        assert!(teacher.is_primary_for(1, &class));
        // Qualified but not primary
        assert!(teacher.qualifies_for(2, &class));
        assert!(!teacher.is_primary_for(2, &class));
        // Primary for another class only
        assert!(!teacher.is_primary_for(3, &class));

        let parsed: Capability = serde_json::from_str(r#"{"subject_id": 4}"#).unwrap();
        assert_eq!(parsed, Capability::any_class(4));
    }

    #[test]
    fn availability_missing_or_empty_day_means_available() {
        let teacher = Teacher::new(1, 20).available(0, [1, 2]).available(1, []);

        assert!(teacher.is_available(Slot::new(0, 2)));
        assert!(!teacher.is_available(Slot::new(0, 3)));
        // Explicit empty list
        assert!(teacher.is_available(Slot::new(1, 6)));
        // No entry at all
        assert!(teacher.is_available(Slot::new(4, 8)));
    }

    #[test]
    fn allocation_effective_flags() {
        let subject = Subject::new(1, "Chemistry").once_per_day().block(2);
        let plain = SubjectAllocation::new(1, 3);
        let overridden = SubjectAllocation::new(1, 3)
            .multiple_per_day(true)
            .consecutive_block(3);

        assert!(!plain.allows_multiple_per_day(&subject));
        assert_eq!(plain.block_length(&subject), Some(2));
        assert!(overridden.allows_multiple_per_day(&subject));
        assert_eq!(overridden.block_length(&subject), Some(3));

        // Single-lesson blocks are no blocks
        let single = SubjectAllocation::new(1, 3).consecutive_block(1);
        assert_eq!(single.block_length(&Subject::new(1, "Art")), None);
    }

    #[test]
    fn classroom_fit() {
        let class = ClassGroup::new(1, 1).students(28);
        assert!(Classroom::new(1).capacity(30).fits(&class));
        assert!(!Classroom::new(2).capacity(20).fits(&class));
        assert!(Classroom::new(3).fits(&class));
        assert!(Classroom::new(4).capacity(10).fits(&ClassGroup::new(2, 1)));
    }

    #[test]
    fn absence_range_is_inclusive() {
        let absence = TeacherAbsence::new(1, date(2025, 3, 3), date(2025, 3, 5));
        assert!(!absence.covers(date(2025, 3, 2)));
        assert!(absence.covers(date(2025, 3, 3)));
        assert!(absence.covers(date(2025, 3, 5)));
        assert!(!absence.covers(date(2025, 3, 6)));
    }

    #[test]
    fn weekday_mapping() {
        // 2025-03-03 is a Monday
        assert_eq!(day_of_week(date(2025, 3, 3)), Some(0));
        assert_eq!(day_of_week(date(2025, 3, 7)), Some(4));
        assert_eq!(day_of_week(date(2025, 3, 8)), None);
        assert_eq!(date_in_week(date(2025, 3, 5), 0), date(2025, 3, 3));
        assert_eq!(date_in_week(date(2025, 3, 5), 4), date(2025, 3, 7));
    }

    #[test]
    fn substitute_timetable_metadata() {
        let tt = Timetable::substitute(1, 9, date(2025, 3, 3));
        assert!(!tt.is_primary);
        assert_eq!(tt.base_timetable_id, Some(9));
        assert_eq!(tt.name, "Substitute for 2025-03-03");
        assert_eq!(tt.valid_from, tt.valid_to);
    }

    #[test]
    fn slot_display() {
        assert_eq!(Slot::new(2, 4).to_string(), "wednesday#4");
        assert_eq!(Slot::new(6, 1).to_string(), "day6#1");
    }

    #[test]
    fn day_names_stop_at_friday() {
        assert_eq!(Slot::new(0, 1).day_name(), Some("monday"));
        assert_eq!(Slot::new(4, 1).day_name(), Some("friday"));
        assert_eq!(Slot::new(5, 1).day_name(), None);

        // A weekend slot is never bookable, even without restrictions
        let teacher = Teacher::new(1, 20).available(5, [1]);
        assert!(teacher.availability.is_empty());
        assert!(teacher.is_available(Slot::new(4, 1)));
        assert!(!teacher.is_available(Slot::new(5, 1)));
    }
}
