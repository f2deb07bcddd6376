//! # timetabler-solver
//!
//! Constraint-driven timetable generation and day-level repair.
//!
//! This crate provides:
//! - Primary generation: a full-week timetable for every class of a school
//! - Substitute generation: a one-day variant that re-homes lessons of absent
//!   teachers (intra-day rearrangement, then cross-day relocation)
//! - Substitution records: one proposed cover teacher per lesson of an
//!   absence's date range
//! - Lunch-window computation for display
//! - A validation pass over finished timetables
//!
//! All algorithms are synchronous pure functions over a `SchoolSnapshot`;
//! loading and persistence happen in `TimetableService` or in the caller.
//!
//! ## Example
//!
//! ```rust,ignore
//! use timetabler_core::{load_snapshot, InMemoryStore};
//! use timetabler_solver::generate_primary_timetable;
//!
//! let store = InMemoryStore::new();
//! let snapshot = load_snapshot(&store, 1)?;
//! let report = generate_primary_timetable(&snapshot)?;
//! println!("{} lessons placed", report.timetable.entries.len());
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timetabler_core::{
    ClassGroup, GenerationReport, LunchWindows, SchoolSettings, SchoolSnapshot, ScheduleError,
    SubstituteReport, Substitution, TeacherAbsence, Timetable, TimetableEntry,
    TimetableGenerator,
};

pub mod allocator;
pub mod constraints;
pub mod index;
pub mod lunch;
pub mod occupancy;
pub mod primary;
pub mod service;
pub mod substitute;
pub mod substitution;
pub mod validation;

pub use lunch::compute_lunch_windows;
pub use service::TimetableService;
pub use validation::{validate_timetable, Violation, ViolationKind};

/// Tuning knobs for the search algorithms
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Candidate evaluations allowed for one primary generation or one
    /// relocation pass
    pub allocator_step_budget: usize,
    /// Backtracking nodes allowed per class during intra-day rearrangement
    pub rearrangement_step_budget: usize,
    /// Base seed for shuffling substitute candidates
    pub shuffle_seed: u64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            allocator_step_budget: 2_000_000,
            rearrangement_step_budget: 200_000,
            shuffle_seed: 0,
        }
    }
}

/// Timetable generator with configurable search budgets
#[derive(Clone, Debug, Default)]
pub struct TimetableEngine {
    pub options: SolverOptions,
}

impl TimetableEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Cover proposals for every base lesson of an absent teacher
    pub fn substitutions(
        &self,
        snapshot: &SchoolSnapshot,
        base: &Timetable,
        absence: &TeacherAbsence,
    ) -> Result<Vec<Substitution>, ScheduleError> {
        substitution::generate(snapshot, base, absence, &self.options)
    }
}

impl TimetableGenerator for TimetableEngine {
    fn generate_primary(&self, snapshot: &SchoolSnapshot) -> Result<GenerationReport, ScheduleError> {
        primary::generate(snapshot, &self.options)
    }

    fn generate_substitute(
        &self,
        snapshot: &SchoolSnapshot,
        base: &Timetable,
        date: NaiveDate,
    ) -> Result<SubstituteReport, ScheduleError> {
        substitute::generate(snapshot, base, date, &self.options)
    }
}

/// Build a full-week primary timetable with default options
pub fn generate_primary_timetable(
    snapshot: &SchoolSnapshot,
) -> Result<GenerationReport, ScheduleError> {
    primary::generate(snapshot, &SolverOptions::default())
}

/// Build a one-day substitute timetable with default options
pub fn generate_substitute_timetable(
    snapshot: &SchoolSnapshot,
    base: &Timetable,
    date: NaiveDate,
) -> Result<SubstituteReport, ScheduleError> {
    substitute::generate(snapshot, base, date, &SolverOptions::default())
}

/// Substitution records for an absence with default options
pub fn generate_substitutions(
    snapshot: &SchoolSnapshot,
    base: &Timetable,
    absence: &TeacherAbsence,
) -> Result<Vec<Substitution>, ScheduleError> {
    substitution::generate(snapshot, base, absence, &SolverOptions::default())
}

/// Lunch windows adjusted to the placed entries of a timetable
pub fn lunch_windows_for(
    settings: &SchoolSettings,
    classes: &[ClassGroup],
    timetable: &Timetable,
) -> LunchWindows {
    compute_lunch_windows(settings, classes, &timetable.entries)
}

/// Lunch windows before any lesson is placed
pub fn planned_lunch_windows(settings: &SchoolSettings, classes: &[ClassGroup]) -> LunchWindows {
    let none: &[TimetableEntry] = &[];
    compute_lunch_windows(settings, classes, none)
}
