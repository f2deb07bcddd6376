//! Timetable service
//!
//! Orchestrates the generators over a store implementing both collaborator
//! traits: load a snapshot, run the pure algorithm, persist the result as
//! one unit. Callers serialize requests for the same school; the
//! delete-then-recreate of substitutes is not atomic across callers.

use chrono::NaiveDate;
use timetabler_core::{
    load_snapshot, GenerationReport, LunchWindows, ScheduleError, SchoolId, SchoolRepository,
    StoreError, SubstituteReport, Substitution, TeacherAbsence, Timetable, TimetableGenerator,
    TimetableId, TimetableStore,
};
use tracing::info;

use crate::validation::{validate_timetable, Violation};
use crate::{compute_lunch_windows, SolverOptions, TimetableEngine};

pub struct TimetableService<S> {
    store: S,
    engine: TimetableEngine,
}

impl<S: SchoolRepository + TimetableStore> TimetableService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, SolverOptions::default())
    }

    pub fn with_options(store: S, options: SolverOptions) -> Self {
        Self {
            store,
            engine: TimetableEngine::with_options(options),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Fetch a timetable and check that it belongs to `school`
    fn owned_timetable(&self, school: SchoolId, id: TimetableId) -> Result<Timetable, ScheduleError> {
        match self.store.timetable(id)? {
            Some(timetable) if timetable.school_id == school => Ok(timetable),
            _ => Err(ScheduleError::Validation(format!(
                "Timetable {id} not found for school {school}"
            ))),
        }
    }

    /// Generate and persist a primary timetable.
    ///
    /// The stored id is set on the returned report's timetable.
    pub fn generate_primary(
        &mut self,
        school: SchoolId,
        name: &str,
        valid_from: Option<NaiveDate>,
        valid_to: Option<NaiveDate>,
    ) -> Result<GenerationReport, ScheduleError> {
        let snapshot = load_snapshot(&self.store, school)?;
        let mut report = self.engine.generate_primary(&snapshot)?;

        report.timetable.name = name.to_string();
        report.timetable.valid_from = valid_from;
        report.timetable.valid_to = valid_to;

        let id = self.store.insert_timetable(report.timetable.clone())?;
        report.timetable.id = Some(id);
        info!(school, timetable = id, "Stored primary timetable");
        Ok(report)
    }

    /// Generate and persist a substitute timetable, replacing any existing
    /// one for the same base and date
    pub fn generate_substitute(
        &mut self,
        school: SchoolId,
        base_id: TimetableId,
        date: NaiveDate,
    ) -> Result<SubstituteReport, ScheduleError> {
        let base = self.owned_timetable(school, base_id)?;
        let snapshot = load_snapshot(&self.store, school)?;
        let mut report = self.engine.generate_substitute(&snapshot, &base, date)?;

        if let Some(existing) = self.store.find_substitute(base_id, date)? {
            self.store.delete_timetable(existing)?;
            info!(timetable = existing, %date, "Replaced existing substitute");
        }

        let id = self.store.insert_timetable(report.timetable.clone())?;
        report.timetable.id = Some(id);
        info!(school, base = base_id, timetable = id, "Stored substitute timetable");
        Ok(report)
    }

    /// Cover proposals for an absence against a stored primary timetable.
    ///
    /// Records are returned, not persisted.
    pub fn substitutions(
        &self,
        school: SchoolId,
        base_id: TimetableId,
        absence: &TeacherAbsence,
    ) -> Result<Vec<Substitution>, ScheduleError> {
        let base = self.owned_timetable(school, base_id)?;
        let snapshot = load_snapshot(&self.store, school)?;
        self.engine.substitutions(&snapshot, &base, absence)
    }

    pub fn validate(&self, school: SchoolId, id: TimetableId) -> Result<Vec<Violation>, ScheduleError> {
        let timetable = self.owned_timetable(school, id)?;
        let snapshot = load_snapshot(&self.store, school)?;
        Ok(validate_timetable(&snapshot, &timetable))
    }

    /// Lunch windows adjusted to a stored timetable's entries
    pub fn lunch_windows(&self, school: SchoolId, id: TimetableId) -> Result<LunchWindows, ScheduleError> {
        let timetable = self.owned_timetable(school, id)?;
        let snapshot = load_snapshot(&self.store, school)?;
        let settings = snapshot.require_settings()?;
        Ok(compute_lunch_windows(
            settings,
            &snapshot.class_groups,
            &timetable.entries,
        ))
    }

    /// Delete a timetable and the substitutes based on it
    pub fn delete(&mut self, school: SchoolId, id: TimetableId) -> Result<(), ScheduleError> {
        self.owned_timetable(school, id)?;
        match self.store.delete_timetable(id) {
            Err(StoreError::TimetableNotFound(_)) => Err(ScheduleError::Validation(format!(
                "Timetable {id} not found for school {school}"
            ))),
            other => other.map_err(Into::into),
        }
    }
}
