//! Command output
//!
//! Renders timetables as a weekly text grid per class and formats the
//! generation and substitution reports and cover lists.
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Violations found, a school failed, or the command errored |

use std::fmt::Write as _;

use timetabler_core::{
    GenerationReport, LunchWindows, SchoolSnapshot, SubstituteReport, Substitution, TeacherId,
    Timetable, DAY_NAMES, WEEKDAYS,
};
use timetabler_solver::Violation;

// ============================================================================
// Exit Codes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    pub fn from_failures(count: usize) -> Self {
        if count > 0 {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

// ============================================================================
// Timetable Grid
// ============================================================================

const CELL: usize = 22;

fn cell(text: &str) -> String {
    let mut text: String = text.chars().take(CELL).collect();
    while text.chars().count() < CELL {
        text.push(' ');
    }
    text
}

/// One grid per class, rows are lessons and columns weekdays
pub fn render_timetable(
    snapshot: &SchoolSnapshot,
    timetable: &Timetable,
    lunch: &LunchWindows,
) -> String {
    let mut out = String::new();
    let kind = if timetable.is_primary {
        "primary".to_string()
    } else {
        timetable
            .substitute_for_date
            .map_or_else(|| "substitute".to_string(), |d| format!("substitute {d}"))
    };
    let id = timetable
        .id
        .map_or_else(|| "unsaved".to_string(), |id| id.to_string());
    let _ = writeln!(out, "{} [{id}, {kind}]", timetable.name);

    let periods = snapshot
        .settings
        .as_ref()
        .map(|s| s.lesson_periods())
        .unwrap_or_default();

    let mut classes: Vec<_> = snapshot.class_groups.iter().collect();
    classes.sort_by_key(|c| c.id);

    for class in classes {
        let entries: Vec<_> = timetable.entries_for_class(class.id).collect();
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}", class.name);

        let mut header = cell("");
        for day in DAY_NAMES {
            header.push_str("| ");
            header.push_str(&cell(day));
        }
        let _ = writeln!(out, "{}", header.trim_end());

        for period in &periods {
            let mut row = cell(&format!(
                "{} {}-{}",
                period.index,
                period.start.format("%H:%M"),
                period.end.format("%H:%M")
            ));
            for day in 0..WEEKDAYS {
                let text = entries
                    .iter()
                    .find(|e| e.day_of_week == day && e.lesson_index == period.index)
                    .map(|e| {
                        let subject = snapshot
                            .subject(e.subject_id)
                            .map_or_else(|| e.subject_id.to_string(), |s| s.name.clone());
                        let teacher = snapshot
                            .teacher(e.teacher_id)
                            .map_or_else(|| e.teacher_id.to_string(), |t| t.name.clone());
                        format!("{subject} ({teacher})")
                    })
                    .or_else(|| {
                        lunch
                            .get(&class.id)
                            .and_then(|days| days.get(&day))
                            .filter(|w| w.contains(&period.index))
                            .map(|_| "lunch".to_string())
                    })
                    .unwrap_or_default();
                row.push_str("| ");
                row.push_str(&cell(&text));
            }
            let _ = writeln!(out, "{}", row.trim_end());
        }
    }
    out
}

// ============================================================================
// Reports
// ============================================================================

pub fn render_generation(snapshot: &SchoolSnapshot, report: &GenerationReport) -> String {
    let mut out = render_timetable(snapshot, &report.timetable, &report.lunch_windows);
    if report.is_complete() {
        let _ = writeln!(out, "\nAll lessons placed.");
        return out;
    }

    let _ = writeln!(out, "\nUnplaced lessons ({} hours short):", report.hours_short());
    for lesson in &report.unplaced {
        let class = snapshot
            .class_group(lesson.class_group_id)
            .map_or_else(|| lesson.class_group_id.to_string(), |c| c.name.clone());
        let subject = snapshot
            .subject(lesson.subject_id)
            .map_or_else(|| lesson.subject_id.to_string(), |s| s.name.clone());
        let _ = writeln!(out, "  {class}: {subject} x{}", lesson.hours_short);
    }
    out
}

pub fn render_substitution(
    snapshot: &SchoolSnapshot,
    report: &SubstituteReport,
    lunch: &LunchWindows,
) -> String {
    let mut out = render_timetable(snapshot, &report.timetable, lunch);

    let absent: Vec<_> = report
        .absent_teachers
        .iter()
        .map(|&id| teacher_name(snapshot, id))
        .collect();
    let absent = if absent.is_empty() {
        "none".to_string()
    } else {
        absent.join(", ")
    };
    let _ = writeln!(out, "\nAbsent: {absent}");

    for repair in &report.repairs {
        let _ = writeln!(
            out,
            "  class {}: {} ({} affected)",
            repair.class_group_id, repair.strategy, repair.affected_lessons
        );
    }
    for relocation in &report.relocations {
        let _ = writeln!(
            out,
            "  moved class {} subject {}: {} -> {}",
            relocation.class_group_id, relocation.subject_id, relocation.from, relocation.to
        );
    }
    out
}

fn teacher_name(snapshot: &SchoolSnapshot, id: TeacherId) -> String {
    snapshot
        .teacher(id)
        .map_or_else(|| id.to_string(), |t| t.name.clone())
}

/// One line per covered lesson, then a covered count
pub fn render_substitutions(snapshot: &SchoolSnapshot, substitutions: &[Substitution]) -> String {
    if substitutions.is_empty() {
        return "No lessons to cover.\n".to_string();
    }

    let mut out = String::new();
    for substitution in substitutions {
        let entry = &substitution.entry;
        let class = snapshot
            .class_group(entry.class_group_id)
            .map_or_else(|| entry.class_group_id.to_string(), |c| c.name.clone());
        let subject = snapshot
            .subject(entry.subject_id)
            .map_or_else(|| entry.subject_id.to_string(), |s| s.name.clone());
        let cover = substitution
            .substitute_teacher_id
            .map_or_else(|| "uncovered".to_string(), |id| teacher_name(snapshot, id));
        let _ = writeln!(
            out,
            "{} {} {class}: {subject}, {} -> {cover} ({})",
            substitution.date,
            entry.slot(),
            teacher_name(snapshot, substitution.original_teacher_id),
            substitution.status
        );
    }

    let covered = substitutions.iter().filter(|s| s.is_covered()).count();
    let _ = writeln!(out, "\n{covered} of {} lessons covered.", substitutions.len());
    out
}

pub fn render_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "No violations.\n".to_string();
    }
    let mut out = format!("{} violation(s):\n", violations.len());
    for violation in violations {
        let _ = writeln!(out, "  {:?}: {}", violation.kind, violation.message);
    }
    out
}
