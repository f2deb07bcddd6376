//! Shared fixtures for the CLI tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::NaiveTime;
use tempfile::TempDir;
use timetabler_core::{
    Capability, ClassGroup, InMemoryStore, SchoolRecord, SchoolSettings, Subject,
    SubjectAllocation, Teacher, TeacherAbsence,
};

pub const MONDAY: &str = "2025-03-03";

pub fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_timetabler"))
}

/// One class, mathematics taught by teacher 1 with teacher 2 as a possible
/// replacement, art taught by teacher 3. Teacher 1 is absent on Monday.
pub fn school(id: u32) -> SchoolRecord {
    let monday = chrono::NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
    SchoolRecord {
        id,
        name: format!("School {id}"),
        settings: Some(
            SchoolSettings::new(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            )
            .lunch(30, [3]),
        ),
        class_groups: vec![ClassGroup::new(1, 1)
            .name("1A")
            .allocate(SubjectAllocation::new(1, 3).primary_teacher(1))
            .allocate(SubjectAllocation::new(2, 2))],
        subjects: vec![Subject::new(1, "Mathematics"), Subject::new(2, "Art")],
        teachers: vec![
            Teacher::new(1, 20).name("Ada").capable_of(Capability::any_class(1)),
            Teacher::new(2, 20).name("Blaise").capable_of(Capability::any_class(1)),
            Teacher::new(3, 20).name("Carl").capable_of(Capability::any_class(2)),
        ],
        absences: vec![TeacherAbsence::new(1, monday, monday)],
        ..SchoolRecord::default()
    }
}

/// Write `store` to a fresh temporary directory
pub fn store_file(store: &InMemoryStore) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, serde_json::to_string_pretty(store).unwrap()).unwrap();
    (dir, path)
}

pub fn read_store(path: &Path) -> InMemoryStore {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn run(args: &[&str]) -> Output {
    Command::new(binary())
        .args(args)
        .env_remove("TIMETABLER_CONFIG")
        .env_remove("TIMETABLER_SCHOOL")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute timetabler")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}
