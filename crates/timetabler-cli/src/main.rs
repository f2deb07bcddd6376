//! timetabler CLI - School Timetable Generation
//!
//! Command-line interface over a JSON store file: generate primary and
//! substitute timetables, propose cover for absences, inspect lunch
//! windows, validate and delete.

mod config;
mod output;
mod store_file;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use timetabler_core::{
    load_snapshot, SchoolId, TeacherAbsence, TeacherId, TimetableGenerator, TimetableId,
    TimetableStore,
};
use timetabler_solver::primary::DEFAULT_NAME;
use timetabler_solver::{lunch_windows_for, TimetableEngine, TimetableService};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::ExitCode;

#[derive(Parser)]
#[command(name = "timetabler")]
#[command(author, version, about = "School timetable generation and substitution", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Solver configuration file (TOML)
    #[arg(long, global = true, env = "TIMETABLER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store a primary timetable for one school
    Generate {
        /// JSON store file
        store: PathBuf,

        /// School id
        #[arg(long, env = "TIMETABLER_SCHOOL")]
        school: SchoolId,

        /// Timetable name
        #[arg(long, default_value = DEFAULT_NAME)]
        name: String,

        /// First day the timetable applies (YYYY-MM-DD)
        #[arg(long)]
        valid_from: Option<NaiveDate>,

        /// Last day the timetable applies (YYYY-MM-DD)
        #[arg(long)]
        valid_to: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Generate primary timetables for every school in the store
    GenerateAll {
        /// JSON store file
        store: PathBuf,

        /// Timetable name
        #[arg(long, default_value = DEFAULT_NAME)]
        name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Generate a substitute timetable for one date
    Substitute {
        /// JSON store file
        store: PathBuf,

        /// School id
        #[arg(long, env = "TIMETABLER_SCHOOL")]
        school: SchoolId,

        /// Primary timetable to adapt
        #[arg(long)]
        base: TimetableId,

        /// Date of the absences (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Propose a substitute teacher for every lesson of an absence
    Cover {
        /// JSON store file
        store: PathBuf,

        /// School id
        #[arg(long, env = "TIMETABLER_SCHOOL")]
        school: SchoolId,

        /// Primary timetable holding the lessons
        #[arg(long)]
        base: TimetableId,

        /// Absent teacher id
        #[arg(long)]
        teacher: TeacherId,

        /// First day of the absence (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the absence, defaults to the first
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Print the lunch windows of a stored timetable as JSON
    Lunch {
        /// JSON store file
        store: PathBuf,

        /// School id
        #[arg(long, env = "TIMETABLER_SCHOOL")]
        school: SchoolId,

        /// Timetable id
        #[arg(long)]
        timetable: TimetableId,
    },

    /// Check a stored timetable; exits 1 when violations are found
    Validate {
        /// JSON store file
        store: PathBuf,

        /// School id
        #[arg(long, env = "TIMETABLER_SCHOOL")]
        school: SchoolId,

        /// Timetable id
        #[arg(long)]
        timetable: TimetableId,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Delete a timetable and the substitutes based on it
    Delete {
        /// JSON store file
        store: PathBuf,

        /// School id
        #[arg(long, env = "TIMETABLER_SCHOOL")]
        school: SchoolId,

        /// Timetable id
        #[arg(long)]
        timetable: TimetableId,
    },
}

fn main() -> Result<process::ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let code = match cli.command {
        Commands::Generate {
            store,
            school,
            name,
            valid_from,
            valid_to,
            format,
        } => cmd_generate(&store, &config, school, &name, valid_from, valid_to, format)?,
        Commands::GenerateAll {
            store,
            name,
            format,
        } => cmd_generate_all(&store, &config, &name, format)?,
        Commands::Substitute {
            store,
            school,
            base,
            date,
            format,
        } => cmd_substitute(&store, &config, school, base, date, format)?,
        Commands::Cover {
            store,
            school,
            base,
            teacher,
            from,
            to,
            format,
        } => {
            let absence = TeacherAbsence::new(teacher, from, to.unwrap_or(from));
            cmd_cover(&store, &config, school, base, &absence, format)?
        }
        Commands::Lunch {
            store,
            school,
            timetable,
        } => cmd_lunch(&store, school, timetable)?,
        Commands::Validate {
            store,
            school,
            timetable,
            format,
        } => cmd_validate(&store, school, timetable, format)?,
        Commands::Delete {
            store,
            school,
            timetable,
        } => cmd_delete(&store, school, timetable)?,
    };

    Ok(code.into())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_generate(
    path: &Path,
    config: &Config,
    school: SchoolId,
    name: &str,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    format: Format,
) -> Result<ExitCode> {
    let store = store_file::load(path)?;
    let mut service = TimetableService::with_options(store, config.solver.clone());

    let report = service
        .generate_primary(school, name, valid_from, valid_to)
        .with_context(|| format!("Generation failed for school {school}"))?;

    match format {
        Format::Text => {
            let snapshot = load_snapshot(service.store(), school)?;
            print!("{}", output::render_generation(&snapshot, &report));
        }
        Format::Json => print_json(&report)?,
    }

    store_file::save(path, &service.into_store())?;
    Ok(ExitCode::Success)
}

#[derive(Serialize)]
struct SchoolOutcome {
    school_id: SchoolId,
    timetable_id: Option<TimetableId>,
    placed: usize,
    hours_short: u32,
    error: Option<String>,
}

fn cmd_generate_all(path: &Path, config: &Config, name: &str, format: Format) -> Result<ExitCode> {
    let mut store = store_file::load(path)?;
    let engine = TimetableEngine::with_options(config.solver.clone());

    let mut outcomes = Vec::new();
    let mut snapshots = Vec::new();
    for school in store.schools.iter().map(|s| s.id) {
        match load_snapshot(&store, school) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(err) => {
                warn!(school, error = %err, "Skipping school");
                outcomes.push(SchoolOutcome {
                    school_id: school,
                    timetable_id: None,
                    placed: 0,
                    hours_short: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    // Schools share nothing, so each one is generated on its own thread
    let results: Vec<_> = snapshots
        .par_iter()
        .map(|snapshot| (snapshot.school_id, engine.generate_primary(snapshot)))
        .collect();

    for (school, result) in results {
        match result {
            Ok(mut report) => {
                report.timetable.name = name.to_string();
                let id = store.insert_timetable(report.timetable.clone())?;
                info!(school, timetable = id, "Stored primary timetable");
                outcomes.push(SchoolOutcome {
                    school_id: school,
                    timetable_id: Some(id),
                    placed: report.timetable.entries.len(),
                    hours_short: report.hours_short(),
                    error: None,
                });
            }
            Err(err) => {
                warn!(school, error = %err, "Generation failed");
                outcomes.push(SchoolOutcome {
                    school_id: school,
                    timetable_id: None,
                    placed: 0,
                    hours_short: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    outcomes.sort_by_key(|o| o.school_id);
    store_file::save(path, &store)?;

    match format {
        Format::Text => {
            for outcome in &outcomes {
                match (&outcome.error, outcome.timetable_id) {
                    (Some(err), _) => println!("school {}: failed: {err}", outcome.school_id),
                    (None, Some(id)) => println!(
                        "school {}: timetable {id}, {} lessons placed, {} hours short",
                        outcome.school_id, outcome.placed, outcome.hours_short
                    ),
                    (None, None) => {}
                }
            }
        }
        Format::Json => print_json(&outcomes)?,
    }

    let failures = outcomes.iter().filter(|o| o.error.is_some()).count();
    Ok(ExitCode::from_failures(failures))
}

fn cmd_substitute(
    path: &Path,
    config: &Config,
    school: SchoolId,
    base: TimetableId,
    date: NaiveDate,
    format: Format,
) -> Result<ExitCode> {
    let store = store_file::load(path)?;
    let mut service = TimetableService::with_options(store, config.solver.clone());

    let report = service
        .generate_substitute(school, base, date)
        .with_context(|| format!("Substitution failed for timetable {base} on {date}"))?;

    match format {
        Format::Text => {
            let snapshot = load_snapshot(service.store(), school)?;
            let settings = snapshot.require_settings()?;
            let lunch = lunch_windows_for(settings, &snapshot.class_groups, &report.timetable);
            print!("{}", output::render_substitution(&snapshot, &report, &lunch));
        }
        Format::Json => print_json(&report)?,
    }

    store_file::save(path, &service.into_store())?;
    Ok(ExitCode::Success)
}

fn cmd_cover(
    path: &Path,
    config: &Config,
    school: SchoolId,
    base: TimetableId,
    absence: &TeacherAbsence,
    format: Format,
) -> Result<ExitCode> {
    let service = TimetableService::with_options(store_file::load(path)?, config.solver.clone());
    let substitutions = service
        .substitutions(school, base, absence)
        .with_context(|| format!("Cover failed for teacher {}", absence.teacher_id))?;

    match format {
        Format::Text => {
            let snapshot = load_snapshot(service.store(), school)?;
            print!("{}", output::render_substitutions(&snapshot, &substitutions));
        }
        Format::Json => print_json(&substitutions)?,
    }
    Ok(ExitCode::Success)
}

fn cmd_lunch(path: &Path, school: SchoolId, timetable: TimetableId) -> Result<ExitCode> {
    let service = TimetableService::new(store_file::load(path)?);
    let windows = service.lunch_windows(school, timetable)?;
    print_json(&windows)?;
    Ok(ExitCode::Success)
}

fn cmd_validate(
    path: &Path,
    school: SchoolId,
    timetable: TimetableId,
    format: Format,
) -> Result<ExitCode> {
    let service = TimetableService::new(store_file::load(path)?);
    let violations = service.validate(school, timetable)?;

    match format {
        Format::Text => print!("{}", output::render_violations(&violations)),
        Format::Json => print_json(&violations)?,
    }
    Ok(ExitCode::from_failures(violations.len()))
}

fn cmd_delete(path: &Path, school: SchoolId, timetable: TimetableId) -> Result<ExitCode> {
    let mut service = TimetableService::new(store_file::load(path)?);
    service.delete(school, timetable)?;
    store_file::save(path, &service.into_store())?;
    println!("Deleted timetable {timetable}");
    Ok(ExitCode::Success)
}
