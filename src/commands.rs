use crate::cli::{AllocateArgs, CounterArgs, PolicyArgs};
use chrono::{Datelike, Local, NaiveDate};
use mentor_allocation::config::AppConfig;
use mentor_allocation::error::AppError;
use mentor_allocation::workflows::allocation::export::{
    write_allocations, write_log, write_pool, write_trace,
};
use mentor_allocation::workflows::allocation::{
    AllocationEngine, Policy, PolicyLoadMode, PolicyStore, Table,
};
use mentor_allocation::workflows::counter::{
    load_current_codes, load_prior_roster, load_roster, CounterAssigner, CounterAssignment,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

fn load_policy(args: &PolicyArgs, config: &AppConfig) -> Result<Arc<Policy>, AppError> {
    let path = args
        .policy
        .clone()
        .unwrap_or_else(|| config.policy.path.clone());
    let mode = if args.migrate {
        PolicyLoadMode::Migrate
    } else {
        config.policy.mode
    };
    Ok(PolicyStore::new(path, mode).load()?)
}

fn output_dir(out: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf, AppError> {
    let directory = out.unwrap_or_else(|| config.output.directory.clone());
    fs::create_dir_all(&directory)?;
    Ok(directory)
}

fn create_output(directory: &Path, name: &str) -> Result<BufWriter<File>, AppError> {
    Ok(BufWriter::new(File::create(directory.join(name))?))
}

pub(crate) fn run_allocate(args: AllocateArgs, config: &AppConfig) -> Result<(), AppError> {
    let policy = load_policy(&args.policy, config)?;
    let students = Table::from_path(&args.students)?;
    let pool = Table::from_path(&args.pool)?;

    let engine = AllocationEngine::new(&policy);
    let mut progress = |percent: u8, message: &str| debug!(percent, "{message}");
    let outcome = engine.run_tables(&students, &pool, &mut progress)?;

    let directory = output_dir(args.out, config)?;
    write_allocations(create_output(&directory, "allocations.csv")?, &outcome.allocations)?;
    write_pool(create_output(&directory, "pool.csv")?, &outcome.pool)?;
    write_log(create_output(&directory, "log.csv")?, &outcome.logs)?;
    write_trace(create_output(&directory, "trace.csv")?, &outcome.trace)?;
    serde_json::to_writer_pretty(create_output(&directory, "summary.json")?, &outcome.summary)?;
    info!(directory = %directory.display(), "allocation outputs written");

    let summary = &outcome.summary;
    println!("Allocation batch (policy {})", summary.policy_version);
    println!(
        "- {} student(s): {} allocated | {} no eligible mentor | {} capacity full",
        summary.students, summary.allocated, summary.eligibility_no_match, summary.capacity_full
    );
    println!(
        "- {} mentor(s) with {} seat(s) remaining",
        summary.mentors, summary.remaining_capacity
    );
    println!("- outputs written to {}", directory.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct CounterRowView<'a> {
    row: usize,
    national_id: &'a str,
    gender: u8,
    registration_id: &'a str,
    source: &'static str,
}

impl<'a> From<&'a CounterAssignment> for CounterRowView<'a> {
    fn from(assignment: &'a CounterAssignment) -> Self {
        Self {
            row: assignment.row,
            national_id: assignment.national_id.as_str(),
            gender: assignment.gender.code(),
            registration_id: &assignment.registration_id,
            source: assignment.source.label(),
        }
    }
}

/// Academic years start on 1 Mehr (23 September); the label is the solar
/// year in which that day falls.
fn academic_year_for(date: NaiveDate) -> u16 {
    let starts_new_year = (date.month(), date.day()) >= (9, 23);
    let solar = if starts_new_year {
        date.year() - 621
    } else {
        date.year() - 622
    };
    u16::try_from(solar).unwrap_or_default()
}

pub(crate) fn run_counter(args: CounterArgs, config: &AppConfig) -> Result<(), AppError> {
    let policy = load_policy(&args.policy, config)?;
    let academic_year = args
        .year
        .or(config.academic_year)
        .unwrap_or_else(|| academic_year_for(args.as_of.unwrap_or_else(|| Local::now().date_naive())));

    let roster = load_roster(&Table::from_path(&args.roster)?)?;
    let prior = match &args.prior {
        Some(path) => load_prior_roster(&Table::from_path(path)?)?,
        None => BTreeMap::new(),
    };
    let current = match &args.current {
        Some(path) => load_current_codes(&Table::from_path(path)?)?,
        None => Vec::new(),
    };

    let assigner = CounterAssigner::new(academic_year, *policy.gender_codes())?;
    let batch = assigner.assign(&roster, &prior, &current)?;

    let directory = output_dir(args.out, config)?;
    let mut writer = csv::Writer::from_writer(create_output(&directory, "counters.csv")?);
    for assignment in &batch.assignments {
        writer.serialize(CounterRowView::from(assignment))?;
    }
    writer.flush()?;
    serde_json::to_writer_pretty(
        create_output(&directory, "counter_summary.json")?,
        &batch.summary,
    )?;
    info!(directory = %directory.display(), "counter outputs written");

    println!(
        "Registration ids for academic year {} ({} row(s))",
        academic_year, batch.summary.rows
    );
    for bucket in &batch.summary.genders {
        println!(
            "- {} ({}): {} reused | {} minted | {} repeated | next sequence {}",
            bucket.gender.label(),
            bucket.gender_code,
            bucket.reused,
            bucket.minted,
            bucket.memoized,
            bucket.next_sequence
        );
    }
    Ok(())
}

pub(crate) fn run_policy_check(args: PolicyArgs, config: &AppConfig) -> Result<(), AppError> {
    let policy = load_policy(&args, config)?;

    println!("Policy {} is valid", policy.version());
    println!("- join keys: {}", policy.join_keys().join(", "));
    println!("- ranking: {}", policy.ranking_chain());
    println!("- capacity column: {}", policy.capacity_column());
    println!(
        "- school wildcard: {}",
        if policy.school_wildcard() { "on" } else { "off" }
    );
    for warning in policy.migration_warnings() {
        println!("- migrated: {warning}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn academic_year_turns_over_on_first_of_mehr() {
        let before = NaiveDate::from_ymd_opt(2025, 9, 22).expect("valid date");
        let after = NaiveDate::from_ymd_opt(2025, 9, 23).expect("valid date");
        assert_eq!(academic_year_for(before), 1403);
        assert_eq!(academic_year_for(after), 1404);
        let spring = NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date");
        assert_eq!(academic_year_for(spring), 1404);
    }
}
