use crate::commands::{run_allocate, run_counter, run_policy_check};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use mentor_allocation::config::AppConfig;
use mentor_allocation::error::AppError;
use mentor_allocation::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Mentor Allocator",
    about = "Allocate students to mentors and assign registration ids from CSV rosters",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an allocation batch over a student table and a mentor pool
    Allocate(AllocateArgs),
    /// Assign registration ids to a student roster
    Counter(CounterArgs),
    /// Inspect the allocation policy document
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Validate the policy and print its ranking chain
    Check(PolicyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct PolicyArgs {
    /// Policy document (defaults to APP_POLICY_PATH)
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
    /// Fill missing optional policy sections with defaults instead of failing
    #[arg(long)]
    pub(crate) migrate: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Student CSV, processed in row order
    #[arg(long)]
    pub(crate) students: PathBuf,
    /// Mentor pool CSV with remaining capacity
    #[arg(long)]
    pub(crate) pool: PathBuf,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Output directory (defaults to APP_OUTPUT_DIR)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CounterArgs {
    /// Student roster with national id and gender columns
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Prior-year roster whose ids are reused
    #[arg(long)]
    pub(crate) prior: Option<PathBuf>,
    /// Current-year roster of ids already issued
    #[arg(long)]
    pub(crate) current: Option<PathBuf>,
    /// Academic year (e.g. 1404); defaults to APP_ACADEMIC_YEAR, then --as-of
    #[arg(long)]
    pub(crate) year: Option<u16>,
    /// Date used to derive the academic year when none is configured (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Output directory (defaults to APP_OUTPUT_DIR)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Allocate(args) => run_allocate(args, &config),
        Command::Counter(args) => run_counter(args, &config),
        Command::Policy {
            command: PolicyCommand::Check(args),
        } => run_policy_check(args, &config),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
