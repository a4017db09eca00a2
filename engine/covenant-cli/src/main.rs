use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use covenant::collection::{self, SortCriterion};
use covenant::{calendar, json, registry, CovenantError, Duration, DurationUnit};
use covenant::{RuntimeConfig, Value};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "covenant", version, about = "Covenant value runtime CLI")]
struct Cli {
    /// Log runtime decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two JSON-encoded values and print -1, 0 or 1
    Compare {
        #[arg(allow_hyphen_values = true)]
        left: String,
        #[arg(allow_hyphen_values = true)]
        right: String,
    },
    /// Drop repeated elements of a collection, keeping first occurrences
    Distinct {
        /// Input file holding a collection
        file: PathBuf,
    },
    /// Stable sort of a collection of records
    Sort {
        /// Input file holding a collection
        file: PathBuf,
        /// Sort key as FIELD or FIELD:asc / FIELD:desc, highest priority first
        #[arg(long = "by")]
        by: Vec<String>,
    },
    /// Group records by key fields
    GroupBy {
        /// Input file holding a collection of records
        file: PathBuf,
        /// Field that receives each group's members
        #[arg(long)]
        partition: String,
        /// Key field
        #[arg(long = "key", required = true)]
        keys: Vec<String>,
    },
    /// Cast a branded value against one or more type names
    Cast {
        /// Input file holding the value
        file: PathBuf,
        /// Target type name
        #[arg(long = "type", required = true)]
        types: Vec<String>,
        /// Runtime configuration with the inheritance table
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Convert a duration between units
    Convert {
        #[arg(long, allow_hyphen_values = true)]
        amount: i64,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Duration from the second date to the first
    Diff {
        first: String,
        second: String,
        /// Result unit
        #[arg(long, default_value = "seconds")]
        unit: String,
        /// Runtime configuration with the UTC offset for dates without one
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Covenant(#[from] CovenantError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid sort key '{0}': expected FIELD, FIELD:asc or FIELD:desc")]
    InvalidSortKey(String),
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Compare { left, right } => cmd_compare(&left, &right),
        Commands::Distinct { file } => cmd_distinct(&file),
        Commands::Sort { file, by } => cmd_sort(&file, &by),
        Commands::GroupBy {
            file,
            partition,
            keys,
        } => cmd_group_by(&file, &partition, &keys),
        Commands::Cast {
            file,
            types,
            config,
        } => cmd_cast(&file, &types, config.as_deref()),
        Commands::Convert { amount, from, to } => cmd_convert(amount, &from, &to),
        Commands::Diff {
            first,
            second,
            unit,
            config,
        } => cmd_diff(&first, &second, &unit, config.as_deref()),
    }
}

fn cmd_compare(left: &str, right: &str) -> Result<(), CliError> {
    let left = json::parse_str(left)?;
    let right = json::parse_str(right)?;
    let order = covenant::compare(&left, &right) as i8;
    write_line(&order.to_string())
}

fn cmd_distinct(path: &Path) -> Result<(), CliError> {
    let items = read_value(path)?;
    write_value(&collection::distinct(&items)?)
}

fn cmd_sort(path: &Path, by: &[String]) -> Result<(), CliError> {
    let criteria = by
        .iter()
        .map(|key| parse_criterion(key))
        .collect::<Result<Vec<_>, _>>()?;
    let items = read_value(path)?;
    write_value(&collection::sort(&items, &criteria)?)
}

fn parse_criterion(key: &str) -> Result<SortCriterion, CliError> {
    let (field, direction) = key.split_once(':').unwrap_or((key, "asc"));
    if field.is_empty() {
        return Err(CliError::InvalidSortKey(key.to_string()));
    }
    match direction {
        "asc" => Ok(SortCriterion::ascending(field)),
        "desc" => Ok(SortCriterion::descending(field)),
        _ => Err(CliError::InvalidSortKey(key.to_string())),
    }
}

fn cmd_group_by(path: &Path, partition: &str, keys: &[String]) -> Result<(), CliError> {
    let items = read_value(path)?;
    write_value(&collection::group_by(partition, keys, &items)?)
}

fn load_config(config: Option<&Path>) -> Result<RuntimeConfig, CliError> {
    Ok(match config {
        Some(config) => RuntimeConfig::from_path(config)?,
        None => RuntimeConfig::default(),
    })
}

fn cmd_cast(path: &Path, types: &[String], config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    tracing::debug!(edges = config.inheritance.len(), "loaded runtime config");
    config.install()?;
    let value = read_value(path)?;
    write_value(&registry::cast(types, &value))
}

fn cmd_convert(amount: i64, from: &str, to: &str) -> Result<(), CliError> {
    let from: DurationUnit = from.parse()?;
    let to: DurationUnit = to.parse()?;
    write_line(&Duration::new(amount, from).convert(to).to_string())
}

fn cmd_diff(first: &str, second: &str, unit: &str, config: Option<&Path>) -> Result<(), CliError> {
    let calendar = load_config(config)?.calendar()?;
    tracing::debug!(offset = %calendar.offset(), "parsing dates");
    let first = calendar.parse(first)?;
    let second = calendar.parse(second)?;
    let unit: DurationUnit = unit.parse()?;
    write_line(&calendar::diff_in(&first, &second, unit).to_string())
}

fn read_value(path: &Path) -> Result<Value, CliError> {
    let contents = fs::read_to_string(path)?;
    Ok(json::parse_str(&contents)?)
}

fn write_value(value: &Value) -> Result<(), CliError> {
    write_line(&json::to_string_pretty(value)?)
}

fn write_line(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}
