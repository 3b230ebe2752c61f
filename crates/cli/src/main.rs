// collate - merge two delimited files with safe defaults and an audit trail
// `collate merge` is flag-driven; `collate run` takes a TOML job config.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use collate_cli::exit_codes::{merge_exit_code, EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS};
use collate_cli::report;

use collate_engine::audit::provenance_rows;
use collate_engine::config::{DedupeConfig, JobConfig, MergeConfig, OutputConfig, SideConfig};
use collate_engine::dedupe::KeepPolicy;
use collate_engine::merge::{Cardinality, JoinType, Provenance};
use collate_engine::resolve::{ConflictRule, ConflictStrategy};
use collate_engine::MergeError;

#[derive(Parser)]
#[command(name = "collate")]
#[command(about = "Merge two delimited files with safe defaults and an audit report")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two CSVs from command-line flags
    #[command(after_help = "\
Examples:
  collate merge --left customers.csv --right orders.csv --on customer_id -o merged.csv
  collate merge --left a.csv --right b.csv --on id --how outer --report audit.txt
  collate merge --left a.csv --right b.csv --on id --dedupe-left id --dedupe-right id
  collate merge --left a.csv --right b.csv --on id --validate one_to_one --coalesce city
  collate merge --left a.csv --right b.csv --on id --conflict email=prefer_right --json")]
    Merge(MergeArgs),

    /// Run a merge job described by a TOML config file
    #[command(after_help = "\
Examples:
  collate run job.toml
  collate run job.toml --json
  collate run job.toml -o merged.csv --report audit.txt")]
    Run {
        /// Path to the job config
        config: PathBuf,

        /// Print the audit summary as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Override the config's output file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Override the config's report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Suppress warnings and info diagnostics
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a job config without running it
    #[command(after_help = "\
Examples:
  collate validate job.toml")]
    Validate {
        /// Path to the job config
        config: PathBuf,
    },
}

#[derive(Args)]
struct MergeArgs {
    /// Path to the left CSV
    #[arg(long)]
    left: PathBuf,

    /// Path to the right CSV
    #[arg(long)]
    right: PathBuf,

    /// Join key(s); repeatable
    #[arg(long = "on", required = true, value_name = "KEY")]
    on: Vec<String>,

    /// Join type: inner, left, right, or outer
    #[arg(long, default_value = "left")]
    how: String,

    /// Where to write the merged CSV
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Optional path for a text audit report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Key(s) to de-duplicate the left side by; repeatable
    #[arg(long = "dedupe-left", value_name = "KEY")]
    dedupe_left: Vec<String>,

    /// Key(s) to de-duplicate the right side by; repeatable
    #[arg(long = "dedupe-right", value_name = "KEY")]
    dedupe_right: Vec<String>,

    /// Which duplicate row to keep: first or last
    #[arg(long, default_value = "last")]
    keep: String,

    /// Cardinality contract, e.g. one_to_one or many_to_one
    #[arg(long)]
    validate: Option<String>,

    /// Overlapping column to coalesce (left wins when non-null); repeatable
    #[arg(long, value_name = "COL")]
    coalesce: Vec<String>,

    /// Conflict rule as column=strategy; repeatable
    #[arg(long, value_name = "COL=STRATEGY")]
    conflict: Vec<String>,

    /// Field delimiter for both inputs (sniffed when omitted)
    #[arg(long)]
    delimiter: Option<char>,

    /// Print the audit summary as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Suppress warnings and info diagnostics
    #[arg(long, short = 'q')]
    quiet: bool,
}

/// Error carrying its exit code back to main.
struct CliError {
    code: u8,
    message: String,
}

fn cli_err(code: u8, message: impl Into<String>) -> CliError {
    CliError {
        code,
        message: message.into(),
    }
}

impl From<MergeError> for CliError {
    fn from(err: MergeError) -> Self {
        CliError {
            code: merge_exit_code(&err),
            message: err.to_string(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge(args) => cmd_merge(args),
        Commands::Run {
            config,
            json,
            output,
            report,
            quiet,
        } => cmd_run(config, json, output, report, quiet),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::from(err.code)
        }
    }
}

// ---------------------------------------------------------------------------
// merge (flag-driven)
// ---------------------------------------------------------------------------

fn cmd_merge(args: MergeArgs) -> Result<(), CliError> {
    let keep = KeepPolicy::from_str(&args.keep)?;
    let how = JoinType::from_str(&args.how)?;
    let validate = args
        .validate
        .as_deref()
        .map(Cardinality::from_str)
        .transpose()?;

    // Coalesce flags and explicit rules land in one strategy map; an
    // explicit rule wins over a bare --coalesce for the same column.
    let mut conflicts: BTreeMap<String, ConflictStrategy> = args
        .coalesce
        .into_iter()
        .map(|column| (column, ConflictStrategy::Coalesce))
        .collect();
    for raw in &args.conflict {
        let rule = ConflictRule::parse(raw)?;
        conflicts.insert(rule.column, rule.strategy);
    }

    let delimiter = args.delimiter;
    let side = |path: &Path, dedupe_keys: Vec<String>| SideConfig {
        file: path.display().to_string(),
        delimiter,
        rename: HashMap::new(),
        dtypes: BTreeMap::new(),
        parse_dates: Vec::new(),
        dedupe: if dedupe_keys.is_empty() {
            None
        } else {
            Some(DedupeConfig {
                keys: dedupe_keys,
                keep,
            })
        },
    };

    let config = JobConfig {
        name: String::new(),
        left: side(&args.left, args.dedupe_left),
        right: side(&args.right, args.dedupe_right),
        merge: MergeConfig {
            keys: args.on,
            how,
            validate,
            suffixes: ("_left".to_string(), "_right".to_string()),
        },
        conflicts,
        output: OutputConfig {
            file: args.output.map(|p| p.display().to_string()),
            report: args.report.map(|p| p.display().to_string()),
        },
    };
    config.validate()?;

    execute(config, Path::new("."), args.json, args.quiet)
}

// ---------------------------------------------------------------------------
// run + validate (config-driven)
// ---------------------------------------------------------------------------

fn cmd_run(
    config_path: PathBuf,
    json: bool,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| cli_err(EXIT_IO, format!("cannot read config: {e}")))?;
    let mut config = JobConfig::from_toml(&config_str)?;

    if let Some(path) = output {
        config.output.file = Some(path.display().to_string());
    }
    if let Some(path) = report {
        config.output.report = Some(path.display().to_string());
    }

    // Data files resolve relative to the config file's directory.
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    execute(config, &base_dir, json, quiet)
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| cli_err(EXIT_IO, format!("cannot read config: {e}")))?;
    match JobConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: {} merge on {:?} with {} conflict rule(s)",
                config.merge.how,
                config.merge.keys,
                config.conflicts.len(),
            );
            Ok(())
        }
        Err(e) => Err(cli_err(EXIT_CONFIG, e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Shared execution
// ---------------------------------------------------------------------------

fn execute(mut config: JobConfig, base_dir: &Path, json: bool, quiet: bool) -> Result<(), CliError> {
    let left_path = base_dir.join(&config.left.file);
    let right_path = base_dir.join(&config.right.file);

    let left_csv = collate_io::read_file_as_utf8(&left_path)?;
    let right_csv = collate_io::read_file_as_utf8(&right_path)?;

    // Pin sniffed delimiters so the engine and the writer agree.
    if config.left.delimiter.is_none() {
        config.left.delimiter = Some(collate_io::sniff_delimiter(&left_csv) as char);
    }
    if config.right.delimiter.is_none() {
        config.right.delimiter = Some(collate_io::sniff_delimiter(&right_csv) as char);
    }

    let outcome = collate_engine::run(&config, &left_csv, &right_csv)?;

    if !quiet {
        for diagnostic in &outcome.diagnostics {
            eprintln!("{diagnostic}");
        }
    }

    if let Some(ref file) = config.output.file {
        let path = base_dir.join(file);
        let delimiter = config.left.delimiter.map(|c| c as u8).unwrap_or(b',');
        collate_io::write_csv(&outcome.table, &path, delimiter)?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref file) = config.output.report {
        let path = base_dir.join(file);
        let left_only = provenance_rows(&outcome.table, Provenance::LeftOnly)?;
        let right_only = provenance_rows(&outcome.table, Provenance::RightOnly)?;
        let text = report::render_report(
            &outcome.summary,
            &left_only,
            &right_only,
            report::SAMPLE_SIZE,
        );
        std::fs::write(&path, text)
            .map_err(|e| cli_err(EXIT_IO, format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        let payload = serde_json::json!({
            "name": config.name,
            "meta": outcome.meta,
            "summary": outcome.summary,
            "diagnostics": outcome.diagnostics,
        });
        let text = serde_json::to_string_pretty(&payload)
            .map_err(|e| cli_err(EXIT_IO, format!("JSON serialization error: {e}")))?;
        println!("{text}");
    } else {
        println!("=== Merge summary ===");
        println!("{:>12}: {}", "matched", outcome.summary.matched);
        println!("{:>12}: {}", "left_only", outcome.summary.left_only);
        println!("{:>12}: {}", "right_only", outcome.summary.right_only);
        println!("{:>12}: {}", "total_rows", outcome.summary.total_rows);
    }

    Ok(())
}
