//! Portfolio Admin CLI - command-line access to the portfolio backend
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to store and admin operations
//! - Handles external concerns like snapshot files, process exit codes and terminal output
//! - Provides clean separation between user interface and business logic

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use portfolio_admin::config::DEFAULT_CONFIG_FILES;
use portfolio_admin::{
    ChangeListQuery, EntityId, EntityKind, FormData, OutputFormat, PortfolioAdmin, PortfolioConfig,
    ReportFormatter, ReportOptions,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Portfolio Admin - manage portfolio records under shared constraints
#[derive(Parser)]
#[command(name = "portfolio-admin")]
#[command(version)]
#[command(about = "Portfolio content backend with admin forms and constraint audits")]
#[command(
    long_about = "Portfolio Admin stores tags, categories, certificates, blogs, notes and projects in a JSON snapshot. Every write, whether a direct save or an admin form submission, is checked against the configured relationship limits."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file (defaults to the configured storage path)
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit every stored record against the constraint table
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Only report findings for this kind
        #[arg(short, long)]
        kind: Option<EntityKind>,

        /// Maximum number of findings to report
        #[arg(long)]
        max_findings: Option<usize>,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// List the configured constraint table
    Constraints,

    /// Submit an admin form and store the record when it is valid
    Submit {
        /// Record kind
        kind: EntityKind,

        /// Edit this existing record instead of adding one
        #[arg(long)]
        id: Option<EntityId>,

        /// Form values as name=value; repeat a name to select several records
        #[arg(short, long = "field", value_parser = parse_key_val, action = clap::ArgAction::Append)]
        fields: Vec<(String, String)>,

        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormatArg,
    },

    /// Show the change list of one kind
    List {
        /// Record kind
        kind: EntityKind,

        /// Case-insensitive search over the kind's search fields
        #[arg(long)]
        search: Option<String>,

        /// Filters as field=value
        #[arg(long = "filter", value_parser = parse_key_val, action = clap::ArgAction::Append)]
        filters: Vec<(String, String)>,

        /// Page number
        #[arg(long, default_value = "1")]
        page: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormatArg,
    },

    /// Delete a record, cascading to dependents
    Delete {
        /// Record kind
        kind: EntityKind,

        /// Record identifier
        id: EntityId,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Parse a `name=value` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    #[cfg(feature = "colors")]
    {
        if cli.no_color {
            colored::control::set_override(false);
        }
    }

    match run_command(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    let use_colors = !cli.no_color;
    match cli.command {
        Commands::Check { format, kind, max_findings } => {
            let options = ReportOptions { use_colors, max_findings, kind };
            run_check(cli.config, cli.snapshot, format, options).await
        }
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
        Commands::Constraints => run_list_constraints(cli.config),
        Commands::Submit { kind, id, fields, format } => {
            let data: FormData = fields.into_iter().collect();
            run_submit(cli.config, cli.snapshot, kind, id, &data, format, use_colors).await
        }
        Commands::List { kind, search, filters, page, format } => {
            let query = ChangeListQuery { search, filters, page };
            run_list(cli.config, cli.snapshot, kind, &query, format, use_colors).await
        }
        Commands::Delete { kind, id } => {
            run_delete(cli.config, cli.snapshot, kind, id, use_colors).await
        }
    }
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<PortfolioConfig> {
    let config = match config_path {
        Some(path) => PortfolioConfig::load_from_file(path)?,
        None => PortfolioConfig::discover()?,
    };
    Ok(config)
}

async fn open(
    config_path: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    use_colors: bool,
) -> anyhow::Result<PortfolioAdmin> {
    let config = load_config(config_path.as_deref())?;
    let admin = PortfolioAdmin::open_snapshot(config, snapshot)
        .await
        .context("Failed to open portfolio snapshot")?;
    let options = ReportOptions { use_colors, ..Default::default() };
    Ok(admin.with_report_formatter(ReportFormatter::new(options)))
}

async fn run_check(
    config_path: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    format: OutputFormatArg,
    options: ReportOptions,
) -> anyhow::Result<i32> {
    let admin = open(config_path, snapshot, options.use_colors).await?;
    let admin = admin.with_report_formatter(ReportFormatter::new(options));

    let report = admin.check();
    let formatted = admin.format_report(&report, format.into())?;
    println!("{formatted}");

    Ok(if report.has_violations() { 1 } else { 0 })
}

fn run_validate_config(config_path: Option<PathBuf>) -> anyhow::Result<i32> {
    let config_path = config_path
        .or_else(|| DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).find(|p| p.exists()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));

    println!("Validating configuration: {}", config_path.display());

    match PortfolioConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");

            println!("📊 Configuration summary:");
            println!("  Constraints: {}", config.constraint_count());
            println!("  Snapshot: {}", config.storage.snapshot.display());
            println!("  Fingerprint: {}", config.fingerprint());

            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

fn run_list_constraints(config_path: Option<PathBuf>) -> anyhow::Result<i32> {
    let config = load_config(config_path.as_deref())?;

    println!("📋 Constraint table\n");

    for kind in EntityKind::ALL {
        let specs = config.constraints_for(kind);
        if specs.is_empty() {
            continue;
        }
        println!("📂 {}", kind.plural());
        for spec in specs {
            let target = kind.binding_target(&spec.binding_name).map(EntityKind::plural).unwrap_or("?");
            println!("  🔗 {} ({}) at most {}", spec.binding_name, target, spec.max_count);
        }
        println!();
    }

    if config.constraint_count() == 0 {
        println!("No constraints configured");
    }

    Ok(0)
}

async fn run_submit(
    config_path: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    kind: EntityKind,
    id: Option<EntityId>,
    data: &FormData,
    format: OutputFormatArg,
    use_colors: bool,
) -> anyhow::Result<i32> {
    let mut admin = open(config_path, snapshot, use_colors).await?;

    let outcome = admin.submit(kind, id, data)?;
    if outcome.is_saved() {
        admin.persist().await.context("Failed to write portfolio snapshot")?;
    }

    print!("{}", admin.formatter().format_form_outcome(kind, &outcome, format.into())?);
    Ok(if outcome.is_saved() { 0 } else { 1 })
}

async fn run_list(
    config_path: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    kind: EntityKind,
    query: &ChangeListQuery,
    format: OutputFormatArg,
    use_colors: bool,
) -> anyhow::Result<i32> {
    let admin = open(config_path, snapshot, use_colors).await?;
    let list = admin.changelist(kind, query)?;
    print!("{}", admin.formatter().format_changelist(&list, format.into())?);
    Ok(0)
}

async fn run_delete(
    config_path: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    kind: EntityKind,
    id: EntityId,
    use_colors: bool,
) -> anyhow::Result<i32> {
    let mut admin = open(config_path, snapshot, use_colors).await?;
    let summary = admin.delete(kind, id)?;
    admin.persist().await.context("Failed to write portfolio snapshot")?;
    print!("{}", admin.formatter().format_deletion(&summary));
    Ok(0)
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
