//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use cellguard_core::batch::{BatchConfig, BatchResult, ProgressReporter, StudentOutcome};
use cellguard_core::pipeline::{CompileFileConfig, ReconcileFilesConfig};
use cellguard_core::{BlockTransform, Reconciler};
use cellguard_shared::{
    AppConfig, DuplicatePolicy, ReconcileConfig, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// cellguard — keep notebook test cells authoritative.
#[derive(Parser)]
#[command(
    name = "cellguard",
    version,
    about = "Restore notebook test cells from a reference and compile tagged cases into scripts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.cellguard/cellguard.toml.
    #[arg(long, global = true, env = "CELLGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Restore a student's test cells from the reference notebook.
    Reconcile {
        /// The student's working notebook.
        student: PathBuf,

        /// The reference (release) notebook.
        reference: PathBuf,

        /// Where to write the restored notebook (defaults to overwriting the student's).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Test cell marker (overrides config).
        #[arg(long)]
        prefix: Option<String>,

        /// Fail if a notebook repeats a test ID.
        #[arg(long)]
        reject_duplicates: bool,
    },

    /// Restore test cells in many student notebooks against one reference.
    Batch {
        /// The reference (release) notebook.
        reference: PathBuf,

        /// Student notebooks to restore.
        #[arg(required = true)]
        students: Vec<PathBuf>,

        /// Directory for restored notebooks (defaults to overwriting each in place).
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Test cell marker (overrides config).
        #[arg(long)]
        prefix: Option<String>,

        /// Fail a notebook if it repeats a test ID.
        #[arg(long)]
        reject_duplicates: bool,
    },

    /// Compile tagged case cells into a single script.
    Compile {
        /// Notebook to extract case cells from.
        notebook: PathBuf,

        /// Case marker (overrides config).
        #[arg(long)]
        prefix: Option<String>,

        /// Case to include, in order (repeatable). Defaults to all cases.
        #[arg(long = "case")]
        cases: Vec<String>,

        /// Block transform: identity, line-terminated, or indent (overrides config).
        #[arg(short, long)]
        transform: Option<String>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List case IDs found in a notebook.
    Cases {
        /// Notebook to scan.
        notebook: PathBuf,

        /// Case marker (overrides config).
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so compiled output on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "cellguard=warn",
        1 => "cellguard=info",
        2 => "cellguard=debug",
        _ => "cellguard=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Reconcile {
            student,
            reference,
            out,
            prefix,
            reject_duplicates,
        } => {
            let reconciler = build_reconciler(&config, prefix.as_deref(), reject_duplicates);
            cmd_reconcile(student, reference, out, reconciler)
        }
        Command::Batch {
            reference,
            students,
            out_dir,
            prefix,
            reject_duplicates,
        } => {
            let reconciler = build_reconciler(&config, prefix.as_deref(), reject_duplicates);
            cmd_batch(reference, students, out_dir, reconciler)
        }
        Command::Compile {
            notebook,
            prefix,
            cases,
            transform,
            out,
        } => {
            let prefix = prefix.unwrap_or_else(|| config.compile.prefix.clone());
            let transform: BlockTransform = transform
                .as_deref()
                .unwrap_or(config.compile.transform.as_str())
                .parse()?;
            cmd_compile(notebook, prefix, cases, transform, out)
        }
        Command::Cases { notebook, prefix } => {
            let prefix = prefix.unwrap_or_else(|| config.compile.prefix.clone());
            cmd_cases(&notebook, &prefix)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Merge `[reconcile]` config with command-line overrides.
fn build_reconciler(
    config: &AppConfig,
    prefix: Option<&str>,
    reject_duplicates: bool,
) -> Reconciler {
    let mut merged: ReconcileConfig = config.reconcile.clone();
    if let Some(prefix) = prefix {
        merged.prefix = prefix.to_string();
    }
    if reject_duplicates {
        merged.duplicates = DuplicatePolicy::Reject;
    }
    Reconciler::from(&merged)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_reconcile(
    student: PathBuf,
    reference: PathBuf,
    out: Option<PathBuf>,
    reconciler: Reconciler,
) -> Result<()> {
    let output = out.unwrap_or_else(|| student.clone());

    info!(
        student = %student.display(),
        reference = %reference.display(),
        output = %output.display(),
        "restoring test cells"
    );

    let result = cellguard_core::pipeline::reconcile_files(&ReconcileFilesConfig {
        student,
        reference,
        output,
        reconciler,
    })?;

    let report = &result.report;
    println!();
    println!("  Test cells restored.");
    println!("  Restored:     {}", report.restored.len());
    println!("  Unchanged:    {}", report.unchanged.len());
    if !report.student_only.is_empty() {
        println!("  Student-only: {}", report.student_only.join(", "));
    }
    println!("  Output:       {}", result.output.display());
    println!("  Time:         {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_batch(
    reference: PathBuf,
    students: Vec<PathBuf>,
    out_dir: Option<PathBuf>,
    reconciler: Reconciler,
) -> Result<()> {
    info!(
        reference = %reference.display(),
        students = students.len(),
        "restoring test cells in batch"
    );

    let reporter = CliProgress::new(students.len() as u64)?;
    let result = cellguard_core::batch::reconcile_batch(
        &BatchConfig {
            reference,
            students,
            out_dir,
            reconciler,
        },
        &reporter,
    )?;

    println!();
    for outcome in &result.outcomes {
        match &outcome.result {
            Ok((output, report)) => println!(
                "  ok    {} ({} restored) -> {}",
                outcome.student.display(),
                report.restored.len(),
                output.display()
            ),
            Err(e) => println!("  FAIL  {}: {e}", outcome.student.display()),
        }
    }
    println!();
    println!(
        "  {} restored, {} failed in {:.1}s",
        result.succeeded(),
        result.failed(),
        result.elapsed.as_secs_f64()
    );
    println!();

    if result.failed() > 0 {
        return Err(eyre!(
            "{} of {} notebooks could not be restored",
            result.failed(),
            result.outcomes.len()
        ));
    }

    Ok(())
}

fn cmd_compile(
    notebook: PathBuf,
    prefix: String,
    cases: Vec<String>,
    transform: BlockTransform,
    out: Option<PathBuf>,
) -> Result<()> {
    info!(notebook = %notebook.display(), prefix = %prefix, %transform, "compiling test cases");

    let result = cellguard_core::pipeline::compile_file(&CompileFileConfig {
        notebook,
        prefix,
        cases,
        transform,
        output: out,
    })?;

    match &result.output {
        Some(path) => eprintln!(
            "Compiled {} case(s) into {}",
            result.cases.len(),
            path.display()
        ),
        None => print!("{}", result.text),
    }

    Ok(())
}

fn cmd_cases(notebook: &Path, prefix: &str) -> Result<()> {
    let cases = cellguard_core::pipeline::list_cases(notebook, prefix)?;

    if cases.is_empty() {
        println!("No cells tagged with '{prefix}' in {}", notebook.display());
        return Ok(());
    }

    for (case, fragments) in cases {
        println!("{case}\t{fragments}");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Batch progress bar using indicatif.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: u64) -> Result<Self> {
        let bar = ProgressBar::new(total);
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )?);
        Ok(Self { bar })
    }
}

impl ProgressReporter for CliProgress {
    fn student_started(&self, path: &Path, _current: usize, _total: usize) {
        self.bar.set_message(path.display().to_string());
    }

    fn student_finished(&self, _outcome: &StudentOutcome) {
        self.bar.inc(1);
    }

    fn done(&self, _result: &BatchResult) {
        self.bar.finish_and_clear();
    }
}
