// RedRun - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and logging initialisation (debug mode support)
// 3. Rule catalog loading (built-in + user-defined)
// 4. Input expansion, batch analysis and report output

use clap::{Args, Parser, Subcommand, ValueEnum};
use redrun::app::batch::{self, BatchReport};
use redrun::app::rule_mgr::{self, RuleSources};
use redrun::core::analyzer::Analyzer;
use redrun::core::discovery::{self, DiscoveryConfig, InputSource};
use redrun::core::export::{self, SourceReport};
use redrun::core::model::AnalyzeOptions;
use redrun::platform::config::{self, AppConfig, PlatformPaths};
use redrun::ui::console;
use redrun::util::constants;
use redrun::util::error::{ExportError, RedRunError, Result};
use redrun::util::logging;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// RedRun - extract and classify the errors that matter from CI build logs.
///
/// Reads log files, directories, glob patterns or standard input and prints
/// a deduplicated, categorized list of failures with rule-derived confidence.
#[derive(Parser, Debug)]
#[command(name = "redrun", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one or more logs.
    Analyze(AnalyzeArgs),
    /// List the effective rule catalog, or validate a rule file.
    Rules(RulesArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Log files, directories, glob patterns, or `-` for stdin (default: stdin).
    inputs: Vec<String>,

    /// Print the summary without the detailed error listing.
    #[arg(short = 's', long = "summary-only")]
    summary_only: bool,

    /// Rule file or directory of rule files merged over the built-in rules.
    #[arg(short = 'r', long = "rules")]
    rules: Option<PathBuf>,

    /// Use only user-supplied rules.
    #[arg(long = "no-builtin-rules")]
    no_builtin_rules: bool,

    /// Unmatched signals below this confidence are dropped as noise (0-100).
    #[arg(
        short = 'n',
        long = "noise-threshold",
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    noise_threshold: Option<u8>,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RulesArgs {
    /// Rule file or directory of rule files merged over the built-in rules.
    #[arg(short = 'r', long = "rules")]
    rules: Option<PathBuf>,

    /// Use only user-supplied rules.
    #[arg(long = "no-builtin-rules")]
    no_builtin_rules: bool,

    /// Validate a rule file (or directory) and exit.
    #[arg(long = "check", value_name = "FILE")]
    check: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve();
    let (config_path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (paths.config_file.clone(), false),
    };

    let (app_config, warnings) = match config::load_config(&config_path, explicit) {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init(cli.debug, None, None);
            return report_error(&RedRunError::from(e));
        }
    };

    logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "RedRun starting"
    );

    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
        eprintln!("Warning: {warning}");
    }

    let outcome = match cli.command {
        Command::Analyze(args) => run_analyze(&args, &app_config, &paths),
        Command::Rules(args) => run_rules(&args, &app_config, &paths),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => report_error(&e),
    }
}

/// Print a fatal error and map it to an exit status: 2 for rule
/// configuration errors, 1 for everything else.
fn report_error(e: &RedRunError) -> ExitCode {
    tracing::error!(error = %e, "Fatal error");
    eprintln!("Error: {e}");
    match e {
        RedRunError::Rules(_) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}

fn rule_sources(
    rules: Option<&Path>,
    no_builtin_rules: bool,
    app_config: &AppConfig,
    paths: &PlatformPaths,
) -> RuleSources {
    RuleSources {
        builtin: app_config.builtin_rules && !no_builtin_rules,
        auto_dir: Some(paths.user_rules_dir.clone()),
        explicit: rules
            .map(Path::to_path_buf)
            .or_else(|| app_config.rules_path.clone()),
    }
}

// =============================================================================
// analyze
// =============================================================================

fn run_analyze(
    args: &AnalyzeArgs,
    app_config: &AppConfig,
    paths: &PlatformPaths,
) -> Result<ExitCode> {
    let catalog = rule_mgr::load_catalog(&rule_sources(
        args.rules.as_deref(),
        args.no_builtin_rules,
        app_config,
        paths,
    ))?;

    let options = AnalyzeOptions {
        summary_only: args.summary_only,
        noise_threshold: args.noise_threshold.unwrap_or(app_config.noise_threshold),
        max_signal_lines: app_config.max_signal_lines,
        preview_max_chars: app_config.preview_max_chars,
        preview_max_lines: app_config.preview_max_lines,
    };

    let discovery_config = DiscoveryConfig {
        max_depth: app_config.max_depth,
        max_files: app_config.max_files,
        include_patterns: app_config.include_patterns.clone(),
        exclude_patterns: app_config.exclude_patterns.clone(),
        ..DiscoveryConfig::default()
    };

    let expansion = discovery::expand_inputs(&args.inputs, &discovery_config)?;
    for warning in &expansion.warnings {
        eprintln!("Warning: {warning}");
    }

    let analyzer = Analyzer::new(catalog, options);
    let batch = batch::run_batch(expansion.sources, &analyzer);

    for report in &batch.reports {
        if let Err(e) = &report.outcome {
            eprintln!("Error: {}: {e}", report.name());
        }
    }

    let output_label = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("<stdout>"));
    let io_err = |e| ExportError::Io {
        path: output_label.clone(),
        source: e,
    };

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path).map_err(io_err)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);

    match args.format {
        OutputFormat::Text => {
            render_text(&mut out, &batch, args.summary_only).map_err(io_err)?;
        }
        OutputFormat::Json | OutputFormat::Csv => {
            let named: Vec<_> = batch.successes().collect();
            let reports: Vec<SourceReport<'_>> = named
                .iter()
                .map(|(name, result)| SourceReport {
                    source: name.as_str(),
                    result: *result,
                })
                .collect();
            if args.format == OutputFormat::Json {
                export::export_json(&reports, &mut out, &output_label)?;
            } else {
                export::export_csv(&reports, &mut out, &output_label)?;
            }
        }
    }
    out.flush().map_err(io_err)?;

    let failures = batch.failures();
    if failures > 0 {
        tracing::warn!(failures, "Some inputs could not be analyzed");
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn render_text<W: Write>(out: &mut W, batch: &BatchReport, summary_only: bool) -> io::Result<()> {
    console::render_banner(out)?;
    for report in &batch.reports {
        let Ok(result) = &report.outcome else {
            continue;
        };
        let file = match &report.source {
            InputSource::File(f) => Some(f),
            InputSource::Stdin => None,
        };
        writeln!(out)?;
        console::render_source(out, &report.name(), file)?;
        console::render_result(out, result, summary_only)?;
    }
    Ok(())
}

// =============================================================================
// rules
// =============================================================================

fn run_rules(
    args: &RulesArgs,
    app_config: &AppConfig,
    paths: &PlatformPaths,
) -> Result<ExitCode> {
    let stdout_err = |e| ExportError::Io {
        path: PathBuf::from("<stdout>"),
        source: e,
    };
    let mut out = io::stdout().lock();

    if let Some(path) = &args.check {
        let rules = rule_mgr::check_rules(path)?;
        writeln!(out, "{}: {} rule(s) OK", path.display(), rules.len()).map_err(stdout_err)?;
        for rule in &rules {
            writeln!(
                out,
                "  {:<32} {:<24} priority {:>4}, confidence {:>3}",
                rule.id,
                rule.category.label(),
                rule.priority,
                rule.base_confidence
            )
            .map_err(stdout_err)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let catalog = rule_mgr::load_catalog(&rule_sources(
        args.rules.as_deref(),
        args.no_builtin_rules,
        app_config,
        paths,
    ))?;
    console::render_rules(&mut out, &catalog).map_err(stdout_err)?;
    Ok(ExitCode::SUCCESS)
}
