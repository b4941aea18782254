use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use colcascade_core::{ArtifactStatus, BatchReport, BatchStatus, Config, Diagnostic, Severity};
use colcascade_engine::{
    cleanup_duplicates, reenumerate_ids, reorder_all, CascadeEngine, MaintenanceSummary, UpstreamGraph,
};
use colcascade_store::{MetadataStore, Workbook};

/// colcascade - Column cascading for staged warehouse metadata
#[derive(Parser)]
#[command(name = "colcascade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: colcascade.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the metadata workbook
    #[arg(short, long, global = true, default_value = "colcascade.json")]
    workbook: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Technical field switches shared by the cascading commands
#[derive(Args)]
struct TechnicalFieldArgs {
    /// Carry and emit technical fields (overrides config)
    #[arg(long, conflicts_with = "no_technical_fields")]
    technical_fields: bool,

    /// Strip all technical and partition fields (overrides config)
    #[arg(long)]
    no_technical_fields: bool,
}

impl TechnicalFieldArgs {
    fn resolve(&self, config: &Config) -> bool {
        if self.technical_fields {
            true
        } else if self.no_technical_fields {
            false
        } else {
            config.include_technical_fields
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Cascade columns into a single artifact
    Cascade {
        /// Artifact id or unique name
        artifact: String,

        #[command(flatten)]
        technical: TechnicalFieldArgs,
    },

    /// Cascade every artifact that has no columns yet
    CascadeAll {
        #[command(flatten)]
        technical: TechnicalFieldArgs,

        /// Output file for report.json
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Rebuild every cascaded column from the seed columns
    Regenerate {
        #[command(flatten)]
        technical: TechnicalFieldArgs,

        /// Output file for report.json
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Remove duplicate column names per artifact
    Cleanup,

    /// Re-apply key hierarchy ordering to every artifact
    Reorder,

    /// Reassign column ids 1..N across the workbook
    Reenumerate,

    /// Show an artifact's columns and downstream artifacts
    Show {
        /// Artifact id or unique name
        artifact: String,
    },

    /// Write a config file with the built-in defaults
    InitConfig {
        /// Where to write the config
        #[arg(short, long, default_value = "colcascade.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Cascade { artifact, technical } => {
            let include = technical.resolve(&config);
            cascade_command(&config, &cli.workbook, &artifact, include)
        }
        Commands::CascadeAll { technical, report } => {
            let include = technical.resolve(&config);
            batch_command(&config, &cli.workbook, include, report.as_deref(), false)
        }
        Commands::Regenerate { technical, report } => {
            let include = technical.resolve(&config);
            batch_command(&config, &cli.workbook, include, report.as_deref(), true)
        }
        Commands::Cleanup => maintenance_command(&cli.workbook, "Duplicate cleanup", cleanup_duplicates::<Workbook>),
        Commands::Reorder => maintenance_command(&cli.workbook, "Hierarchy reorder", reorder_all::<Workbook>),
        Commands::Reenumerate => maintenance_command(&cli.workbook, "Id re-enumeration", reenumerate_ids::<Workbook>),
        Commands::Show { artifact } => show_command(&cli.workbook, &artifact),
        Commands::InitConfig { output, force } => init_config_command(&config, &output, force),
    }
}

/// Log to stderr; `--verbose` raises the default level, `RUST_LOG` overrides both
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else if Path::new("colcascade.toml").exists() {
        Config::from_file(Path::new("colcascade.toml")).context("Failed to load colcascade.toml")?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };
    Ok(config)
}

fn load_workbook(path: &Path) -> Result<Workbook> {
    Workbook::from_file(path).with_context(|| format!("Failed to load workbook {}", path.display()))
}

fn save_workbook(workbook: &mut Workbook) -> Result<()> {
    workbook.save().context("Failed to save workbook")?;
    tracing::debug!(fingerprint = workbook.fingerprint().unwrap_or_default(), "saved workbook");
    Ok(())
}

/// Resolve an artifact by id, or by name when the name is unique
fn find_artifact_id(workbook: &Workbook, key: &str) -> Result<String> {
    let artifacts = workbook.artifacts()?;

    if artifacts.iter().any(|a| a.id == key) {
        return Ok(key.to_string());
    }

    let matches: Vec<_> = artifacts.iter().filter(|a| a.name == key).collect();
    match matches.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => Err(anyhow::anyhow!("Artifact '{}' not found in workbook", key)),
        many => Err(anyhow::anyhow!(
            "Artifact name '{}' is ambiguous ({}). Use the artifact id instead.",
            key,
            many.iter().map(|a| a.id.as_str()).collect::<Vec<_>>().join(", ")
        )),
    }
}

/// Cascade command - derive columns for one artifact
fn cascade_command(config: &Config, workbook_path: &Path, artifact: &str, include_technical_fields: bool) -> Result<()> {
    let mut workbook = load_workbook(workbook_path)?;
    let artifact_id = find_artifact_id(&workbook, artifact)?;

    let engine = CascadeEngine::new(config.clone());
    let outcome = engine.cascade_artifact(&mut workbook, &artifact_id, include_technical_fields)?;

    if outcome.status == ArtifactStatus::Cascaded {
        save_workbook(&mut workbook)?;
    }

    let status = match outcome.status {
        ArtifactStatus::Cascaded => outcome.status.to_string().green().bold(),
        ArtifactStatus::Failed => outcome.status.to_string().red().bold(),
        _ => outcome.status.to_string().yellow(),
    };
    println!("{} {}: {}", "Artifact".bold(), artifact_id, status);
    println!("  Columns added:      {}", outcome.columns_added);
    println!("  Duplicates skipped: {}", outcome.duplicates_skipped);

    if !outcome.diagnostics.is_empty() {
        println!();
        print_diagnostics(&outcome.diagnostics);
    }

    Ok(())
}

/// Batch command - cascade-all or regenerate
fn batch_command(
    config: &Config,
    workbook_path: &Path,
    include_technical_fields: bool,
    report_path: Option<&Path>,
    regenerate: bool,
) -> Result<()> {
    let mut workbook = load_workbook(workbook_path)?;
    let engine = CascadeEngine::new(config.clone());

    let result = if regenerate {
        engine.regenerate_all(&mut workbook, include_technical_fields)
    } else {
        engine.cascade_all_missing(&mut workbook, include_technical_fields)
    };

    let report = match result {
        Ok(report) => report,
        Err(err) if regenerate => {
            // Column table is empty after a failed rebuild
            save_workbook(&mut workbook)?;
            return Err(anyhow::anyhow!("Regeneration failed, column table cleared: {}", err));
        }
        Err(err) => return Err(err.into()),
    };

    save_workbook(&mut workbook)?;

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("{} {}", "Report saved to:".green(), path.display());
    }

    print_report_summary(&report, if regenerate { "Regeneration Report" } else { "Cascade Report" });

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

fn maintenance_command<F>(workbook_path: &Path, title: &str, pass: F) -> Result<()>
where
    F: FnOnce(&mut Workbook) -> Result<MaintenanceSummary, colcascade_store::StoreError>,
{
    let mut workbook = load_workbook(workbook_path)?;
    let summary = pass(&mut workbook)?;

    if summary.rows_changed > 0 {
        save_workbook(&mut workbook)?;
    }

    println!("{}", title.bold().bright_blue());
    if summary.rows_changed == 0 {
        println!("{}", "✓ Nothing to change".green());
    } else {
        println!("  Artifacts touched: {}", summary.artifacts_touched);
        println!("  Rows changed:      {}", summary.rows_changed);
    }

    if !summary.diagnostics.is_empty() {
        println!();
        print_diagnostics(&summary.diagnostics);
    }

    Ok(())
}

/// Show command - columns plus downstream impact
fn show_command(workbook_path: &Path, artifact: &str) -> Result<()> {
    let workbook = load_workbook(workbook_path)?;
    let artifact_id = find_artifact_id(&workbook, artifact)?;
    let artifacts = workbook.artifacts()?;
    let target = workbook
        .artifact(&artifact_id)?
        .ok_or_else(|| anyhow::anyhow!("Artifact '{}' not found in workbook", artifact_id))?;

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{} {} ({})", "Artifact".bold().bright_blue(), target.name.green(), target.id);
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Stage:".bold(), target.stage_id);
    if target.has_upstream() {
        println!("{} {} [{}]", "Upstream:".bold(), target.upstream_artifact, target.upstream_relation);
    }
    println!();

    let columns = workbook.columns(Some(&artifact_id))?;
    if columns.is_empty() {
        println!("{}", "No columns yet".yellow());
    } else {
        println!("{}", "Columns:".bold());
        for column in &columns {
            let data_type = if column.data_type.is_empty() { "-" } else { column.data_type.as_str() };
            println!(
                "  {:>3}. {:<40} {:<18} {:<16} {}",
                column.order,
                column.name,
                data_type,
                column.group.as_str().cyan(),
                column.id
            );
        }
    }
    println!();

    let graph = UpstreamGraph::from_artifacts(&artifacts);
    let downstream = graph.downstream(&artifact_id);
    println!("{} {}", "Downstream artifacts:".bold(), downstream.len());
    for (i, dep) in downstream.iter().enumerate() {
        let label = artifacts
            .iter()
            .find(|a| &a.id == dep)
            .map(|a| format!("{} ({}, {})", dep, a.name, a.stage_id))
            .unwrap_or_else(|| dep.clone());
        println!("  {}. {}", i + 1, label.yellow());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());

    Ok(())
}

/// Init-config command - write the effective configuration
fn init_config_command(config: &Config, output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists. Use --force to overwrite.",
            output.display()
        ));
    }

    config
        .save_to_file(output)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;
    println!("{} {}", "Config written to:".green(), output.display());

    Ok(())
}

fn print_report_summary(report: &BatchReport, title: &str) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", title.bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);

    let status = match report.status {
        BatchStatus::Complete => report.status.to_string().green().bold(),
        BatchStatus::Partial => report.status.to_string().yellow().bold(),
        BatchStatus::Failed => report.status.to_string().red().bold(),
    };
    println!("Status: {}", status);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Cascaded:    {}", summary.cascaded);
    println!("  Skipped:     {}", summary.skipped);
    println!("  No upstream: {}", summary.no_upstream);
    if summary.failed > 0 {
        println!("  Failed:      {}", format!("{}", summary.failed).red().bold());
    } else {
        println!("  Failed:      {}", format!("{}", summary.failed).green());
    }
    if summary.best_effort > 0 {
        println!("  Best-effort: {}", format!("{}", summary.best_effort).yellow());
    }
    println!("  Columns added:      {}", summary.columns_added);
    println!("  Duplicates skipped: {}", summary.duplicates_skipped);
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        print_diagnostics(&report.diagnostics);
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    println!("{}", "Diagnostics:".bold());
    for diag in diagnostics {
        let severity_str = match diag.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warn => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan(),
        };

        println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

        if let Some(artifact) = &diag.artifact_id {
            print!("    artifact {}", artifact);
            if let Some(upstream) = &diag.upstream_id {
                print!(" <- {}", upstream);
            }
            println!();
        }

        if let Some(exp) = &diag.expected {
            println!("    Expected: {}", exp);
        }
        if let Some(act) = &diag.actual {
            println!("    Actual:   {}", act);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn technical_field_flags_override_config() {
        let config = Config::default();
        let neither = TechnicalFieldArgs { technical_fields: false, no_technical_fields: false };
        let off = TechnicalFieldArgs { technical_fields: false, no_technical_fields: true };

        assert!(neither.resolve(&config));
        assert!(!off.resolve(&config));

        let config = Config { include_technical_fields: false, ..Config::default() };
        let on = TechnicalFieldArgs { technical_fields: true, no_technical_fields: false };
        assert!(on.resolve(&config));
    }

    #[test]
    fn find_artifact_by_id_or_unique_name() {
        use colcascade_core::Artifact;

        let workbook = Workbook::new()
            .with_artifact(Artifact::new("a1", "orders", "s1"))
            .with_artifact(Artifact::new("a2", "orders", "s2"))
            .with_artifact(Artifact::new("a3", "dim_customer", "s3"));

        assert_eq!(find_artifact_id(&workbook, "a2").unwrap(), "a2");
        assert_eq!(find_artifact_id(&workbook, "dim_customer").unwrap(), "a3");
        assert!(find_artifact_id(&workbook, "orders").is_err());
        assert!(find_artifact_id(&workbook, "missing").is_err());
    }
}
