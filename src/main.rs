mod cli;

use daopub::{
    config, sequencer,
    processor::{Processor, RunOptions},
    report::RunReport,
    state::RunMode,
    tools,
};
use daopub_common::{CallNumber, ComponentId};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "daopub=trace,daopub_common=debug".to_string()
        } else {
            "daopub=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Publish {
            call_number,
            force,
            mets_only,
            dry_run,
            jobs,
            json,
        } => {
            let mode = if mets_only {
                RunMode::MetsOnly
            } else {
                RunMode::Publish
            };
            let options = RunOptions {
                mode,
                force,
                dry_run,
                jobs,
            };
            run_collection(&call_number, cli.config.as_deref(), options, json)
        }
        Commands::Pdf {
            call_number,
            force,
            jobs,
            json,
        } => {
            let options = RunOptions {
                force,
                jobs,
                ..RunOptions::new(RunMode::PdfOnly)
            };
            run_collection(&call_number, cli.config.as_deref(), options, json)
        }
        Commands::Sequence { source, dest, ext } => sequence(&source, &dest, &ext),
        Commands::Ingest { batch, component } => {
            ingest(&batch, &component, cli.config.as_deref())
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

fn run_collection(
    call_number: &str,
    config_path: Option<&Path>,
    options: RunOptions,
    json: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let call_number: CallNumber = call_number.parse()?;

    if let Some(0) = options.jobs {
        anyhow::bail!("--jobs must be at least 1");
    }

    let processor = Processor::new(config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt
        .block_on(processor.run(&call_number, options))
        .with_context(|| format!("Failed to process {}", call_number))?;

    print_report(&report, json)?;

    if !report.is_success() {
        anyhow::bail!(
            "{} component(s) of {} failed",
            report.summary.failed,
            call_number
        );
    }

    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let json_str = serde_json::to_string_pretty(report)?;
        println!("{}", json_str);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn sequence(source: &Path, dest: &Path, ext: &str) -> Result<()> {
    let report = sequencer::append_sequence(source, dest, ext)?;

    for assignment in &report.assigned {
        println!(
            "{} -> {}",
            assignment.source.display(),
            assignment.destination.display()
        );
    }
    println!(
        "\n{} existing, {} appended, last index {}",
        report.existing,
        report.assigned.len(),
        report.last_index()
    );

    Ok(())
}

fn ingest(batch: &str, component: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let component: ComponentId = component.parse()?;

    let report = sequencer::ingest_batch(&config, batch, &component)?;

    println!("Ingested batch {} into {}", batch, report.component);
    println!(
        "  {}: {} appended (last index {})",
        config.pipeline.image_extension,
        report.images.assigned.len(),
        report.images.last_index()
    );
    println!(
        "  {}: {} appended (last index {})",
        config.pipeline.archival_extension,
        report.archival.assigned.len(),
        report.archival.last_index()
    );

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = tools::check_tools(&config.tools);
    let mut all_ok = true;

    for tool in &tools {
        let ok = tool.available && tool.missing_input.is_none();
        let status = if ok { "✓" } else { "✗" };
        all_ok &= ok;

        print!("{} {}", status, tool.name);

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        if let Some(ref missing) = tool.missing_input {
            print!(" (missing {})", missing.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("Some tools are missing; publishing will fail until they are installed");
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            config::validate_config(&config)?;
            config
        }
    };

    println!("  Image store: {}", config.stores.image_store.display());
    println!("  Archival store: {}", config.stores.archival_store.display());
    println!("  METS root: {}", config.stores.mets_root.display());
    println!("  EAD root: {}", config.stores.ead_root.display());
    println!("  Finding aids: {}", config.finding_aids.collections_url);
    println!("  Workers: {}", config.pipeline.workers);

    Ok(())
}
