use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daopub")]
#[command(author, version, about = "Publishes digitized archival folders as PDF + METS and links them from EAD finding aids")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish every unpublished component of a collection
    Publish {
        /// Collection call number (e.g. C0022)
        #[arg(required = true)]
        call_number: String,

        /// Republish components that already have a PDF
        #[arg(long, conflicts_with = "mets_only")]
        force: bool,

        /// Regenerate METS for published components only (no EAD, no PDF)
        #[arg(long)]
        mets_only: bool,

        /// Show what would be done without executing
        #[arg(long)]
        dry_run: bool,

        /// Components processed at once (defaults to pipeline.workers)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate PDFs only
    Pdf {
        /// Collection call number
        #[arg(required = true)]
        call_number: String,

        /// Regenerate PDFs that already exist
        #[arg(long)]
        force: bool,

        /// Components processed at once (defaults to pipeline.workers)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append a directory of images to a component's numbered sequence
    Sequence {
        /// Directory holding the new images
        #[arg(long)]
        source: PathBuf,

        /// Component directory to append to
        #[arg(long)]
        dest: PathBuf,

        /// Image extension to move (e.g. jp2)
        #[arg(long)]
        ext: String,
    },

    /// Move a delivered batch into a component in both image stores
    Ingest {
        /// Batch directory name under each store
        #[arg(long)]
        batch: String,

        /// Target component as CALLNO/COMPONENT
        #[arg(long)]
        component: String,
    },

    /// Check that the configured external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}
