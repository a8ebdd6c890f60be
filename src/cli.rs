use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "roster-extract",
    version,
    about = "Class roster extraction from school list PDFs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Batch(BatchArgs),
    Tools(ToolsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExtractionOverrides {
    /// JSON file with extraction settings; flags below take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub garbled_ratio: Option<f64>,

    #[arg(long)]
    pub fragmented_ratio: Option<f64>,

    #[arg(long)]
    pub school_header_lines: Option<usize>,

    #[arg(long)]
    pub ocr_dpi: Option<u32>,

    #[arg(long)]
    pub ocr_lang: Option<String>,

    #[arg(long)]
    pub ocr_psm: Option<u32>,

    #[arg(long)]
    pub diagnostic_sample_cap: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Roster PDF, or `-` to read the document from stdin.
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long)]
    pub source_hint: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub envelope: bool,

    #[command(flatten)]
    pub overrides: ExtractionOverrides,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    #[command(flatten)]
    pub overrides: ExtractionOverrides,
}

#[derive(Args, Debug, Clone)]
pub struct ToolsArgs {
    #[arg(long)]
    pub output: Option<PathBuf>,
}
