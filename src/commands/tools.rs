use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ToolsArgs;
use crate::model::ToolVersions;
use crate::roster::{command_version_optional, tesseract_languages};
use crate::util::{write_json_pretty, write_json_stdout};

pub fn run(args: ToolsArgs) -> Result<()> {
    let versions = collect_tool_versions();

    for (tool, version) in [
        ("pdftotext", &versions.pdftotext),
        ("pdftohtml", &versions.pdftohtml),
        ("pdftoppm", &versions.pdftoppm),
        ("tesseract", &versions.tesseract),
    ] {
        match version {
            Some(version) => info!(tool, version = %version, "tool available"),
            None => warn!(tool, "tool not found"),
        }
    }
    if versions.tesseract.is_some() && versions.tesseract_languages.is_empty() {
        warn!("tesseract reports no installed languages");
    }

    match args.output {
        Some(path) => {
            write_json_pretty(&path, &versions)?;
            info!(path = %path.display(), "wrote tool report");
        }
        None => write_json_stdout(&versions)?,
    }
    Ok(())
}

fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]),
        pdftohtml: command_version_optional("pdftohtml", &["-v"]),
        pdftoppm: command_version_optional("pdftoppm", &["-v"]),
        tesseract: command_version_optional("tesseract", &["--version"]),
        tesseract_languages: tesseract_languages(),
    }
}
