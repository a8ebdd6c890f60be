use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ExtractArgs;
use crate::commands::resolve_config;
use crate::model::{ApiResponse, ProcessingResult};
use crate::roster::Pipeline;
use crate::util::{write_json_pretty, write_json_stdout};

pub fn run(args: ExtractArgs) -> Result<()> {
    let config = resolve_config(&args.overrides)?;
    let pipeline = Pipeline::new(config)?;

    let result = if args.pdf == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("failed to read document from stdin")?;
        info!(bytes = bytes.len(), "read document from stdin");
        pipeline.process_bytes(&bytes, args.source_hint.as_deref())
    } else {
        let hint = args
            .source_hint
            .clone()
            .or_else(|| file_name_hint(&args.pdf));
        pipeline.process(&args.pdf, hint.as_deref())
    };

    info!(
        success = result.success,
        classes = result.class_count(),
        students = result.student_count(),
        errors = result.errors.len(),
        "extraction finished"
    );
    write_result(&result, args.envelope, args.output.as_deref())
}

fn file_name_hint(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
}

fn write_result(result: &ProcessingResult, envelope: bool, output: Option<&Path>) -> Result<()> {
    match (envelope, output) {
        (true, Some(path)) => write_json_pretty(path, &ApiResponse::from(result))?,
        (true, None) => write_json_stdout(&ApiResponse::from(result))?,
        (false, Some(path)) => write_json_pretty(path, result)?,
        (false, None) => write_json_stdout(result)?,
    }

    if let Some(path) = output {
        info!(path = %path.display(), "wrote extraction result");
    }
    Ok(())
}
