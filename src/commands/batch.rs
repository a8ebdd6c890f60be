use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cli::BatchArgs;
use crate::commands::resolve_config;
use crate::model::{BatchEntry, BatchManifest};
use crate::roster::{ExtractionConfig, Pipeline};
use crate::util::{
    ensure_directory, now_utc_string, safe_file_stem, sha256_file, utc_compact_string,
    write_json_pretty,
};

pub fn run(args: BatchArgs) -> Result<()> {
    let config = resolve_config(&args.overrides)?;

    let mut pdf_paths = discover_pdfs(&args.input_dir)?;
    pdf_paths.sort();
    if pdf_paths.is_empty() {
        bail!("no PDFs found in {}", args.input_dir.display());
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        args.input_dir
            .join(format!("roster-results-{}", utc_compact_string(Utc::now())))
    });
    ensure_directory(&output_dir)?;

    let jobs = args.jobs.clamp(1, pdf_paths.len());
    info!(
        pdf_count = pdf_paths.len(),
        jobs,
        output_dir = %output_dir.display(),
        "batch extraction started"
    );

    let entries = process_all(&pdf_paths, &output_dir, &config, jobs)?;

    let succeeded = entries.iter().filter(|entry| entry.success).count();
    let manifest = BatchManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: args.input_dir.display().to_string(),
        pdf_count: entries.len(),
        succeeded,
        failed: entries.len() - succeeded,
        entries,
    };

    let manifest_path = output_dir.join("batch_manifest.json");
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote batch manifest");
    info!(
        succeeded = manifest.succeeded,
        failed = manifest.failed,
        "batch extraction completed"
    );

    Ok(())
}

pub fn process_all(
    pdf_paths: &[PathBuf],
    output_dir: &Path,
    config: &ExtractionConfig,
    jobs: usize,
) -> Result<Vec<BatchEntry>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("failed to build batch thread pool")?;

    pool.install(|| {
        pdf_paths
            .par_iter()
            .enumerate()
            .map_init(
                || Pipeline::new(config.clone()),
                |pipeline, (index, path)| match pipeline {
                    Ok(pipeline) => process_one(pipeline, index, path, output_dir),
                    Err(err) => Err(anyhow!("failed to initialize extraction pipeline: {err:#}")),
                },
            )
            .collect()
    })
}

fn process_one(
    pipeline: &Pipeline,
    index: usize,
    path: &Path,
    output_dir: &Path,
) -> Result<BatchEntry> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
    let sha256 = sha256_file(path)?;

    let result = pipeline.process(path, Some(&filename));
    if result.success {
        info!(
            file = %filename,
            classes = result.class_count(),
            students = result.student_count(),
            "document extracted"
        );
    } else {
        warn!(file = %filename, reason = %result.message, "document extraction failed");
    }

    let result_path = output_dir.join(format!("{:04}_{}.json", index + 1, safe_file_stem(path)));
    write_json_pretty(&result_path, &result)?;

    Ok(BatchEntry {
        filename,
        sha256,
        success: result.success,
        message: result.message.clone(),
        class_count: result.class_count(),
        student_count: result.student_count(),
        result_path: result_path.display().to_string(),
    })
}

pub fn discover_pdfs(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    Ok(pdfs)
}
