//! Batch driver over a project tree.
//!
//! Generates the functions index, then runs Expression Extraction over every
//! configured target. Files are independent and processed in parallel; only the
//! files that were rewritten are written to the mirror path under `out_dir`.
//! The first error aborts the batch.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cache::IncrementalCache;
use crate::config::Config;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::extract::{process_expressions, Extraction};
use crate::functions::generate_functions_index;

#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Output path of the generated functions index, if one was written.
    pub functions_index: Option<PathBuf>,
    /// Output paths of the rewritten modules.
    pub rewritten: Vec<PathBuf>,
    /// Source paths of modules left untouched.
    pub unchanged: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    pub cache_hits: usize,
}

struct Job {
    path: PathBuf,
    process_css: bool,
}

struct Outcome {
    source_path: PathBuf,
    written: Option<PathBuf>,
    diagnostics: Vec<Diagnostic>,
    cached: bool,
}

/// Process the project rooted at `root`.
pub fn process_project(root: &Path, config: &Config) -> Result<ProcessReport> {
    let start = Instant::now();
    let src_dir = root.join(&config.src_dir);
    let out_dir = root.join(&config.out_dir);
    let mut report = ProcessReport::default();

    report.functions_index = process_functions(root, config)?;

    let jobs = collect_jobs(&src_dir, config)?;
    let cache = config
        .cache_dir
        .as_ref()
        .map(|dir| IncrementalCache::new(root.join(dir), &config.extract));

    let outcomes = jobs
        .par_iter()
        .map(|job| process_file(root, &src_dir, &out_dir, config, job, cache.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    for outcome in outcomes {
        report.cache_hits += outcome.cached as usize;
        report.diagnostics.extend(outcome.diagnostics);
        match outcome.written {
            Some(path) => report.rewritten.push(path),
            None => report.unchanged.push(outcome.source_path),
        }
    }

    info!(
        files = jobs.len(),
        rewritten = report.rewritten.len(),
        diagnostics = report.diagnostics.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "transpile done"
    );
    Ok(report)
}

fn process_functions(root: &Path, config: &Config) -> Result<Option<PathBuf>> {
    let relative = config.src_dir.join(&config.functions_index);
    let path = root.join(&relative);
    if !path.exists() {
        debug!(path = %path.display(), "no functions index");
        return Ok(None);
    }

    let source = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let Some(code) = generate_functions_index(&source, &relative.to_string_lossy(), &config.extract)?
    else {
        return Ok(None);
    };

    let out = root.join(&config.out_dir).join(&config.functions_index);
    write_output(&out, &code)?;
    Ok(Some(out))
}

fn collect_jobs(src_dir: &Path, config: &Config) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    for target in &config.targets {
        let path = src_dir.join(&target.path);
        if path.is_file() {
            jobs.push(Job {
                path,
                process_css: target.process_css,
            });
        } else if path.is_dir() {
            jobs.extend(find_sources(&path)?.into_iter().map(|path| Job {
                path,
                process_css: target.process_css,
            }));
        } else {
            debug!(target = %path.display(), "skipping missing target");
        }
    }
    Ok(jobs)
}

/// `.js` and `.jsx` files under `dir`. Unreadable entries are errors.
fn find_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            Error::io(path, e.into())
        })?;
        let path = entry.path();
        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext == "js" || ext == "jsx" {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    Ok(files)
}

fn process_file(
    root: &Path,
    src_dir: &Path,
    out_dir: &Path,
    config: &Config,
    job: &Job,
    cache: Option<&IncrementalCache>,
) -> Result<Outcome> {
    let source = fs::read_to_string(&job.path).map_err(|e| Error::io(&job.path, e))?;
    let file_label = job
        .path
        .strip_prefix(root)
        .unwrap_or(job.path.as_path())
        .to_string_lossy()
        .to_string();

    let cached = cache.and_then(|c| c.get(&file_label, &source, job.process_css));
    let hit = cached.is_some();
    let extraction: Extraction = match cached {
        Some(extraction) => extraction,
        None => {
            let extraction =
                process_expressions(&source, &file_label, &config.extract, job.process_css)?;
            if let Some(cache) = cache {
                cache.set(&file_label, &source, job.process_css, &extraction);
            }
            extraction
        }
    };

    let written = match &extraction.code {
        Some(code) => {
            let relative = job.path.strip_prefix(src_dir).unwrap_or(job.path.as_path());
            let out = out_dir.join(relative);
            write_output(&out, code)?;
            debug!(file = %file_label, placeholders = extraction.placeholders, cached = hit, "rewritten");
            Some(out)
        }
        None => {
            debug!(file = %file_label, "unchanged");
            None
        }
    };

    Ok(Outcome {
        source_path: job.path.clone(),
        written,
        diagnostics: extraction.diagnostics,
        cached: hit,
    })
}

fn write_output(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, code).map_err(|e| Error::io(path, e))
}
