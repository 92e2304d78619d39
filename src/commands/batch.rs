use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use ignore::WalkBuilder;
use tracing::debug;

use templater::security::sanitize_path;
use templater::{BatchProcessor, Config};

use crate::cli::DataArgs;

use super::Context;

/// Extensions dropped from output names; anything else is kept as-is
const TEMPLATE_SUFFIXES: &[&str] = &["tmpl", "tpl"];

pub fn cmd_batch(
    ctx: &Context,
    inputs: &[PathBuf],
    data_args: &DataArgs,
    output: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<()> {
    let engine = ctx.engine();
    let data = ctx.load_data(&engine, data_args)?;

    let templates = collect_templates(&ctx.config, inputs);
    if templates.is_empty() {
        bail!("no templates found");
    }
    let paths: Vec<PathBuf> = templates.keys().cloned().collect();

    let processor = BatchProcessor::new(engine);
    processor.set_worker_count(workers.unwrap_or_else(|| ctx.config.workers()));
    let result = processor.process_all(&paths, &data);
    let stats = processor.stats();

    let out_dir = output.or_else(|| ctx.config.defaults.output_dir.clone());
    let mut written = Vec::new();
    if let Some(out_dir) = &out_dir {
        let writer = ctx.writer();
        for (path, text) in &result.results {
            let dest = out_dir.join(&templates[path]);
            written.push(writer.write_reliably(&dest, text.as_bytes())?);
        }
    }

    let failures: Vec<String> = result
        .error
        .as_ref()
        .map(|e| e.failures.iter().map(ToString::to_string).collect())
        .unwrap_or_default();

    if ctx.json {
        ctx.emit(&serde_json::json!({
            "event": "batch",
            "rendered": result.results.len(),
            "failed": failures,
            "written": written,
            "stats": stats,
        }))?;
    } else if out_dir.is_some() {
        for outcome in &written {
            println!("✓ {}", outcome.path.display());
        }
        println!(
            "\nBatch: {} rendered, {} failed in {} ms ({} workers, {} cache hits)",
            result.results.len(),
            failures.len(),
            stats.processing_time_ms,
            stats.worker_count,
            stats.cache_hits
        );
    } else {
        for (path, text) in &result.results {
            println!("==> {} <==", path.display());
            println!("{}", text);
        }
    }

    match result.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Template path -> relative output name
///
/// Directories are walked (honouring ignore files) and filtered by the
/// configured extensions; files given directly are always taken.
fn collect_templates(config: &Config, inputs: &[PathBuf]) -> BTreeMap<PathBuf, PathBuf> {
    let mut templates = BTreeMap::new();
    for input in inputs {
        if !input.is_dir() {
            let name = input.file_name().map(Path::new).unwrap_or(input.as_path());
            templates.insert(input.clone(), output_name(name));
            continue;
        }

        for entry in WalkBuilder::new(input).build().flatten() {
            let path = entry.path();
            if !path.is_file() || !config.is_template_file(path) {
                continue;
            }
            let relative = path.strip_prefix(input).unwrap_or(path);
            debug!(path = %path.display(), "found template");
            templates.insert(path.to_path_buf(), output_name(relative));
        }
    }
    templates
}

fn output_name(relative: &Path) -> PathBuf {
    let stripped = match relative.extension().and_then(|e| e.to_str()) {
        Some(ext) if TEMPLATE_SUFFIXES.contains(&ext) => relative.with_extension(""),
        _ => relative.to_path_buf(),
    };
    sanitize_path(&stripped.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_output_name_strips_template_suffix() {
        assert_eq!(output_name(Path::new("a/letter.txt.tmpl")), PathBuf::from("a/letter.txt"));
        assert_eq!(output_name(Path::new("notes.md")), PathBuf::from("notes.md"));
        assert_eq!(output_name(Path::new("../x.tpl")), PathBuf::from("x"));
    }

    #[test]
    fn test_collect_templates_walks_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.tmpl"), "a").unwrap();
        fs::write(dir.path().join("sub").join("b.txt.tmpl"), "b").unwrap();
        fs::write(dir.path().join("image.png"), "x").unwrap();

        let found = collect_templates(&Config::default(), &[dir.path().to_path_buf()]);

        let names: Vec<_> = found.values().cloned().collect();
        assert_eq!(names, vec![PathBuf::from("a"), PathBuf::from("sub/b.txt")]);
    }
}
