use std::path::Path;

use anyhow::Result;
use similar::TextDiff;

use crate::cli::DataArgs;

use super::Context;

/// Unified diff from the current output to what rendering would write
pub fn cmd_diff(ctx: &Context, template: &Path, output: &Path, data_args: &DataArgs) -> Result<()> {
    let engine = ctx.engine();
    let data = ctx.load_data(&engine, data_args)?;
    let rendered = engine.render(template, &data)?;

    let current = match std::fs::read(output) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(templater::TemplaterError::io(output, e).into()),
    };

    let patch = unified_diff(&current, &rendered, &output.display().to_string());
    let changed = current != rendered;

    if ctx.json {
        ctx.emit(&serde_json::json!({
            "event": "diff",
            "output": output.display().to_string(),
            "changed": changed,
            "diff": patch,
        }))?;
    } else if changed {
        print!("{}", patch);
    } else {
        println!("✓ {} is up to date", output.display());
    }
    Ok(())
}

fn unified_diff(old: &str, new: &str, name: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", name), &format!("b/{}", name))
        .to_string()
}
