use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::cli::DataArgs;

use super::Context;

pub fn cmd_render(
    ctx: &Context,
    template: &Path,
    data_args: &DataArgs,
    output: Option<&Path>,
    validate: bool,
    document: bool,
) -> Result<()> {
    let engine = if document {
        ctx.document_engine()
    } else {
        ctx.engine()
    };
    let data = ctx.load_data(&engine, data_args)?;

    let bytes = if document {
        engine.render_document(template, &data)?
    } else {
        if validate {
            engine.validate_data_against(template, &data)?;
        }
        engine.render(template, &data)?.into_bytes()
    };

    match output {
        Some(output) => {
            let outcome = ctx.writer().write_reliably(output, &bytes)?;
            if ctx.json {
                ctx.emit(&serde_json::json!({
                    "event": "render",
                    "template": template.display().to_string(),
                    "output": outcome,
                }))?;
            } else {
                println!("✓ Wrote {} ({} bytes)", outcome.path.display(), outcome.bytes);
                if let Some(backup) = &outcome.backup {
                    println!("  backup: {}", backup.display());
                }
            }
        }
        None if ctx.json => ctx.emit(&serde_json::json!({
            "event": "render",
            "template": template.display().to_string(),
            "content": String::from_utf8_lossy(&bytes),
        }))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
