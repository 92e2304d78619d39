use std::path::Path;

use anyhow::Result;

use crate::cli::DataArgs;

use super::Context;

/// List the `{{.key}}` references of a template
pub fn cmd_keys(ctx: &Context, template: &Path) -> Result<()> {
    let keys = ctx.engine().extract_keys(template)?;

    if ctx.json {
        ctx.emit(&serde_json::json!({
            "event": "keys",
            "template": template.display().to_string(),
            "keys": keys,
        }))?;
    } else {
        for key in &keys {
            println!("{}", key);
        }
    }
    Ok(())
}

/// Security gate, compile, metadata dependencies and, with data, completeness
pub fn cmd_check(ctx: &Context, template: &Path, data_args: &DataArgs) -> Result<()> {
    let engine = ctx.engine();
    engine.check_template(template)?;
    engine.validate_dependencies(template)?;

    let has_data = data_args.data.is_some() || !data_args.set.is_empty();
    if has_data {
        let data = ctx.load_data(&engine, data_args)?;
        engine.validate_data_against(template, &data)?;
    }
    let metadata = engine.template_metadata(template)?;

    if ctx.json {
        ctx.emit(&serde_json::json!({
            "event": "check",
            "template": template.display().to_string(),
            "ok": true,
            "metadata": metadata,
            "data_checked": has_data,
        }))?;
    } else {
        println!("✓ {} is valid", template.display());
        if let Some(meta) = metadata {
            if !meta.name.is_empty() {
                println!("  name: {}", meta.name);
            }
            if !meta.version.is_empty() {
                println!("  version: {}", meta.version);
            }
            if !meta.depends_on.is_empty() {
                println!("  depends on: {}", meta.depends_on.join(", "));
            }
        }
    }
    Ok(())
}
