use std::path::Path;

use anyhow::Result;

use super::Context;

/// Put the newest backup of `output` back in place, or list backups
pub fn cmd_restore(ctx: &Context, output: &Path, list: bool) -> Result<()> {
    let writer = ctx.writer();
    let store = writer.backups();

    if list {
        let backups = store.list_backups(output)?;
        if ctx.json {
            ctx.emit(&serde_json::json!({
                "event": "backups",
                "output": output.display().to_string(),
                "backups": backups,
            }))?;
        } else if backups.is_empty() {
            println!("No backups for {}", output.display());
        } else {
            for backup in backups.iter().rev() {
                println!("{}", backup.display());
            }
        }
        return Ok(());
    }

    let restored = store.restore_latest(output)?;
    if ctx.json {
        ctx.emit(&serde_json::json!({
            "event": "restore",
            "output": output.display().to_string(),
            "backup": restored,
        }))?;
    } else {
        println!("✓ Restored {} from {}", output.display(), restored.display());
    }
    Ok(())
}
