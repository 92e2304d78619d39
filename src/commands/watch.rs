use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use crossbeam_channel::{bounded, select};

use templater::watcher::{WatchEvent, WatchOptions, Watcher};
use templater::CacheSweeper;

use super::Context;

pub fn cmd_watch(
    ctx: &Context,
    template: &Path,
    output: &Path,
    data: Option<PathBuf>,
    interval: Option<u64>,
) -> Result<()> {
    let debounce = interval
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.watch_interval());

    let mut options = WatchOptions::new(template, output)
        .with_debounce(debounce)
        .with_initial_render(true);
    if let Some(data) = data {
        options = options.with_data(data);
    }

    let engine = Arc::new(ctx.engine());
    let _sweeper = ctx
        .config
        .sweep_interval()
        .map(|every| CacheSweeper::spawn(Arc::clone(&engine), every));

    // Ctrl+C only signals; the loop below owns the shutdown
    let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })
    .context("failed to install Ctrl+C handler")?;

    let watcher = Watcher::start(engine, ctx.writer(), options)?;

    let started = WatchEvent::WatchStarted {
        template: template.display().to_string(),
        output: output.display().to_string(),
    };
    if ctx.json {
        println!("{}", started.to_json());
    } else {
        println!("👀 Watching {} -> {}", template.display(), output.display());
        println!("Press Ctrl+C to stop\n");
    }

    loop {
        let running = select! {
            recv(watcher.status()) -> status => match status {
                Ok(status) => {
                    if ctx.json {
                        println!("{}", WatchEvent::from(&status).to_json());
                    } else {
                        println!(
                            "✓ [{}] wrote {} ({} bytes)",
                            status.cycle,
                            status.output.display(),
                            status.bytes
                        );
                    }
                    true
                }
                Err(_) => false,
            },
            recv(watcher.errors()) -> error => match error {
                Ok(error) => {
                    if ctx.json {
                        let event = WatchEvent::Error { message: error.to_string() };
                        println!("{}", event.to_json());
                    } else {
                        eprintln!("✗ Error: {}", error);
                    }
                    true
                }
                Err(_) => false,
            },
            recv(interrupt_rx) -> _ => false,
        };
        if !running {
            break;
        }
    }

    watcher.stop();
    if ctx.json {
        println!("{}", WatchEvent::Shutdown.to_json());
    } else {
        println!("\n👋 Shutting down...");
    }
    Ok(())
}
