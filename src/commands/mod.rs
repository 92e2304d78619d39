//! Command implementations for the templater binary

pub mod batch;
pub mod diff;
pub mod inspect;
pub mod render;
pub mod restore;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tracing::warn;

use templater::config::{self, Config};
use templater::document::{DocumentCodec, JsonDocumentCodec};
use templater::engine::parse_assignments;
use templater::{DataMap, LocalFs, RenderEngine, Renderer, ReliableWriter};

use crate::cli::DataArgs;

/// Settings every command runs with
pub struct Context {
    pub config: Config,
    pub json: bool,
}

impl Context {
    /// Resolve configuration from an explicit file or by discovery
    pub fn load(explicit: Option<&Path>, json: bool) -> Result<Self> {
        let (config, warnings) = match explicit {
            Some(path) => {
                let (config, warnings) = config::load_layered(&[path.to_path_buf()])?;
                (
                    config::with_env_overrides(config, |key| std::env::var(key).ok()),
                    warnings,
                )
            }
            None => {
                let cwd = std::env::current_dir().context("cannot read current directory")?;
                config::load_with_warnings(&cwd)?
            }
        };
        for warning in &warnings {
            warn!("{}", warning);
        }
        Ok(Self { config, json })
    }

    pub fn engine(&self) -> RenderEngine {
        self.engine_builder().build()
    }

    /// Engine that can also open JSON document models
    pub fn document_engine(&self) -> RenderEngine {
        let codec: Arc<dyn DocumentCodec> = Arc::new(JsonDocumentCodec::new(Arc::new(LocalFs::new())));
        self.engine_builder().with_codec(codec).build()
    }

    fn engine_builder(&self) -> templater::engine::RenderEngineBuilder {
        RenderEngine::builder()
            .with_capacity(self.config.cache.capacity)
            .with_ttl(self.config.cache_ttl())
    }

    pub fn writer(&self) -> ReliableWriter {
        ReliableWriter::new(Arc::new(LocalFs::new()), self.config.write_options())
    }

    /// Data file contents with `--set` pairs layered on top
    pub fn load_data(&self, engine: &RenderEngine, args: &DataArgs) -> Result<DataMap> {
        let mut data = match &args.data {
            Some(path) => Renderer::load_data(engine, path)?,
            None => DataMap::new(),
        };
        data.extend(parse_assignments(args.set.iter().map(String::as_str))?);
        Ok(data)
    }

    /// Print one JSON line to stdout
    pub fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string(value)?);
        Ok(())
    }
}
