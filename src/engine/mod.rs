//! Render engine
//!
//! Composes the file content cache, the template cache and the security gate
//! into `render(path, data) -> text`, and hosts plugins and the document
//! code path.

mod data;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::{
    CacheStats, FileContentCache, Sweep, TemplateCache, DEFAULT_CAPACITY, DEFAULT_TTL,
};
use crate::document::{
    extract_document_placeholders, DocumentCodec, DocumentOptions, DocumentRenderer,
};
use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::{FileSystem, LocalFs};
use crate::models::DataMap;
use crate::plugin::TemplatePlugin;
use crate::security::{sanitize_data, validate_template_content};
use crate::template::{parse_metadata, scan_keys, FunctionRegistry, TemplateMetadata};

pub use data::{load_data, parse_assignments};

/// Something that turns a template path and data into text
///
/// The batch processor and the watcher are generic over this so they can be
/// driven by the real engine or a stand-in.
pub trait Renderer: Send + Sync {
    fn render(&self, path: &Path, data: &DataMap) -> TemplaterResult<String>;

    /// Load a data file for a render
    fn load_data(&self, path: &Path) -> TemplaterResult<DataMap> {
        load_data(&LocalFs, path)
    }

    /// Cache counters, for renderers that cache
    fn cache_stats(&self) -> Option<EngineCacheStats> {
        None
    }
}

/// Counters for both cache layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineCacheStats {
    pub files: CacheStats,
    pub templates: CacheStats,
    pub file_bytes: u64,
}

pub struct RenderEngine {
    files: Arc<FileContentCache>,
    templates: TemplateCache,
    plugins: Vec<Arc<dyn TemplatePlugin>>,
    codec: Option<Arc<dyn DocumentCodec>>,
    document_options: DocumentOptions,
}

/// Builder for [`RenderEngine`]
pub struct RenderEngineBuilder {
    fs: Arc<dyn FileSystem>,
    capacity: usize,
    ttl: Duration,
    plugins: Vec<Arc<dyn TemplatePlugin>>,
    codec: Option<Arc<dyn DocumentCodec>>,
    document_options: DocumentOptions,
}

impl Default for RenderEngineBuilder {
    fn default() -> Self {
        Self {
            fs: Arc::new(LocalFs::new()),
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
            plugins: Vec::new(),
            codec: None,
            document_options: DocumentOptions::default(),
        }
    }
}

impl RenderEngineBuilder {
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Capacity of each cache layer
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Idle time after which cache entries expire
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Register a plugin; output passes through plugins in registration order
    pub fn plugin(mut self, plugin: Arc<dyn TemplatePlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn DocumentCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_document_options(mut self, options: DocumentOptions) -> Self {
        self.document_options = options;
        self
    }

    pub fn build(self) -> RenderEngine {
        let mut registry = FunctionRegistry::builtin();
        for plugin in &self.plugins {
            registry.merge(&plugin.template_functions());
            debug!(plugin = plugin.name(), version = plugin.version(), "registered plugin");
        }

        let files = Arc::new(FileContentCache::with_limits(
            self.fs,
            self.capacity,
            self.ttl,
        ));
        let templates = TemplateCache::with_limits(
            Arc::clone(&files),
            Arc::new(registry),
            self.capacity,
            self.ttl,
        );

        RenderEngine {
            files,
            templates,
            plugins: self.plugins,
            codec: self.codec,
            document_options: self.document_options,
        }
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RenderEngine {
    pub fn builder() -> RenderEngineBuilder {
        RenderEngineBuilder::default()
    }

    pub fn registry(&self) -> &FunctionRegistry {
        self.templates.registry()
    }

    /// Render the text template at `path` with `data`
    ///
    /// The template cache runs the security gate on the bytes it compiles,
    /// before anything is cached; data values are sanitized before use.
    pub fn render(&self, path: &Path, data: &DataMap) -> TemplaterResult<String> {
        let template = self.templates.get(path)?;
        let data = sanitize_data(data);
        let mut out = template.render(&data)?;

        for plugin in &self.plugins {
            out = plugin.process_template(&out)?;
        }
        debug!(path = %path.display(), bytes = out.len(), "rendered template");
        Ok(out)
    }

    /// Run the security gate and compile, without rendering
    pub fn check_template(&self, path: &Path) -> TemplaterResult<()> {
        self.templates.get(path).map(|_| ())
    }

    /// Keys referenced as `{{.name}}` in the template source
    pub fn extract_keys(&self, path: &Path) -> TemplaterResult<BTreeSet<String>> {
        let bytes = self.files.get(path)?;
        Ok(scan_keys(&String::from_utf8_lossy(&bytes)))
    }

    /// Fail with every key the template needs that `data` lacks
    ///
    /// Needed keys are the `{{.name}}` references plus the metadata's
    /// `required_keys`.
    pub fn validate_data_against(&self, path: &Path, data: &DataMap) -> TemplaterResult<()> {
        let mut needed = self.extract_keys(path)?;
        if let Some(meta) = self.template_metadata(path)? {
            needed.extend(meta.required_keys);
        }

        let missing: Vec<String> = needed
            .into_iter()
            .filter(|key| !data.contains_key(key))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TemplaterError::MissingKeys { keys: missing })
        }
    }

    pub fn template_metadata(&self, path: &Path) -> TemplaterResult<Option<TemplateMetadata>> {
        let bytes = self.files.get(path)?;
        parse_metadata(&path.display().to_string(), &String::from_utf8_lossy(&bytes))
    }

    /// Every `depends_on` entry, relative to the template's directory, must exist
    pub fn validate_dependencies(&self, path: &Path) -> TemplaterResult<()> {
        let Some(meta) = self.template_metadata(path)? else {
            return Ok(());
        };
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        for dep in &meta.depends_on {
            let dep_path = dir.join(dep);
            if !self.files.fs().exists(&dep_path) {
                return Err(TemplaterError::MissingDependency { path: dep_path });
            }
        }
        Ok(())
    }

    /// Render a document template through the configured codec
    pub fn render_document(&self, path: &Path, data: &DataMap) -> TemplaterResult<Vec<u8>> {
        let codec = self.codec()?;
        let mut doc = codec.open(path)?;

        let text: Vec<String> = doc.paragraphs().into_iter().map(|p| p.text()).collect();
        validate_template_content(&text.join("\n"))?;

        let data = sanitize_data(data);
        let renderer = DocumentRenderer {
            fs: self.files.fs().as_ref(),
            options: &self.document_options,
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        renderer.render(&mut doc, &data)?;
        debug!(path = %path.display(), images = doc.images.len(), "rendered document");
        codec.save(&doc)
    }

    /// Data keys a document template references
    pub fn document_placeholders(&self, path: &Path) -> TemplaterResult<BTreeSet<String>> {
        let doc = self.codec()?.open(path)?;
        Ok(extract_document_placeholders(&doc))
    }

    fn codec(&self) -> TemplaterResult<&Arc<dyn DocumentCodec>> {
        self.codec
            .as_ref()
            .ok_or_else(|| TemplaterError::Document("no document codec configured".to_string()))
    }

    /// Drop every compiled template and cached file
    pub fn invalidate_all(&self) {
        self.templates.invalidate_all();
        self.files.clear();
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            files: self.files.stats(),
            templates: self.templates.stats(),
            file_bytes: self.files.total_bytes(),
        }
    }

    /// Bytes currently held by the file content cache
    pub fn memory_usage(&self) -> u64 {
        self.files.total_bytes()
    }
}

impl Sweep for RenderEngine {
    fn sweep_expired(&self) -> usize {
        self.templates.sweep_expired() + self.files.sweep_expired()
    }
}

impl Renderer for RenderEngine {
    fn render(&self, path: &Path, data: &DataMap) -> TemplaterResult<String> {
        RenderEngine::render(self, path, data)
    }

    fn load_data(&self, path: &Path) -> TemplaterResult<DataMap> {
        load_data(self.files.fs().as_ref(), path)
    }

    fn cache_stats(&self) -> Option<EngineCacheStats> {
        Some(RenderEngine::cache_stats(self))
    }
}
