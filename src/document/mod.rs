//! Document code path
//!
//! Binary document formats are opened and saved by a [`DocumentCodec`];
//! placeholder processing works on the format-neutral [`model`]:
//!
//! - `{{#if key}}` / `{{#unless key}}` keep or clear a paragraph
//! - a run that is exactly `{{image:key}}` becomes a 2x2 inch inline image
//! - `{{key}}` placeholders are substituted run by run
//! - a table whose first row holds `{{#each key}}` repeats its second row

pub mod model;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::FileSystem;

pub use model::Document;
pub use render::extract_document_placeholders;
pub(crate) use render::DocumentRenderer;

/// Opens and saves documents in some concrete format
pub trait DocumentCodec: Send + Sync {
    fn open(&self, path: &Path) -> TemplaterResult<Document>;
    fn save(&self, doc: &Document) -> TemplaterResult<Vec<u8>>;
}

/// Rendering options for the document path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
    /// Copy run formatting onto repeated table rows
    pub preserve_formatting: bool,
    /// Directory relative image paths are looked up in, relative to the template
    pub image_dir: PathBuf,
    /// Format recorded for images whose path has no extension
    pub default_image_format: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            image_dir: PathBuf::from("images"),
            default_image_format: "png".to_string(),
        }
    }
}

/// Codec storing the document model itself as JSON
///
/// Useful for authoring document templates by hand and for tests.
#[derive(Clone)]
pub struct JsonDocumentCodec {
    fs: Arc<dyn FileSystem>,
}

impl JsonDocumentCodec {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl DocumentCodec for JsonDocumentCodec {
    fn open(&self, path: &Path) -> TemplaterResult<Document> {
        let bytes = self.fs.read(path).map_err(|e| TemplaterError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TemplaterError::Document(format!("error opening {}: {}", path.display(), e))
        })
    }

    fn save(&self, doc: &Document) -> TemplaterResult<Vec<u8>> {
        serde_json::to_vec_pretty(doc)
            .map_err(|e| TemplaterError::Document(format!("error saving document: {}", e)))
    }
}
