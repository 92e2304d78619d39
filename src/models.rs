//! Core data models shared across templater
//!
//! - `DataMap`: the string→string mapping templates render against
//! - `RenderJob`: one template path paired with its data
//! - truthiness rules shared by the text and document paths

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Data mapping a template is rendered against
///
/// Ordered so that error listings and JSON output are deterministic.
pub type DataMap = BTreeMap<String, String>;

/// A single unit of render work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderJob {
    pub path: PathBuf,
    #[serde(default)]
    pub data: DataMap,
}

impl RenderJob {
    pub fn new(path: impl Into<PathBuf>, data: DataMap) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

/// Truthiness used by `#if` / `#unless`: present, non-empty, not "false"/"0"
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        Some(v) => !v.is_empty() && v != "false" && v != "0",
        None => false,
    }
}
