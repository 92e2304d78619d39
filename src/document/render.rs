//! Placeholder processing over the document model

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::FileSystem;
use crate::models::{is_truthy, DataMap};
use crate::template::value_text;

use super::model::{
    Block, Document, ImageData, InlineImage, Paragraph, Row, RunProps, Table, EMU_PER_INCH,
};
use super::DocumentOptions;

fn regex(cell: &'static OnceLock<Regex>, src: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(src).unwrap_or_else(|e| panic!("invalid regex {src}: {e}")))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\{\{([^}]+)\}\}")
}

fn condition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\{\{#(if|unless)\s+\.?([\w.-]+)\s*\}\}")
}

fn each_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\{\{#each\s+\.?([\w.-]+)\s*\}\}")
}

fn block_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\{\{\s*(#(if|unless|each)\s[^}]*|/(if|unless|each)\s*)\}\}")
}

fn strip_markers(text: &str) -> String {
    block_marker_re().replace_all(text, "").into_owned()
}

fn missing(what: &str, key: &str) -> TemplaterError {
    TemplaterError::Document(format!("{} not found for key: {}", what, key))
}

/// Fills one opened document in place
pub(crate) struct DocumentRenderer<'a> {
    pub fs: &'a dyn FileSystem,
    pub options: &'a DocumentOptions,
    /// Directory relative image paths are resolved against
    pub base_dir: PathBuf,
}

impl DocumentRenderer<'_> {
    pub fn render(&self, doc: &mut Document, data: &DataMap) -> TemplaterResult<()> {
        let mut blocks = std::mem::take(&mut doc.blocks);
        let result = blocks.iter_mut().try_for_each(|block| match block {
            Block::Paragraph(p) => self.paragraph(p, data, doc),
            Block::Table(t) => self.table(t, data, doc),
        });
        doc.blocks = blocks;
        result
    }

    fn paragraph(&self, p: &mut Paragraph, data: &DataMap, doc: &mut Document) -> TemplaterResult<()> {
        let text = p.text();
        if let Some(caps) = condition_re().captures(&text) {
            let truthy = is_truthy(data.get(&caps[2]).map(String::as_str));
            let keep = if &caps[1] == "if" { truthy } else { !truthy };
            if !keep {
                for run in &mut p.runs {
                    run.text.clear();
                    run.image = None;
                }
                return Ok(());
            }
            for run in &mut p.runs {
                run.text = strip_markers(&run.text);
            }
        }

        for run in &mut p.runs {
            if run.text.is_empty() {
                continue;
            }
            let image_key = run
                .text
                .trim()
                .strip_prefix("{{image:")
                .and_then(|rest| rest.strip_suffix("}}"))
                .map(|key| key.trim().to_string());
            if let Some(key) = image_key {
                let index = self.bind_image(&key, data, doc)?;
                run.text.clear();
                run.image = Some(InlineImage {
                    image: index,
                    width_emu: 2 * EMU_PER_INCH,
                    height_emu: 2 * EMU_PER_INCH,
                });
                continue;
            }
            run.text = substitute(&run.text, data, None)?;
        }
        Ok(())
    }

    fn table(&self, t: &mut Table, data: &DataMap, doc: &mut Document) -> TemplaterResult<()> {
        let each_key = match t.rows.first() {
            Some(header) if t.rows.len() >= 2 => each_re()
                .captures(&header.text())
                .map(|caps| caps[1].to_string()),
            _ => None,
        };

        match each_key {
            Some(key) => self.repeat_rows(t, &key, data, doc),
            None => t
                .rows
                .iter_mut()
                .try_for_each(|row| self.row(row, data, doc)),
        }
    }

    fn row(&self, row: &mut Row, data: &DataMap, doc: &mut Document) -> TemplaterResult<()> {
        for cell in &mut row.cells {
            for p in &mut cell.paragraphs {
                self.paragraph(p, data, doc)?;
            }
        }
        Ok(())
    }

    /// Replace the second row with one copy per element of `data[key]`
    fn repeat_rows(
        &self,
        t: &mut Table,
        key: &str,
        data: &DataMap,
        doc: &mut Document,
    ) -> TemplaterResult<()> {
        let raw = data.get(key).ok_or_else(|| missing("array data", key))?;
        let items: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(raw)
            .map_err(|e| {
                TemplaterError::Document(format!(
                    "value of '{}' is not a JSON array of objects: {}",
                    key, e
                ))
            })?;

        let template_row = t.rows.remove(1);
        for (i, row) in t.rows.iter_mut().enumerate() {
            if i == 0 {
                for run in row
                    .cells
                    .iter_mut()
                    .flat_map(|c| c.paragraphs.iter_mut())
                    .flat_map(|p| p.runs.iter_mut())
                {
                    run.text = strip_markers(&run.text);
                }
            }
            self.row(row, data, doc)?;
        }

        let mut generated = Vec::with_capacity(items.len());
        for item in items {
            let fields: BTreeMap<String, String> =
                item.into_iter().map(|(k, v)| (k, value_text(v))).collect();
            let mut row = template_row.clone();
            for run in row
                .cells
                .iter_mut()
                .flat_map(|c| c.paragraphs.iter_mut())
                .flat_map(|p| p.runs.iter_mut())
            {
                run.text = substitute(&strip_markers(&run.text), data, Some(&fields))?;
                if !self.options.preserve_formatting {
                    run.props = RunProps::default();
                }
            }
            generated.push(row);
        }
        t.rows.splice(1..1, generated);
        Ok(())
    }

    fn bind_image(&self, key: &str, data: &DataMap, doc: &mut Document) -> TemplaterResult<usize> {
        let value = data.get(key).ok_or_else(|| missing("image data", key))?;
        let path = self.resolve_image(Path::new(value));
        let bytes = self
            .fs
            .read(&path)
            .map_err(|e| TemplaterError::io(&path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| self.options.default_image_format.clone());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("image.{}", format));

        Ok(doc.add_image(ImageData {
            name,
            format,
            bytes,
        }))
    }

    /// Relative paths are looked up under the image directory first
    fn resolve_image(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let in_image_dir = self.base_dir.join(&self.options.image_dir).join(path);
        if self.fs.exists(&in_image_dir) {
            in_image_dir
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Replace `{{key}}` / `{{.key}}` in `text`, looking in `item` before `data`
fn substitute(
    text: &str,
    data: &DataMap,
    item: Option<&BTreeMap<String, String>>,
) -> TemplaterResult<String> {
    let mut missing_key: Option<String> = None;
    let out = placeholder_re().replace_all(text, |caps: &Captures<'_>| {
        let raw = caps[1].trim();
        if raw.starts_with('#') || raw.starts_with('/') || raw.starts_with("image:") || raw == "else" {
            return caps[0].to_string();
        }
        let key = raw.strip_prefix('.').unwrap_or(raw);
        match item.and_then(|i| i.get(key)).or_else(|| data.get(key)) {
            Some(value) => value.clone(),
            None => {
                missing_key.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    match missing_key {
        Some(key) => Err(missing("data", &key)),
        None => Ok(out.into_owned()),
    }
}

/// Data keys a document references: substitutions, images, conditions and
/// repeated-row sources
pub fn extract_document_placeholders(doc: &Document) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for p in doc.paragraphs() {
        let text = p.text();
        for caps in placeholder_re().captures_iter(&text) {
            let raw = caps[1].trim();
            if raw.starts_with('/') || raw == "else" {
                continue;
            }
            if let Some(key) = raw.strip_prefix("image:") {
                keys.insert(key.trim().to_string());
            } else if let Some(block) = raw.strip_prefix('#') {
                if let Some((_, key)) = block.split_once(char::is_whitespace) {
                    let key = key.trim();
                    keys.insert(key.strip_prefix('.').unwrap_or(key).to_string());
                }
            } else {
                keys.insert(raw.strip_prefix('.').unwrap_or(raw).to_string());
            }
        }
    }
    keys
}
