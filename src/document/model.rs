//! Document model shared with codecs
//!
//! A document is a list of paragraphs and tables made of runs. Codecs map
//! their native format (OOXML, ...) onto this model and back.

use serde::{Deserialize, Serialize};

/// English Metric Units per inch
pub const EMU_PER_INCH: u64 = 914_400;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub props: RunProps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
}

/// Character formatting of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunProps {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Font size in half-points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Hex RGB, e.g. `"FF0000"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

/// Drawing placed inside a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// Index into [`Document::images`]
    pub image: usize,
    pub width_emu: u64,
    pub height_emu: u64,
}

/// Image part stored in the document package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub name: String,
    pub format: String,
    pub bytes: Vec<u8>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            runs: vec![Run::new(text)],
        }
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Row {
    /// Concatenated text of every paragraph in the row
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .flat_map(|c| c.paragraphs.iter())
            .map(Paragraph::text)
            .collect()
    }
}

impl Document {
    /// Store an image part, returning its index
    pub fn add_image(&mut self, image: ImageData) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Every paragraph, including those inside table cells
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => out.push(p),
                Block::Table(t) => out.extend(
                    t.rows
                        .iter()
                        .flat_map(|r| r.cells.iter())
                        .flat_map(|c| c.paragraphs.iter()),
                ),
            }
        }
        out
    }
}
