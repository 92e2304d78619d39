//! Placeholder template language
//!
//! Templates are compiled once against a [`FunctionRegistry`] and then
//! executed any number of times against a [`DataMap`]:
//!
//! ```text
//! Dear {{title .name}},
//! {{#each items}}- {{.label}} ({{@index}}){{else}}nothing{{/each}}
//! {{#if .paid}}Paid{{else}}Due: {{.total}}{{/if}}
//! ```

mod exec;
mod functions;
mod keys;
mod lexer;
mod metadata;
mod parser;

use std::sync::Arc;

pub use functions::{title_case, Arity, FunctionImpl, FunctionRegistry, TemplateFunction};
pub use keys::scan_keys;
pub use metadata::{parse_metadata, TemplateMetadata};

pub(crate) use exec::value_text;

use crate::error::{TemplaterError, TemplaterResult};
use crate::models::DataMap;

use parser::Node;

/// A compiled template
#[derive(Debug)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
    registry_version: u32,
}

impl Template {
    /// Compile `source`, resolving every function call against `registry`
    pub fn compile(name: &str, source: &str, registry: &FunctionRegistry) -> TemplaterResult<Self> {
        let nodes =
            parser::parse(source, registry).map_err(|(line, message)| {
                TemplaterError::TemplateSyntax {
                    name: name.to_string(),
                    line,
                    message,
                }
            })?;

        Ok(Self {
            name: name.to_string(),
            nodes,
            registry_version: registry.version(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version of the function registry this template was compiled against
    pub fn registry_version(&self) -> u32 {
        self.registry_version
    }

    /// Execute against `data`; a referenced key absent from `data` is an error
    pub fn render(&self, data: &DataMap) -> TemplaterResult<String> {
        exec::execute(&self.nodes, data).map_err(|(line, message)| TemplaterError::Render {
            name: self.name.clone(),
            message: format!("line {}: {}", line, message),
        })
    }
}

/// Compiled templates are shared between the cache and concurrent renders
pub type SharedTemplate = Arc<Template>;
