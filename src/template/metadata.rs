//! Template metadata block
//!
//! The first `{{/* ... */}}` comment of a template may carry YAML:
//!
//! ```text
//! {{/*
//! name: invoice
//! depends_on: [header.tmpl]
//! required_keys: [customer, total]
//! */}}
//! ```
//!
//! A comment that is not a YAML mapping is treated as a plain comment.

use serde::{Deserialize, Serialize};

use crate::error::{TemplaterError, TemplaterResult};

use super::lexer::{tokenize, Token};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateMetadata {
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    pub depends_on: Vec<String>,
    pub required_keys: Vec<String>,
}

/// Parse the metadata block of `source`, if it has one
pub fn parse_metadata(name: &str, source: &str) -> TemplaterResult<Option<TemplateMetadata>> {
    let tokens = tokenize(source).map_err(|(line, message)| TemplaterError::TemplateSyntax {
        name: name.to_string(),
        line,
        message,
    })?;

    let Some((body, line)) = tokens.into_iter().find_map(|t| match t {
        Token::Comment { body, line } => Some((body, line)),
        _ => None,
    }) else {
        return Ok(None);
    };

    let value: serde_yaml_ng::Value = match serde_yaml_ng::from_str(body) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    if !value.is_mapping() {
        return Ok(None);
    }

    serde_yaml_ng::from_value(value)
        .map(Some)
        .map_err(|e| TemplaterError::TemplateSyntax {
            name: name.to_string(),
            line,
            message: format!("invalid metadata: {}", e),
        })
}
