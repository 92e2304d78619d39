//! Executes a parsed node tree against a data map

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{is_truthy, DataMap};

use super::parser::{Command, Node, Pipeline, Term};

/// Execution failure: line and message
pub(crate) type ExecError = (usize, String);

/// Current `{{#each}}` element
struct Item {
    value: String,
    fields: BTreeMap<String, String>,
    index: usize,
}

struct Scope<'a> {
    root: &'a DataMap,
    item: Option<&'a Item>,
}

impl Scope<'_> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.item
            .and_then(|item| item.fields.get(key))
            .or_else(|| self.root.get(key))
            .map(String::as_str)
    }
}

pub(crate) fn execute(nodes: &[Node], data: &DataMap) -> Result<String, ExecError> {
    let mut out = String::new();
    let scope = Scope {
        root: data,
        item: None,
    };
    write_nodes(nodes, &scope, &mut out)?;
    Ok(out)
}

fn write_nodes(nodes: &[Node], scope: &Scope<'_>, out: &mut String) -> Result<(), ExecError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(pipeline) => out.push_str(&eval_required(pipeline, scope)?),
            Node::Image { key, line } => {
                let path = scope
                    .lookup(key)
                    .ok_or_else(|| (*line, format!("missing key '{}'", key)))?;
                out.push_str(path);
            }
            Node::Conditional {
                negate,
                cond,
                then,
                otherwise,
            } => {
                let value = eval(cond, scope)?;
                let truthy = is_truthy(value.as_deref());
                let branch = if truthy != *negate { then } else { otherwise };
                write_nodes(branch, scope, out)?;
            }
            Node::Each {
                source,
                body,
                otherwise,
            } => {
                let list = eval_required(source, scope)?;
                let items = parse_items(&list).map_err(|msg| (source.line, msg))?;
                if items.is_empty() {
                    write_nodes(otherwise, scope, out)?;
                }
                for item in &items {
                    let inner = Scope {
                        root: scope.root,
                        item: Some(item),
                    };
                    write_nodes(body, &inner, out)?;
                }
            }
        }
    }
    Ok(())
}

fn parse_items(list: &str) -> Result<Vec<Item>, String> {
    let values: Vec<Value> = serde_json::from_str(list)
        .map_err(|_| format!("{{{{#each}}}} needs a JSON array, got '{}'", list))?;

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(map) => {
                let text = Value::Object(map.clone()).to_string();
                let fields = map.into_iter().map(|(k, v)| (k, value_text(v))).collect();
                Item {
                    value: text,
                    fields,
                    index,
                }
            }
            other => Item {
                value: value_text(other),
                fields: BTreeMap::new(),
                index,
            },
        })
        .collect())
}

/// Strings as-is, everything else as JSON text
pub(crate) fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn eval_required(pipeline: &Pipeline, scope: &Scope<'_>) -> Result<String, ExecError> {
    eval(pipeline, scope)?.ok_or_else(|| {
        let key = match pipeline.stages.first() {
            Some(Command::Value(Term::Key(k))) => k.as_str(),
            _ => "?",
        };
        (pipeline.line, format!("missing key '{}'", key))
    })
}

/// `Ok(None)` only when the pipeline is a single missing key
fn eval(pipeline: &Pipeline, scope: &Scope<'_>) -> Result<Option<String>, ExecError> {
    let line = pipeline.line;
    let mut current: Option<String> = None;

    for (i, stage) in pipeline.stages.iter().enumerate() {
        match stage {
            Command::Value(term) => {
                current = resolve(term, scope, line)?;
                if current.is_none() {
                    return Ok(None);
                }
            }
            Command::Call { func, args } => {
                let mut values = args
                    .iter()
                    .map(|t| {
                        resolve(t, scope, line)?
                            .ok_or_else(|| (line, format!("missing key '{}'", term_name(t))))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if i > 0 {
                    values.extend(current.take());
                }
                let result = func
                    .call(&values)
                    .map_err(|msg| (line, format!("{}: {}", func.name(), msg)))?;
                current = Some(result);
            }
        }
    }

    Ok(current)
}

fn term_name(term: &Term) -> &str {
    match term {
        Term::Key(k) => k,
        Term::Current => ".",
        Term::Index => "@index",
        Term::Literal(s) => s,
    }
}

fn resolve(term: &Term, scope: &Scope<'_>, line: usize) -> Result<Option<String>, ExecError> {
    match term {
        Term::Key(key) => Ok(scope.lookup(key).map(str::to_string)),
        Term::Literal(s) => Ok(Some(s.clone())),
        Term::Current => scope
            .item
            .map(|item| Some(item.value.clone()))
            .ok_or_else(|| (line, "'.' used outside {{#each}}".to_string())),
        Term::Index => scope
            .item
            .map(|item| Some(item.index.to_string()))
            .ok_or_else(|| (line, "'@index' used outside {{#each}}".to_string())),
    }
}
