//! Function registry for template calls
//!
//! A closed set of named pure functions, resolved when a template is
//! compiled. Plugins contribute extra entries by merging their own registry
//! into the engine's before any template is compiled.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::SecondsFormat;

/// Signature every template function implements
pub type FunctionImpl = dyn Fn(&[String]) -> Result<String, String> + Send + Sync;

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// A named function callable from a template
#[derive(Clone)]
pub struct TemplateFunction {
    name: String,
    arity: Arity,
    func: Arc<FunctionImpl>,
}

impl TemplateFunction {
    pub fn new<F>(name: impl Into<String>, arity: Arity, func: F) -> Self
    where
        F: Fn(&[String]) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, args: &[String]) -> Result<String, String> {
        (self.func)(args)
    }
}

impl fmt::Debug for TemplateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Versioned set of functions passed explicitly into compilation
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    version: u32,
    functions: BTreeMap<String, TemplateFunction>,
}

impl FunctionRegistry {
    /// Version of the built-in function set
    pub const BUILTIN_VERSION: u32 = 1;

    /// Registry with no functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in functions: `upper`, `lower`, `title`, `join`, `now`
    pub fn builtin() -> Self {
        let mut registry = Self {
            version: Self::BUILTIN_VERSION,
            functions: BTreeMap::new(),
        };
        registry
            .register(TemplateFunction::new("upper", Arity::Exact(1), |args| {
                Ok(args[0].to_uppercase())
            }))
            .register(TemplateFunction::new("lower", Arity::Exact(1), |args| {
                Ok(args[0].to_lowercase())
            }))
            .register(TemplateFunction::new("title", Arity::Exact(1), |args| {
                Ok(title_case(&args[0]))
            }))
            .register(TemplateFunction::new("join", Arity::Exact(2), |args| {
                join_json_array(&args[0], &args[1])
            }))
            .register(TemplateFunction::new("now", Arity::Exact(0), |_| {
                Ok(chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, true))
            }));
        registry
    }

    /// Add or replace a function
    pub fn register(&mut self, function: TemplateFunction) -> &mut Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    /// Add every function of `other`, replacing same-named entries, and bump
    /// the version so compiled templates can tell the sets apart
    pub fn merge(&mut self, other: &FunctionRegistry) {
        for function in other.functions.values() {
            self.register(function.clone());
        }
        if !other.functions.is_empty() {
            self.version += 1;
        }
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("version", &self.version)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Uppercase the first letter of every whitespace-separated word and
/// lowercase the rest
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_space = true;
    for ch in s.chars() {
        if prev_is_space {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        prev_is_space = ch.is_whitespace();
    }
    out
}

fn join_json_array(list: &str, sep: &str) -> Result<String, String> {
    let items: Vec<serde_json::Value> = serde_json::from_str(list)
        .map_err(|_| format!("join expects a JSON array, got '{}'", list))?;
    let parts: Vec<String> = items
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();
    Ok(parts.join(sep))
}
