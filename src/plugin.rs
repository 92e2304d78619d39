//! Plugin capability interface
//!
//! Loading and discovery live outside the crate; a host builds plugin values
//! and hands them to [`crate::engine::RenderEngineBuilder::plugin`].

use crate::error::TemplaterResult;
use crate::template::FunctionRegistry;

pub trait TemplatePlugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Post-process rendered output; plugins run in registration order
    fn process_template(&self, text: &str) -> TemplaterResult<String>;

    /// Extra functions made available to templates
    fn template_functions(&self) -> FunctionRegistry {
        FunctionRegistry::empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::template::{Arity, TemplateFunction};

    /// Uppercases rendered output and adds a `shout` function
    pub(crate) struct UppercasePlugin;

    impl TemplatePlugin for UppercasePlugin {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn process_template(&self, text: &str) -> TemplaterResult<String> {
            Ok(text.to_uppercase())
        }

        fn template_functions(&self) -> FunctionRegistry {
            let mut registry = FunctionRegistry::empty();
            registry.register(TemplateFunction::new("shout", Arity::Exact(1), |args| {
                Ok(format!("{}!", args[0]))
            }));
            registry
        }
    }

    /// Wraps output in brackets, to observe plugin ordering
    pub(crate) struct BracketPlugin;

    impl TemplatePlugin for BracketPlugin {
        fn name(&self) -> &str {
            "bracket"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn process_template(&self, text: &str) -> TemplaterResult<String> {
            Ok(format!("[{}]", text))
        }
    }
}
