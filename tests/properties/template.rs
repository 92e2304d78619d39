//! Property tests for the template language.

use proptest::prelude::*;

use templater::template::{scan_keys, FunctionRegistry, Template};
use templater::DataMap;

fn literal() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 .,:\\n-]{0,20}").unwrap()
}

fn key() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,8}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: compiling and rendering arbitrary brace soup never panics.
    #[test]
    fn property_compile_and_render_never_panic(source in "[a-z{}#/. |@*\"]{0,80}") {
        let registry = FunctionRegistry::builtin();
        if let Ok(template) = Template::compile("fuzz.tmpl", &source, &registry) {
            let _ = template.render(&DataMap::new());
        }
    }

    /// PROPERTY: the key scanner never panics, even on unbalanced braces.
    #[test]
    fn property_scan_keys_never_panics(source in "\\PC{0,120}") {
        let _ = scan_keys(&source);
    }

    /// PROPERTY: literal text interleaved with references renders to the
    /// text with each reference replaced by its value, and the scanner
    /// finds exactly those references.
    #[test]
    fn property_substitution(
        parts in proptest::collection::vec((literal(), key(), "[A-Za-z0-9 ]{0,12}"), 1..6),
        tail in literal(),
    ) {
        let mut data = DataMap::new();
        for (_, k, v) in &parts {
            data.entry(k.clone()).or_insert_with(|| v.clone());
        }

        let mut source = String::new();
        let mut expected = String::new();
        for (text, k, _) in &parts {
            source.push_str(text);
            source.push_str(&format!("{{{{.{}}}}}", k));
            expected.push_str(text);
            expected.push_str(&data[k]);
        }
        source.push_str(&tail);
        expected.push_str(&tail);

        let template = Template::compile("gen.tmpl", &source, &FunctionRegistry::builtin()).unwrap();
        prop_assert_eq!(template.render(&data).unwrap(), expected);

        let keys: Vec<String> = scan_keys(&source).into_iter().collect();
        let wanted: Vec<String> = data.keys().cloned().collect();
        prop_assert_eq!(keys, wanted);
    }
}
