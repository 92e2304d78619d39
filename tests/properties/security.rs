//! Property tests for the security gate.

use std::path::{Component, PathBuf};

use proptest::prelude::*;

use templater::security::{
    sanitize_path, sanitize_value, screen_output_path, validate_template_content,
};

const INJECTION: &[&str] = &["`", "$(", "&&", "||", ";"];

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a sanitized value contains no injection sequence.
    #[test]
    fn property_sanitize_value_removes_all_sequences(value in "[a-z$(&|;` ]{0,40}") {
        let clean = sanitize_value(&value);
        for seq in INJECTION {
            prop_assert!(!clean.contains(seq), "{:?} -> {:?} still has {:?}", value, clean, seq);
        }
    }

    /// PROPERTY: sanitizing is idempotent and only ever removes characters.
    #[test]
    fn property_sanitize_value_idempotent(value in "\\PC{0,40}") {
        let once = sanitize_value(&value);
        prop_assert_eq!(sanitize_value(&once), once.clone());
        prop_assert!(once.len() <= value.len());
    }

    /// PROPERTY: content validation returns a verdict for any input.
    #[test]
    fn property_validate_content_never_panics(content in "\\PC{0,200}") {
        let _ = validate_template_content(&content);
    }

    /// PROPERTY: plain words outside the denylist always pass.
    #[test]
    fn property_benign_words_pass(words in proptest::collection::vec("(alpha|beta|gamma|invoice|total|[0-9]{1,4})", 0..12)) {
        prop_assert!(validate_template_content(&words.join(" ")).is_ok());
    }

    /// PROPERTY: sanitized paths are relative and made of named segments only.
    #[test]
    fn property_sanitize_path_only_normal_components(raw in "[a-z./\\\\]{0,40}") {
        let clean = sanitize_path(&raw);
        prop_assert!(clean.is_relative());
        for component in clean.components() {
            prop_assert!(matches!(component, Component::Normal(_)), "{:?} -> {:?}", raw, clean);
        }
    }

    /// PROPERTY: any path with a `..` segment is rejected.
    #[test]
    fn property_traversal_always_rejected(
        before in proptest::collection::vec("[a-z]{1,6}", 0..4),
        after in proptest::collection::vec("[a-z]{1,6}", 0..4),
    ) {
        let mut path = PathBuf::new();
        path.extend(&before);
        path.push("..");
        path.extend(&after);
        prop_assert!(screen_output_path(&path).is_err());
    }
}
