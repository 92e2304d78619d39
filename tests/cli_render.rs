mod common;

use common::TestEnv;

#[test]
fn test_render_to_stdout() {
    let env = TestEnv::new();
    env.write("greet.tmpl", "Hello {{.name | upper}}!");
    env.write("data.json", r#"{"name": "Ada"}"#);

    let result = env.run(&["render", "greet.tmpl", "-d", "data.json"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(result.stdout, "Hello ADA!");
}

#[test]
fn test_render_set_overrides_data_file() {
    let env = TestEnv::new();
    env.write("greet.tmpl", "{{.greeting}} {{.name}}");
    env.write("data.yaml", "greeting: Hi\nname: Ada\n");

    let result = env.run(&["render", "greet.tmpl", "-d", "data.yaml", "--set", "name=Grace"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(result.stdout, "Hi Grace");
}

#[test]
fn test_render_writes_output_with_backup() {
    let env = TestEnv::new();
    env.write("greet.tmpl", "Hello {{.name}}");
    env.write("out/greet.txt", "previous");

    let result = env.run(&["render", "greet.tmpl", "--set", "name=Ada", "-o", "out/greet.txt"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(env.read("out/greet.txt"), "Hello Ada");
    let backups: Vec<_> = std::fs::read_dir(env.path("out/.templater_backups"))
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(backups[0].path()).unwrap(), "previous");
}

#[test]
fn test_render_json_output() {
    let env = TestEnv::new();
    env.write("t.tmpl", "x={{.x}}");

    let result = env.run(&["render", "t.tmpl", "--set", "x=1", "--json"]);

    assert!(result.success, "{}", result.combined_output());
    let json = result.json();
    assert_eq!(json["event"], "render");
    assert_eq!(json["content"], "x=1");
}

#[test]
fn test_render_missing_key_fails() {
    let env = TestEnv::new();
    env.write("t.tmpl", "Hello {{.name}}");

    let result = env.run(&["render", "t.tmpl"]);

    assert!(!result.success);
    assert!(
        result.stderr.contains("missing key 'name'"),
        "{}",
        result.combined_output()
    );
}

#[test]
fn test_render_validate_lists_missing_keys() {
    let env = TestEnv::new();
    env.write("t.tmpl", "{{.b}} {{.a}}");

    let result = env.run(&["render", "t.tmpl", "--validate"]);

    assert!(!result.success);
    assert!(
        result.stderr.contains("missing required data keys: a, b"),
        "{}",
        result.combined_output()
    );
}

#[test]
fn test_render_rejects_dangerous_template() {
    let env = TestEnv::new();
    env.write("evil.tmpl", "{{exec 'rm -rf /'}}");

    let result = env.run(&["render", "evil.tmpl", "-o", "out.txt"]);

    assert!(!result.success);
    assert!(result.stderr.contains("unsafe template content"), "{}", result.combined_output());
    assert!(!env.exists("out.txt"));
}

#[test]
fn test_render_rejects_traversal_output() {
    let env = TestEnv::new();
    env.write("t.tmpl", "fine");

    let result = env.run(&["render", "t.tmpl", "-o", "sub/../../escape.txt"]);

    assert!(!result.success);
    assert!(result.stderr.contains("path traversal"), "{}", result.combined_output());
}

#[test]
fn test_render_document_model() {
    let env = TestEnv::new();
    env.write(
        "letter.json",
        r#"{"blocks": [{"type": "paragraph", "runs": [{"text": "Dear {{name}}"}]}]}"#,
    );

    let result = env.run(&["render", "letter.json", "--document", "--set", "name=Ada"]);

    assert!(result.success, "{}", result.combined_output());
    let doc: serde_json::Value = serde_json::from_str(&result.stdout).unwrap();
    assert_eq!(doc["blocks"][0]["runs"][0]["text"], "Dear Ada");
}
