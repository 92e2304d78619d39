mod common;

use common::TestEnv;

#[test]
fn test_keys_lists_references() {
    let env = TestEnv::new();
    env.write("t.tmpl", "Hi {{.name}}, you are {{.age}}");

    let result = env.run(&["keys", "t.tmpl"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(result.stdout, "age\nname\n");
}

#[test]
fn test_keys_json() {
    let env = TestEnv::new();
    env.write("t.tmpl", "{{.b}}{{.a}}");

    let json = env.run(&["keys", "t.tmpl", "--json"]).json();

    assert_eq!(json["keys"], serde_json::json!(["a", "b"]));
}

#[test]
fn test_check_reports_metadata() {
    let env = TestEnv::new();
    env.write("header.tmpl", "header");
    env.write(
        "invoice.tmpl",
        "{{/*\nname: invoice\nversion: \"2\"\ndepends_on: [header.tmpl]\n*/}}Total {{.total}}",
    );

    let result = env.run(&["check", "invoice.tmpl", "--set", "total=10"]);

    assert!(result.success, "{}", result.combined_output());
    assert!(result.stdout.contains("invoice.tmpl is valid"));
    assert!(result.stdout.contains("name: invoice"));
    assert!(result.stdout.contains("depends on: header.tmpl"));
}

#[test]
fn test_check_missing_dependency() {
    let env = TestEnv::new();
    env.write("t.tmpl", "{{/*\ndepends_on: [gone.tmpl]\n*/}}x");

    let result = env.run(&["check", "t.tmpl"]);

    assert!(!result.success);
    assert!(result.stderr.contains("gone.tmpl"), "{}", result.combined_output());
}

#[test]
fn test_check_syntax_error() {
    let env = TestEnv::new();
    env.write("t.tmpl", "line one\n{{#if .x}}never closed");

    let result = env.run(&["check", "t.tmpl"]);

    assert!(!result.success);
    assert!(
        result.stderr.contains("at line 2: unclosed {{#if}} block"),
        "{}",
        result.combined_output()
    );
}

#[test]
fn test_diff_shows_changes_without_writing() {
    let env = TestEnv::new();
    env.write("t.tmpl", "Hello {{.name}}\nbye\n");
    env.write("out.txt", "Hello Ada\nbye\n");

    let result = env.run(&["diff", "t.tmpl", "-o", "out.txt", "--set", "name=Grace"]);

    assert!(result.success, "{}", result.combined_output());
    assert!(result.stdout.contains("-Hello Ada"));
    assert!(result.stdout.contains("+Hello Grace"));
    assert_eq!(env.read("out.txt"), "Hello Ada\nbye\n");
}

#[test]
fn test_diff_up_to_date() {
    let env = TestEnv::new();
    env.write("t.tmpl", "same");
    env.write("out.txt", "same");

    let result = env.run(&["diff", "t.tmpl", "-o", "out.txt", "--json"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(result.json()["changed"], false);
}

#[test]
fn test_restore_brings_back_previous_output() {
    let env = TestEnv::new();
    env.write("t.tmpl", "{{.v}}");

    assert!(env.run(&["render", "t.tmpl", "--set", "v=first", "-o", "out.txt"]).success);
    assert!(env.run(&["render", "t.tmpl", "--set", "v=second", "-o", "out.txt"]).success);
    assert_eq!(env.read("out.txt"), "second");

    let listed = env.run(&["restore", "out.txt", "--list", "--json"]).json();
    assert_eq!(listed["backups"].as_array().unwrap().len(), 1);

    let result = env.run(&["restore", "out.txt"]);
    assert!(result.success, "{}", result.combined_output());
    assert_eq!(env.read("out.txt"), "first");
}

#[test]
fn test_restore_without_backups_fails() {
    let env = TestEnv::new();

    let result = env.run(&["restore", "nothing.txt"]);

    assert!(!result.success);
    assert!(result.stderr.contains("no backups found"), "{}", result.combined_output());
}

#[test]
fn test_unknown_config_key_warns_on_stderr() {
    let env = TestEnv::new();
    env.write(".templater.toml", "[cache]\ncapcity = 5\n");
    env.write("t.tmpl", "ok");

    let result = env.run(&["render", "t.tmpl"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(result.stdout, "ok");
    assert!(
        result.stderr.contains("did you mean 'capacity'?"),
        "{}",
        result.combined_output()
    );
}
