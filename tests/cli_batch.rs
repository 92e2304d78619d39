mod common;

use common::TestEnv;

#[test]
fn test_batch_renders_directory_into_output_dir() {
    let env = TestEnv::new();
    env.write("templates/a.txt.tmpl", "A for {{.name}}");
    env.write("templates/nested/b.tmpl", "B for {{.name}}");
    env.write("templates/logo.png", "not a template");

    let result = env.run(&["batch", "templates", "--set", "name=Ada", "-o", "build", "-w", "2"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(env.read("build/a.txt"), "A for Ada");
    assert_eq!(env.read("build/nested/b"), "B for Ada");
    assert!(!env.exists("build/logo.png"));
    assert!(result.stdout.contains("2 rendered, 0 failed"), "{}", result.stdout);
}

#[test]
fn test_batch_partial_failure_exits_nonzero_but_writes_successes() {
    let env = TestEnv::new();
    env.write("t/good.tmpl", "ok {{.name}}");
    env.write("t/bad.tmpl", "needs {{.missing}}");

    let result = env.run(&["batch", "t", "--set", "name=Ada", "-o", "out"]);

    assert!(!result.success);
    assert_eq!(env.read("out/good"), "ok Ada");
    assert!(!env.exists("out/bad"));
    assert!(result.stderr.contains("1 template(s) failed"), "{}", result.combined_output());
    assert!(result.stderr.contains("bad.tmpl"), "{}", result.combined_output());
}

#[test]
fn test_batch_json_reports_stats() {
    let env = TestEnv::new();
    env.write("one.tmpl", "1");
    env.write("two.tmpl", "2");

    let result = env.run(&["batch", "one.tmpl", "two.tmpl", "--json", "-w", "3"]);

    assert!(result.success, "{}", result.combined_output());
    let json = result.json();
    assert_eq!(json["event"], "batch");
    assert_eq!(json["rendered"], 2);
    assert_eq!(json["stats"]["worker_count"], 3);
    assert_eq!(json["stats"]["template_count"], 2);
    assert_eq!(json["stats"]["error_count"], 0);
}

#[test]
fn test_batch_uses_project_config_extensions() {
    let env = TestEnv::new();
    env.write(".templater.toml", "[batch]\nextensions = [\"page\"]\n");
    env.write("site/index.page", "home");
    env.write("site/skip.tmpl", "skip");

    let result = env.run(&["batch", "site", "-o", "public"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(env.read("public/index.page"), "home");
    assert!(!env.exists("public/skip"));
}

#[test]
fn test_batch_with_no_templates_fails() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.path("empty")).unwrap();

    let result = env.run(&["batch", "empty"]);

    assert!(!result.success);
    assert!(result.stderr.contains("no templates found"));
}
