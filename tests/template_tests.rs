// ABOUTME: Integration tests for manifest rendering and parameter typing
// ABOUTME: Exercises utilities, choices, type conversion and yaml loading through full scaffold runs

use serde_json::json;
use tempfile::TempDir;

use xscaffold::engine::{ScaffoldContext, ScaffoldEngine, ScaffoldOptions};
use xscaffold::template;

mod common;
use common::{PackageBuilder, TestRuntime};

async fn run(package: &PackageBuilder, runtime: &TestRuntime) -> ScaffoldContext {
    let mut context =
        ScaffoldContext::new().with_environ([("HOME".to_string(), "/home/dev".to_string())]);
    ScaffoldEngine::new()
        .execute_scaffold(&mut context, ScaffoldOptions::new(package.package()), runtime)
        .await
        .unwrap();
    context
}

#[tokio::test]
async fn test_typed_parameters_and_choices() {
    let package = PackageBuilder::new().manifest(
        r#"
parameters:
  - name: replicas
    type: int
  - name: public
    type: bool
  - name: tier
    description: Service tier
    choices:
      - keywords: [s, small]
        text: Small instance
        value: t3.small
      - keywords: [l, large]
        text: Large instance
        value: m5.large
  - name: workdir
    default: "{env[HOME]}/src"
steps:
  - note: "{{context.replicas}} {{context.public}} {{context.tier}} {{context.workdir}}"
"#,
    );

    let runtime = TestRuntime::with_answers(&["3", "yes", "medium", "l", ""]);
    let context = run(&package, &runtime).await;

    assert_eq!(context["replicas"], 3);
    assert_eq!(context["public"], true);
    assert_eq!(context["tier"], "m5.large");
    assert_eq!(context["workdir"], "/home/dev/src");
    assert_eq!(context.notes, vec!["3 true m5.large /home/dev/src"]);
    assert!(runtime.logs().iter().any(|l| l.starts_with("[invalid choice]")));
}

#[tokio::test]
async fn test_validation_pattern_and_yaml_load() {
    let package = PackageBuilder::new()
        .manifest(
            r#"
parameters:
  - name: slug
    validate: "[a-z-]+$"
  - name: settings
    load: yaml
steps:
  - note: "{{context.slug}} {{context.settings.port}}"
"#,
        )
        .file("settings.yaml", "port: 8080\n");

    let settings_path = package.path().join("settings.yaml");
    let settings_answer = settings_path.to_string_lossy().to_string();
    let runtime = TestRuntime::with_answers(&["Bad Slug", "good-slug", &settings_answer]);
    let context = run(&package, &runtime).await;

    assert_eq!(context["slug"], "good-slug");
    assert_eq!(context["settings"], json!({"port": 8080}));
    assert_eq!(context.notes, vec!["good-slug 8080"]);
    assert!(runtime.logs().iter().any(|l| l.starts_with("[invalid")));
}

#[tokio::test]
async fn test_utilities_inside_steps() {
    let package = PackageBuilder::new()
        .manifest(
            r#"
context:
  hosts: [alpha, beta]
steps:
  - note: "spec {{#with (utils \"read_yaml\" context.spec_path)}}{{name}}{{/with}}"
  - note: "{{#each (formatlist context.hosts \"{index}:{value}\")}}{{this}} {{/each}}"
  - note: "{{json context.hosts}}"
"#,
        )
        .file("spec.yaml", "name: demo\n");

    let mut context = ScaffoldContext::from_values([(
        "spec_path".to_string(),
        json!(package.path().join("spec.yaml").to_string_lossy()),
    )]);
    ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(package.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap();

    assert_eq!(context.notes[0], "spec demo");
    assert_eq!(context.notes[1], "0:alpha 1:beta ");
    assert_eq!(context.notes[2], r#"["alpha","beta"]"#);
}

#[test]
fn test_render_file_with_sibling_partial() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("license"), "MIT {{context.owner}}").unwrap();
    std::fs::write(dir.path().join("README.md"), "{{> license}}").unwrap();

    let context = ScaffoldContext::from_values([("owner".to_string(), json!("acme"))]);
    let rendered = template::render_file(&dir.path().join("README.md"), &context).unwrap();

    assert_eq!(rendered, "MIT acme");
}
