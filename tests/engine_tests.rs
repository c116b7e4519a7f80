// ABOUTME: Integration tests for the scaffold execution engine
// ABOUTME: Tests manifests end to end: parameters, steps, nested packages and acquisition

use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use xscaffold::engine::{
    EngineSettings, ScaffoldContext, ScaffoldEngine, ScaffoldError, ScaffoldOptions, TARGET_KEY,
};

mod common;
use common::{FakeFetcher, PackageBuilder, TestRuntime};

fn targeted_context(target: &TempDir) -> ScaffoldContext {
    ScaffoldContext::from_values([(
        TARGET_KEY.to_string(),
        json!(target.path().to_string_lossy()),
    )])
}

#[tokio::test]
async fn test_prompts_render_into_notes() {
    let package = PackageBuilder::new().manifest(
        r#"
parameters:
  - name: fname
    description: First name
    required: true
  - name: lname
    default: doe
steps:
  - note: "hello {{context.fname}} {{context.lname}}"
  - todo: "greet {{context.fname}}"
"#,
    );

    let runtime = TestRuntime::with_answers(&["", "john", ""]);
    let mut context = ScaffoldContext::new();

    ScaffoldEngine::new()
        .execute_scaffold(&mut context, ScaffoldOptions::new(package.package()), &runtime)
        .await
        .unwrap();

    assert_eq!(context["fname"], "john");
    assert_eq!(context["lname"], "doe");
    assert_eq!(context.notes, vec!["hello john doe"]);
    assert_eq!(context.todos, vec!["greet john"]);
    assert_eq!(runtime.asked(), vec!["fname", "fname", "lname"]);
    assert!(runtime.logs().iter().any(|l| l.starts_with("[required]")));
}

#[tokio::test]
async fn test_bound_parameters_are_not_asked_again() {
    let package = PackageBuilder::new().manifest(
        "parameters:\n  - name: project\nsteps:\n  - note: \"{{context.project}}\"\n",
    );

    let runtime = TestRuntime::new();
    let mut context = ScaffoldContext::from_values([("project".to_string(), json!("preset"))]);

    let engine = ScaffoldEngine::new();
    for _ in 0..2 {
        engine
            .execute_scaffold(&mut context, ScaffoldOptions::new(package.package()), &runtime)
            .await
            .unwrap();
    }

    assert!(runtime.asked().is_empty());
    assert_eq!(context.notes, vec!["preset", "preset"]);
}

#[tokio::test]
async fn test_unknown_step_aborts() {
    let package =
        PackageBuilder::new().manifest("steps:\n  - note: before\n  - teleport: {}\n  - note: after\n");
    let mut context = ScaffoldContext::new();

    let err = ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(package.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ScaffoldError::UnknownStep { ref name } if name == "teleport"));
    assert_eq!(context.notes, vec!["before"]);
}

#[tokio::test]
async fn test_missing_manifest_fetches_whole_package() {
    let package = PackageBuilder::new()
        .file("README.md", "# {{context.title}}")
        .file("docs/guide.txt", "guide");
    let target = TempDir::new().unwrap();
    let mut context = targeted_context(&target);
    context.set("title", "demo");

    ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(package.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap();

    // copied, not rendered
    assert_eq!(
        fs::read_to_string(target.path().join("README.md")).unwrap(),
        "# {{context.title}}"
    );
    assert!(target.path().join("docs/guide.txt").exists());
}

#[tokio::test]
async fn test_fetch_and_shell_steps() {
    let package = PackageBuilder::new()
        .manifest(
            r#"
context:
  name: demo
steps:
  - fetch:
      source: template
      target: "{{context.name}}"
      templates: ["*.toml"]
  - shell:
      script: "echo built > marker.txt"
      working_dir: "{{context.name}}"
"#,
        )
        .file("template/Cargo.toml", "[package]\nname = \"{{context.name}}\"\n");
    let target = TempDir::new().unwrap();
    let mut context = targeted_context(&target);

    ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(package.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap();

    let out = target.path().join("demo");
    assert_eq!(
        fs::read_to_string(out.join("Cargo.toml")).unwrap(),
        "[package]\nname = \"demo\"\n"
    );
    assert_eq!(fs::read_to_string(out.join("marker.txt")).unwrap().trim(), "built");
}

#[tokio::test]
async fn test_failing_shell_stops_the_run() {
    let package = PackageBuilder::new()
        .manifest("steps:\n  - shell: \"exit 3\"\n  - note: unreachable\n");
    let target = TempDir::new().unwrap();
    let mut context = targeted_context(&target);

    let err = ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(package.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ScaffoldError::StepFailed { .. }));
    assert!(context.notes.is_empty());
}

#[tokio::test]
async fn test_nested_scaffold_restores_package() {
    let inner = PackageBuilder::new()
        .manifest("steps:\n  - note: \"inner sees {{context.__package.path}}\"\n");
    let outer = PackageBuilder::new().manifest(&format!(
        "steps:\n  - scaffold:\n      package: \"{}\"\n  - note: \"outer sees {{{{context.__package.path}}}}\"\n",
        inner.package()
    ));

    let mut context = ScaffoldContext::new();
    ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(outer.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        context.notes,
        vec![
            format!("inner sees {}", inner.package()),
            format!("outer sees {}", outer.package()),
        ]
    );
    assert_eq!(context.package().unwrap().path, outer.package());
}

#[tokio::test]
async fn test_private_nested_notes_follow_plugin_config() {
    let inner = PackageBuilder::new().manifest("steps:\n  - note: from child\n");
    let outer = PackageBuilder::new().manifest(&format!(
        "plugins:\n  scaffold:\n    propagate_notes: true\nsteps:\n  - scaffold:\n      package: \"{}\"\n      context:\n        isolated: true\n",
        inner.package()
    ));

    let mut context = ScaffoldContext::new();
    ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(outer.package()),
            &TestRuntime::new(),
        )
        .await
        .unwrap();

    assert_eq!(context.notes, vec!["from child"]);
    assert!(!context.contains_key("isolated"));
}

#[tokio::test]
async fn test_remote_package_goes_through_fetcher() {
    let cached = PackageBuilder::new().manifest("steps:\n  - note: fetched\n");
    let cache_root = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher::serving(cached.path()));

    let settings = EngineSettings {
        url_base: "https://git.example".to_string(),
        temp_dir: cache_root.path().to_path_buf(),
        ..EngineSettings::default()
    };
    let engine = ScaffoldEngine::with_settings(settings).with_fetcher(fetcher.clone());

    let runtime = TestRuntime::new();
    let mut context = ScaffoldContext::new();
    engine
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new("acme/not-on-disk").with_version("v2"),
            &runtime,
        )
        .await
        .unwrap();

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url_base, "https://git.example");
    assert_eq!(requests[0].version, "v2");
    assert_eq!(
        requests[0].cache_dir(),
        cache_root.path().join("acme/not-on-disk@v2")
    );
    assert_eq!(context.notes, vec!["fetched"]);
}

#[tokio::test]
async fn test_acquisition_failures_respect_strict_mode() {
    let cached = PackageBuilder::new().manifest("steps:\n  - note: stale copy\n");

    let lenient = ScaffoldEngine::new()
        .with_fetcher(Arc::new(FakeFetcher::failing(cached.path(), "Failed to load version v9")));
    let mut context = ScaffoldContext::new();
    lenient
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new("acme/missing"),
            &TestRuntime::new(),
        )
        .await
        .unwrap();
    assert_eq!(context.notes, vec!["stale copy"]);

    let strict = ScaffoldEngine::with_settings(EngineSettings {
        strict_acquisition: true,
        ..EngineSettings::default()
    })
    .with_fetcher(Arc::new(FakeFetcher::failing(cached.path(), "Failed to load version v9")));
    let err = strict
        .execute_scaffold(
            &mut ScaffoldContext::new(),
            ScaffoldOptions::new("acme/missing"),
            &TestRuntime::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScaffoldError::Acquisition { .. }));
}

#[tokio::test]
async fn test_custom_manifest_name_and_disabled_steps() {
    let package = PackageBuilder::new().with_manifest_name("service").manifest(
        r#"
context:
  ci: false
steps:
  - note:
      message: always
  - note:
      message: ci only
      enabledif:
        value: "{{context.ci}}"
        equals: "true"
  - context:
      finished: true
"#,
    );

    let mut context = ScaffoldContext::new();
    ScaffoldEngine::new()
        .execute_scaffold(
            &mut context,
            ScaffoldOptions::new(package.package()).with_name("service"),
            &TestRuntime::new(),
        )
        .await
        .unwrap();

    assert_eq!(context.notes, vec!["always"]);
    assert_eq!(context["finished"], true);
}
