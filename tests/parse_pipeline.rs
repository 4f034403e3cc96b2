use std::collections::HashMap;

use compose_kit::{parse_with_options, IssueSeverity, ParseOptions, Stage};

fn options_with_files(files: &[(&str, &str)]) -> ParseOptions {
    ParseOptions {
        files: files
            .iter()
            .map(|(path, text)| ((*path).to_string(), (*text).to_string()))
            .collect(),
        ..Default::default()
    }
}

fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
    vars.iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

#[test]
fn supplied_environment_wins_over_env_file() {
    let mut options = options_with_files(&[(".env", "TAG=from-file\n")]);
    options.environment = env(&[("TAG", "from-env")]);

    let result =
        parse_with_options("services:\n  web:\n    image: app:${TAG}\n", &options).unwrap();
    assert_eq!(
        result.document.services["web"].image.as_deref(),
        Some("app:from-env")
    );
    assert_eq!(result.variables, vec!["TAG"]);
    assert!(result.undefined_variables.is_empty());
}

#[test]
fn env_file_supplies_missing_values() {
    let options = options_with_files(&[(".env", "TAG=8.3\n")]);
    let result =
        parse_with_options("services:\n  web:\n    image: app:${TAG}\n", &options).unwrap();
    assert_eq!(result.document.services["web"].image.as_deref(), Some("app:8.3"));
}

#[test]
fn undefined_variable_defaults_to_empty_and_is_listed() {
    let result = parse_with_options(
        "services:\n  web:\n    image: nginx\n    user: \"${RUN_AS}\"\n",
        &ParseOptions::default(),
    )
    .unwrap();
    // The missing name substitutes the empty string.
    assert_eq!(result.document.services["web"].user.as_deref(), Some(""));
    assert_eq!(result.undefined_variables, vec!["RUN_AS"]);
    assert!(result.errors.is_empty());
}

#[test]
fn required_variable_failure_affects_only_its_field() {
    let source = "services:\n  web:\n    image: \"${IMAGE:?image must be set}\"\n  db:\n    image: postgres:16\n";
    let result = parse_with_options(source, &ParseOptions::default()).unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, Stage::Variables);
    assert_eq!(result.errors[0].severity, IssueSeverity::Error);
    assert!(result.errors[0].message.contains("IMAGE"));
    assert!(result.errors[0].message.contains("image must be set"));

    // The literal token stays in place; the rest of the document is intact.
    assert_eq!(
        result.document.services["web"].image.as_deref(),
        Some("${IMAGE:?image must be set}")
    );
    assert_eq!(result.document.services["db"].image.as_deref(), Some("postgres:16"));
}

// ---------------------------------------------------------------------------
// Includes
// ---------------------------------------------------------------------------

#[test]
fn include_merges_sections_and_parent_wins() {
    let options = options_with_files(&[(
        "common.yml",
        "services:\n  web:\n    image: overridden\n  cache:\n    image: redis:7\nvolumes:\n  shared: {}\n",
    )]);
    let source = "include:\n  - common.yml\nservices:\n  web:\n    image: nginx:1.25\n";

    let result = parse_with_options(source, &options).unwrap();
    assert!(result.errors.is_empty());
    assert_eq!(
        result.document.services["web"].image.as_deref(),
        Some("nginx:1.25")
    );
    assert_eq!(
        result.document.services["cache"].image.as_deref(),
        Some("redis:7")
    );
    assert!(result.document.volumes.contains_key("shared"));
}

#[test]
fn includes_resolve_recursively_with_base_path() {
    let mut options = options_with_files(&[
        ("deploy/common.yml", "include:\n  - ./extra.yml\nservices:\n  cache:\n    image: redis:7\n"),
        ("deploy/extra.yml", "services:\n  mq:\n    image: rabbitmq:3\n"),
    ]);
    options.base_path = Some("deploy".to_string());

    let source = "include:\n  - common.yml\nservices:\n  web:\n    image: nginx:1.25\n";
    let result = parse_with_options(source, &options).unwrap();
    assert!(result.errors.is_empty());
    assert_eq!(result.document.services.len(), 3);
    assert!(result.document.services.contains_key("mq"));
}

#[test]
fn include_cycles_degrade_to_a_warning() {
    let options = options_with_files(&[
        ("a.yml", "include:\n  - b.yml\nservices:\n  a:\n    image: a:1\n"),
        ("b.yml", "include:\n  - a.yml\nservices:\n  b:\n    image: b:1\n"),
    ]);
    let result = parse_with_options("include:\n  - a.yml\n", &options).unwrap();

    assert!(result
        .errors
        .iter()
        .any(|d| d.stage == Stage::Include && d.message.contains("cycle")));
    assert!(result.document.services.contains_key("a"));
    assert!(result.document.services.contains_key("b"));
}

#[test]
fn long_form_include_entries_are_accepted() {
    let options = options_with_files(&[("common.yml", "services:\n  cache:\n    image: redis:7\n")]);
    let result = parse_with_options("include:\n  - path: common.yml\n", &options).unwrap();
    assert!(result.document.services.contains_key("cache"));
}

#[test]
fn disabled_include_stage_leaves_directive_alone() {
    let options = ParseOptions {
        enable_includes: false,
        ..options_with_files(&[("common.yml", "services:\n  cache:\n    image: redis:7\n")])
    };
    let result = parse_with_options("include:\n  - common.yml\n", &options).unwrap();
    assert!(result.document.services.is_empty());
    assert!(result.document.extra.contains_key("include"));
}

// ---------------------------------------------------------------------------
// Extends
// ---------------------------------------------------------------------------

#[test]
fn extends_merges_scalars_lists_and_maps() {
    let source = r#"
services:
  base:
    image: nginx:1.25
    restart: always
    ports:
      - 8080:80
    env_file:
      - common.env
    environment:
      A: "1"
      SHARED: base
  web:
    extends:
      service: base
    image: httpd:2.4
    ports:
      - 9090:90
      - 8080:80
    environment:
      SHARED: ext
      B: "2"
"#;
    let result = parse_with_options(source, &ParseOptions::default()).unwrap();
    assert!(result.errors.is_empty());

    let web = &result.document.services["web"];
    // Scalar: extension wins; untouched base scalars inherit.
    assert_eq!(web.image.as_deref(), Some("httpd:2.4"));
    assert_eq!(web.restart.as_deref(), Some("always"));
    // Lists concatenate base-first and drop exact duplicates.
    let published: Vec<_> = web.ports.iter().filter_map(|p| p.published.clone()).collect();
    assert_eq!(published, vec!["8080", "9090"]);
    assert_eq!(web.env_file, vec!["common.env"]);
    // Maps merge per key, extension winning.
    assert_eq!(web.environment.get("A").map(String::as_str), Some("1"));
    assert_eq!(web.environment.get("B").map(String::as_str), Some("2"));
    assert_eq!(web.environment.get("SHARED").map(String::as_str), Some("ext"));
}

#[test]
fn extends_short_form_resolves_chains() {
    let source = r#"
services:
  a:
    image: app:1
    labels:
      tier: backend
  b:
    extends: a
    environment:
      LEVEL: b
  c:
    extends: b
    environment:
      EXTRA: c
"#;
    let result = parse_with_options(source, &ParseOptions::default()).unwrap();
    let c = &result.document.services["c"];
    assert_eq!(c.image.as_deref(), Some("app:1"));
    assert_eq!(c.labels.get("tier").map(String::as_str), Some("backend"));
    assert_eq!(c.environment.get("LEVEL").map(String::as_str), Some("b"));
    assert_eq!(c.environment.get("EXTRA").map(String::as_str), Some("c"));
}

#[test]
fn extends_resolves_across_files() {
    let options = options_with_files(&[(
        "base.yml",
        "services:\n  common:\n    image: app:1\n    restart: unless-stopped\n",
    )]);
    let source = "services:\n  web:\n    extends:\n      file: base.yml\n      service: common\n    ports:\n      - 8080:80\n";

    let result = parse_with_options(source, &options).unwrap();
    assert!(result.errors.is_empty());
    let web = &result.document.services["web"];
    assert_eq!(web.image.as_deref(), Some("app:1"));
    assert_eq!(web.restart.as_deref(), Some("unless-stopped"));
}

#[test]
fn extends_cycle_reports_and_falls_back() {
    let source = r#"
services:
  a:
    image: a:1
    extends: b
  b:
    image: b:1
    extends: a
"#;
    let result = parse_with_options(source, &ParseOptions::default()).unwrap();

    let cycle_errors: Vec<_> = result
        .errors
        .iter()
        .filter(|d| d.stage == Stage::Extends && d.severity == IssueSeverity::Error)
        .collect();
    assert_eq!(cycle_errors.len(), 2);

    // Both services keep their own, un-extended fields.
    assert_eq!(result.document.services["a"].image.as_deref(), Some("a:1"));
    assert_eq!(result.document.services["b"].image.as_deref(), Some("b:1"));
}

#[test]
fn extends_unknown_target_is_a_warning() {
    let result = parse_with_options(
        "services:\n  web:\n    image: nginx\n    extends: ghost\n",
        &ParseOptions::default(),
    )
    .unwrap();
    assert!(result
        .errors
        .iter()
        .any(|d| d.stage == Stage::Extends
            && d.severity == IssueSeverity::Warning
            && d.message.contains("ghost")));
    assert_eq!(result.document.services["web"].image.as_deref(), Some("nginx"));
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[test]
fn profile_filtering_keeps_untagged_services() {
    let source = r#"
services:
  web:
    image: nginx:1.25
  debugger:
    image: busybox
    profiles:
      - dev
"#;
    let options = ParseOptions {
        active_profiles: vec!["prod".to_string()],
        ..Default::default()
    };
    let result = parse_with_options(source, &options).unwrap();

    assert_eq!(result.document.services.len(), 1);
    assert!(result.document.services.contains_key("web"));
    // Profile census is taken before filtering.
    assert_eq!(result.profiles, vec!["dev"]);
    assert_eq!(result.profile_counts.get("dev"), Some(&1));
}

#[test]
fn matching_profile_retains_the_service() {
    let source = "services:\n  seed:\n    image: app:1\n    profiles: [tools, dev]\n";
    let options = ParseOptions {
        active_profiles: vec!["dev".to_string()],
        ..Default::default()
    };
    let result = parse_with_options(source, &options).unwrap();
    assert!(result.document.services.contains_key("seed"));
    assert_eq!(result.profile_counts.get("tools"), Some(&1));
    assert_eq!(result.profile_counts.get("dev"), Some(&1));
}

#[test]
fn empty_active_profiles_disables_filtering() {
    let source = "services:\n  seed:\n    image: app:1\n    profiles: [tools]\n";
    let result = parse_with_options(source, &ParseOptions::default()).unwrap();
    assert!(result.document.services.contains_key("seed"));
}

#[test]
fn disabled_profile_stage_keeps_tagged_services() {
    let source = "services:\n  seed:\n    image: app:1\n    profiles: [tools]\n";
    let options = ParseOptions {
        active_profiles: vec!["prod".to_string()],
        enable_profiles: false,
        ..Default::default()
    };
    let result = parse_with_options(source, &options).unwrap();
    assert!(result.document.services.contains_key("seed"));
    assert_eq!(result.profiles, vec!["tools"]);
}
