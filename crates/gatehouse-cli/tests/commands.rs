//! Checker commands over files on disk

use clap::Parser;
use gatehouse_cli::commands;
use gatehouse_cli::{CheckConfig, Cli, OutputFormat};
use gatehouse_core::Error;
use gatehouse_policy::Decision;
use std::fs;
use tempfile::TempDir;

const POLICY: &str = r#"
tests:
  is_admin:
    the: { name: user, then: { is: admin } }

profiles:
  - name: admin
    context: { the: user }
    rules:
      - allow: "*"
        if: { happens: is_admin }
  - name: member
    context: { the: user }
    rules:
      - forbid: apps#destroy
      - allow: apps#show
        if: { asks_with_same_id: app_id }
"#;

const REQUEST: &str = r#"
controller: apps
action: show
params: { app_id: "5" }
actors:
  user: { type: User, attributes: { id: 1, app_id: 5, admin: false } }
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(request: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("policy.yaml"), POLICY).unwrap();
        fs::write(dir.path().join("request.yaml"), request).unwrap();
        fs::write(
            dir.path().join("gatehouse.yaml"),
            "profiles: [admin, member]\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn config(&self, args: &[&str]) -> CheckConfig {
        let policy = self.path("policy.yaml");
        let request = self.path("request.yaml");
        let mut argv = vec![
            "gatehouse",
            "--policy",
            policy.as_str(),
            "--request",
            request.as_str(),
        ];
        argv.extend_from_slice(args);
        let cli = Cli::parse_from(argv);
        CheckConfig::load(&self.path("gatehouse.yaml"), &cli).unwrap()
    }
}

#[test]
fn test_config_file_and_overrides() {
    let workspace = Workspace::new(REQUEST);
    let config = workspace.config(&["check", "--output", "json"]);

    assert_eq!(config.profiles, vec!["admin", "member"]);
    assert_eq!(config.policy_path, workspace.path("policy.yaml"));
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_malformed_config_is_a_config_error() {
    let workspace = Workspace::new(REQUEST);
    fs::write(workspace.path("gatehouse.yaml"), "profiles: admin: member\n").unwrap();
    let cli = Cli::parse_from(["gatehouse", "lint"]);

    let err = CheckConfig::load(&workspace.path("gatehouse.yaml"), &cli).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));
}

#[test]
fn test_owner_relation_through_declared_association() {
    let request = r#"
controller: apps
action: edit
actors:
  user: { type: User, attributes: { id: 1, admin: false } }
resources:
  app:
    type: App
    attributes: { id: 5, maintainer_id: 1 }
    associations:
      maintainer: { belongs_to: { foreign_key: maintainer_id } }
"#;
    let workspace = Workspace::new(request);
    fs::write(
        workspace.path("policy.yaml"),
        r#"
profiles:
  - name: maintainer
    context: { the: user }
    rules:
      - scope:
          context: { loaded: app }
          rules:
            - allow: [apps#edit]
              if: { that_belongs_to_it: maintainer }
"#,
    )
    .unwrap();
    let config = workspace.config(&["check", "--profile", "maintainer"]);
    let mut out = Vec::new();

    assert!(commands::check(&config, &mut out).unwrap());
    assert!(String::from_utf8(out).unwrap().starts_with("apps#edit: authorized"));
}

#[test]
fn test_check_authorizes_matching_request() {
    let workspace = Workspace::new(REQUEST);
    let config = workspace.config(&["check"]);
    let mut out = Vec::new();

    assert!(commands::check(&config, &mut out).unwrap());
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("apps#show: authorized"));
    assert!(text.contains("member  controller=default action=allowed"));
}

#[test]
fn test_check_reports_veto_as_json() {
    let workspace = Workspace::new(&REQUEST.replace("action: show", "action: destroy"));
    let config = workspace.config(&["check", "--output", "json"]);
    let mut out = Vec::new();

    assert!(!commands::check(&config, &mut out).unwrap());
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["verdict"], "forbidden");
    assert_eq!(report["outcomes"][1]["profile"], "member");
    assert_eq!(report["outcomes"][1]["action"], "forbidden");
}

#[test]
fn test_check_requires_controller() {
    let workspace = Workspace::new(&REQUEST.replace("controller: apps", ""));
    let config = workspace.config(&["check"]);

    let err = commands::check(&config, &mut Vec::<u8>::new()).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));

    let config = workspace.config(&["check", "--controller", "apps"]);
    assert!(commands::check(&config, &mut Vec::<u8>::new()).unwrap());
}

#[test]
fn test_validate_prints_decision() {
    let workspace = Workspace::new(REQUEST);
    let config = workspace.config(&[
        "validate",
        "--profile",
        "member",
        "--action",
        "apps,apps#destroy",
    ]);
    let mut out = Vec::new();

    let decision = commands::validate(
        &config,
        "member",
        &["apps".to_string(), "apps#destroy".to_string()],
        &mut out,
    )
    .unwrap();
    assert_eq!(decision, Decision::Forbidden);
    assert_eq!(String::from_utf8(out).unwrap(), "forbidden\n");
}

#[test]
fn test_lint_lists_profiles_and_tests() {
    let workspace = Workspace::new(REQUEST);
    let config = workspace.config(&["lint"]);
    let mut out = Vec::new();

    commands::lint(&config, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("2 profiles, 1 tests"));
    assert!(text.contains("  admin: 1 rules (context: the)"));
    assert!(text.contains("  member: 2 rules (context: the)"));
    assert!(text.contains("  is_admin"));
}

#[test]
fn test_lint_rejects_unknown_test() {
    let workspace = Workspace::new(REQUEST);
    fs::write(
        workspace.path("policy.yaml"),
        "profiles:\n  - name: p\n    rules:\n      - allow: show\n        if: { happens: ghost }\n",
    )
    .unwrap();
    let config = workspace.config(&["lint"]);

    let err = commands::lint(&config, &mut Vec::<u8>::new()).unwrap_err();
    assert!(format!("{:#}", err).contains("ghost"));
}
