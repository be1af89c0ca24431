use std::path::PathBuf;
use std::process::{Command, Output};

fn schemaplan_cmd(project: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_schemaplan"));
    cmd.current_dir(project).env_remove("SCHEMAPLAN_CONFIG").env("NO_COLOR", "1");
    cmd
}

fn fixture_path(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn run(project: &std::path::Path, args: &[&str]) -> Output {
    schemaplan_cmd(project).args(args).output().expect("failed to run schemaplan")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn plan_prints_json_and_warns_on_destructive_steps() {
    let project = tempfile::tempdir().unwrap();
    let output = run(
        project.path(),
        &["plan", "--from", &fixture_path("user_v1.json"), "--to", &fixture_path("user_v2.json")],
    );

    assert_eq!(output.status.code(), Some(0), "stderr={}", String::from_utf8_lossy(&output.stderr));
    let plan: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("plan should be valid JSON");

    let kinds: Vec<&str> = plan["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["ADD_ENUM_VALUE", "ADD_FIELD", "DROP_FIELD", "CREATE_VIEW_SHIM", "BACKFILL"]
    );
    assert_eq!(plan["riskSummary"]["DESTRUCTIVE"], 1);
    assert_eq!(plan["riskSummary"]["NONE"], 0);
    assert!(String::from_utf8_lossy(&output.stderr).contains("User.ssn"));
}

#[test]
fn strict_plan_exits_one_on_destructive_steps() {
    let project = tempfile::tempdir().unwrap();
    let output = run(
        project.path(),
        &[
            "plan",
            "--from",
            &fixture_path("user_v1.json"),
            "--to",
            &fixture_path("user_v2.json"),
            "--strict",
        ],
    );
    assert_eq!(output.status.code(), Some(1));

    let hinted = run(
        project.path(),
        &[
            "plan",
            "--from",
            &fixture_path("user_v1.json"),
            "--to",
            &fixture_path("user_v2.json"),
            "--strict",
            "--known-empty",
            "User.ssn",
        ],
    );
    assert_eq!(hinted.status.code(), Some(0));
}

#[test]
fn config_file_makes_planning_strict() {
    let project = tempfile::tempdir().unwrap();
    let config_dir = project.path().join(".schemaplan");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[planner]\nstrict = true\n").unwrap();

    let (v1, v2) = (fixture_path("user_v1.json"), fixture_path("user_v2.json"));
    let args = ["plan", "--from", &v1, "--to", &v2];
    assert_eq!(run(project.path(), &args).status.code(), Some(1));

    let mut overridden = args.to_vec();
    overridden.push("--allow-destructive");
    assert_eq!(run(project.path(), &overridden).status.code(), Some(0));
}

#[test]
fn malformed_schema_exits_two() {
    let project = tempfile::tempdir().unwrap();
    let output = run(
        project.path(),
        &["plan", "--from", &fixture_path("malformed.json"), "--to", &fixture_path("user_v1.json")],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn hash_is_stable_under_reordering() {
    let project = tempfile::tempdir().unwrap();
    let a = run(project.path(), &["hash", &fixture_path("user_v1.json")]);
    let b = run(project.path(), &["hash", &fixture_path("user_v1_reordered.json")]);

    assert_eq!(a.status.code(), Some(0));
    assert!(stdout(&a).starts_with("sha256:"));
    assert_eq!(stdout(&a), stdout(&b));
}

#[test]
fn snapshot_file_round_trips_through_hash() {
    let project = tempfile::tempdir().unwrap();
    let out = project.path().join("snapshots").join("v1.json");
    let written = run(
        project.path(),
        &["snapshot", &fixture_path("user_v1.json"), "--out", &out.to_string_lossy()],
    );
    assert_eq!(written.status.code(), Some(0));

    let from_schema = run(project.path(), &["hash", &fixture_path("user_v1.json")]);
    let from_snapshot = run(project.path(), &["hash", &out.to_string_lossy()]);
    assert_eq!(stdout(&from_schema), stdout(&from_snapshot));
}

#[test]
fn baseline_accept_is_compare_and_swap() {
    let project = tempfile::tempdir().unwrap();
    let v1 = fixture_path("user_v1.json");
    let v2 = fixture_path("user_v2.json");

    let accept_v1 = run(project.path(), &["baseline", "accept", &v1, "--expect", "none"]);
    assert_eq!(accept_v1.status.code(), Some(0));
    let v1_hash = stdout(&run(project.path(), &["hash", &v1]));
    assert_eq!(stdout(&run(project.path(), &["baseline", "show"])), v1_hash);

    // A second writer still expecting an empty baseline loses.
    let stale = run(project.path(), &["baseline", "accept", &v2, "--expect", "none"]);
    assert_eq!(stale.status.code(), Some(1));

    assert_eq!(run(project.path(), &["baseline", "status", &v1]).status.code(), Some(0));
    assert_eq!(run(project.path(), &["baseline", "status", &v2]).status.code(), Some(1));

    assert_eq!(
        run(project.path(), &["baseline", "accept", &v2, "--expect", &v1_hash]).status.code(),
        Some(0)
    );
    assert_eq!(run(project.path(), &["baseline", "status", &v2]).status.code(), Some(0));
}

#[test]
fn unwritable_snapshot_destination_exits_one() {
    let project = tempfile::tempdir().unwrap();
    let blocker = project.path().join("snapshots");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let out = blocker.join("v1.json");

    let output = run(
        project.path(),
        &["snapshot", &fixture_path("user_v1.json"), "--out", &out.to_string_lossy()],
    );
    assert_eq!(output.status.code(), Some(1));
}
