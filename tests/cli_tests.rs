use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
mod test_env;

fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    setup_test_env_with("")
}

fn setup_test_env_with(extra_config: &str) -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let config_dir = temp_dir.path().join(".leadboard");
    fs::create_dir_all(&config_dir).unwrap();
    let config_file = config_dir.join("rc");
    fs::write(
        &config_file,
        format!("data.location={}\n{}", db_path.display(), extra_config),
    )
    .unwrap();
    (temp_dir, guard)
}

fn get_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("leadboard").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd.env_remove("LEADBOARD_LOG");
    cmd
}

fn set_read_only(temp_dir: &TempDir) {
    let config_file = temp_dir.path().join(".leadboard").join("rc");
    let mut content = fs::read_to_string(&config_file).unwrap();
    content.push_str("access.read_only=yes\n");
    fs::write(&config_file, content).unwrap();
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success();
    String::from_utf8(output.get_output().stdout.clone()).unwrap()
}

#[test]
fn test_board_shows_seeded_stages() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .arg("board")
        .assert()
        .success()
        .stdout(predicate::str::contains("New (0) *  [stage-new]"))
        .stdout(predicate::str::contains("Contacted (0)  [stage-contacted]"))
        .stdout(predicate::str::contains("Qualified (0)"))
        .stdout(predicate::str::contains("Converted (0)"));
}

#[test]
fn test_lead_add_lands_in_default_stage() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(["leads", "add", "Ada", "Lovelace", "--email", "ada@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lead 'Ada Lovelace' created"))
        .stdout(predicate::str::contains("Created lead 1 in New"));

    get_cmd(&temp_dir)
        .arg("board")
        .assert()
        .success()
        .stdout(predicate::str::contains("New (1) *"))
        .stdout(predicate::str::contains("1  Ada Lovelace  [active]  ada@example.com"));
}

#[test]
fn test_lead_move_to_stage_records_history() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();

    get_cmd(&temp_dir)
        .args(["leads", "move", "1", "contacted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lead moved successfully"));

    get_cmd(&temp_dir)
        .args(["leads", "list", "--stage", "contacted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"));

    get_cmd(&temp_dir)
        .args(["leads", "history", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved from New to Contacted"));
}

#[test]
fn test_lead_move_onto_another_lead() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();
    get_cmd(&temp_dir)
        .args(["leads", "add", "Grace Hopper", "--stage", "qualified"])
        .assert()
        .success();

    get_cmd(&temp_dir).args(["leads", "move", "1", "2"]).assert().success();

    let json = stdout_of(get_cmd(&temp_dir).args(["leads", "list", "--json"]));
    let leads: serde_json::Value = serde_json::from_str(&json).unwrap();
    let ada = leads
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["fullName"] == "Ada Lovelace")
        .unwrap();
    assert_eq!(ada["stage"], "qualified");
}

#[test]
fn test_lead_move_to_current_stage_is_noop() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();

    get_cmd(&temp_dir)
        .args(["leads", "move", "1", "new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already in New"));

    get_cmd(&temp_dir)
        .args(["leads", "history", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No activity recorded."));
}

#[test]
fn test_lead_move_rejects_unknown_targets() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();

    get_cmd(&temp_dir)
        .args(["leads", "move", "1", "nowhere"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Stage 'nowhere' not found"));

    get_cmd(&temp_dir)
        .args(["leads", "move", "9", "contacted"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Lead 9 not found"));
}

#[test]
fn test_stage_move_reorders_board() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(["stages", "move", "converted", "new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage order updated"));

    let stdout = stdout_of(get_cmd(&temp_dir).args(["stages", "list"]));
    let keys: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(keys, vec!["converted", "new", "contacted", "qualified"]);
    assert!(stdout.lines().nth(1).unwrap().starts_with("0"));
}

#[test]
fn test_stage_add_rename_and_delete() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(["stages", "add", "Demo", "Booked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Key: demo-booked"));

    get_cmd(&temp_dir)
        .args(["stages", "rename", "demo-booked", "Demo", "Scheduled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage 'Demo Scheduled' updated"));

    get_cmd(&temp_dir)
        .args(["stages", "delete", "demo-booked", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage 'Demo Scheduled' deleted"));

    get_cmd(&temp_dir)
        .args(["stages", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo-booked").not());
}

#[test]
fn test_stage_delete_refused_while_leads_remain() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .args(["leads", "add", "Ada Lovelace", "--stage", "contacted"])
        .assert()
        .success();

    get_cmd(&temp_dir)
        .args(["stages", "delete", "contacted", "-y"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Stage 'Contacted' still has 1 lead(s)"));

    get_cmd(&temp_dir)
        .args(["stages", "delete", "new", "-y"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot delete default stage 'New'"));
}

#[test]
fn test_stage_default_switches_where_leads_land() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir).args(["stages", "default", "contacted"]).assert().success();
    get_cmd(&temp_dir)
        .args(["leads", "add", "Ada Lovelace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created lead 1 in Contacted"));
}

#[test]
fn test_read_only_move_is_denied_and_state_unchanged() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();
    set_read_only(&temp_dir);

    get_cmd(&temp_dir)
        .args(["leads", "move", "1", "contacted"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("You do not have permission to perform this action."));

    get_cmd(&temp_dir)
        .arg("board")
        .assert()
        .success()
        .stdout(predicate::str::contains("New (1) *"))
        .stdout(predicate::str::contains("Contacted (0)"));
}

#[test]
fn test_read_only_stage_move_is_denied() {
    let (temp_dir, _guard) = setup_test_env_with("access.read_only=yes\n");

    get_cmd(&temp_dir)
        .args(["stages", "move", "converted", "new"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("You do not have permission"));

    let stdout = stdout_of(get_cmd(&temp_dir).args(["stages", "list"]));
    assert!(stdout.lines().nth(1).unwrap().contains("new"));
}

#[test]
fn test_lead_delete_removes_from_board() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();

    get_cmd(&temp_dir)
        .args(["leads", "delete", "1", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lead deleted successfully"));

    get_cmd(&temp_dir)
        .args(["leads", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No leads found."));
}

#[test]
fn test_leads_list_filters_and_sorts() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .args(["leads", "add", "Grace Hopper", "--phone", "555-0100"])
        .assert()
        .success();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();

    let stdout = stdout_of(get_cmd(&temp_dir).args(["leads", "list", "--sort", "name"]));
    let ada = stdout.find("Ada Lovelace").unwrap();
    let grace = stdout.find("Grace Hopper").unwrap();
    assert!(ada < grace);

    get_cmd(&temp_dir)
        .args(["leads", "list", "0100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grace Hopper"))
        .stdout(predicate::str::contains("Ada Lovelace").not());

    get_cmd(&temp_dir)
        .args(["leads", "list", "--status", "pending"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid status"));
}

#[test]
fn test_board_json_has_columns() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();

    let json = stdout_of(get_cmd(&temp_dir).args(["board", "--json"]));
    let columns: serde_json::Value = serde_json::from_str(&json).unwrap();
    let columns = columns.as_array().unwrap();
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[0]["stage"]["stageId"], "new");
    assert_eq!(columns[0]["leads"][0]["fullName"], "Ada Lovelace");
}

#[test]
fn test_bad_config_value_is_user_error() {
    let (temp_dir, _guard) = setup_test_env_with("board.refetch=maybe\n");

    get_cmd(&temp_dir)
        .arg("board")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid value for board.refetch: 'maybe'"));
}

#[test]
fn test_lead_move_to_numeric_stage_key() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(["leads", "add", "Ada Lovelace"]).assert().success();
    get_cmd(&temp_dir)
        .args(["stages", "add", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Key: 2024"));

    get_cmd(&temp_dir).args(["leads", "move", "1", "2024"]).assert().success();
    get_cmd(&temp_dir)
        .args(["leads", "list", "--stage", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"));

    get_cmd(&temp_dir)
        .args(["leads", "move", "1", "stage-contacted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lead moved successfully"));
    get_cmd(&temp_dir)
        .args(["leads", "history", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved from 2024 to Contacted"));
}

#[test]
fn test_generate_man_writes_pages() {
    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("man");

    Command::cargo_bin("generate-man")
        .unwrap()
        .arg(&out_dir)
        .assert()
        .success();

    let page = fs::read_to_string(out_dir.join("leadboard.1")).unwrap();
    assert!(page.contains("leadboard"));
    assert!(out_dir.join("leadboard-leads.1").exists());
    assert!(out_dir.join("leadboard-stages.1").exists());
}
