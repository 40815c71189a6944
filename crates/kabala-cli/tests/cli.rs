use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `kabala` with config and data isolated in `dir`.
fn kabala(dir: &TempDir) -> Command {
    let config = dir.path().join("config.json");
    let mut cmd = Command::cargo_bin("kabala").unwrap();
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--data-dir")
        .arg(dir.path().join("data"));
    cmd
}

fn init(dir: &TempDir) {
    kabala(dir).args(["config", "init"]).assert().success();
}

fn write_draft(dir: &TempDir, entries: &str) {
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(
        data.join("draft.json"),
        format!(r#"{{"store":{{"entries":{}}}}}"#, entries),
    )
    .unwrap();
}

#[test]
fn test_employee_roundtrip() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    kabala(&dir)
        .args(["employee", "--name", "דנה לוי", "--id", "12345"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved employee"));

    kabala(&dir)
        .arg("employee")
        .assert()
        .success()
        .stdout(predicate::str::contains("דנה לוי").and(predicate::str::contains("12345")));
}

#[test]
fn test_blank_employee_name_rejected() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    kabala(&dir)
        .args(["employee", "--name", "  ", "--id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing employee name"));
}

#[test]
fn test_list_empty_draft() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    kabala(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("The draft is empty"));
}

#[test]
fn test_list_shows_total_of_parseable_amounts() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    write_draft(
        &dir,
        r#"[
            {"amount":"10.00","date":"2024-01-15","description":"מונית"},
            {"amount":"","date":"2024-01-16","description":""},
            {"amount":"5.50","date":"2024-01-17","description":""}
        ]"#,
    );

    kabala(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("15/01/2024").and(predicate::str::contains("15.50")));
}

#[test]
fn test_edit_updates_draft() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    write_draft(&dir, r#"[{"amount":"","date":"2024-01-15","description":""}]"#);

    kabala(&dir)
        .args(["edit", "1", "amount", "42.10"])
        .assert()
        .success();

    kabala(&dir)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"42.10\""));
}

#[test]
fn test_edit_out_of_range_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    write_draft(&dir, "[]");

    kabala(&dir)
        .args(["edit", "3", "amount", "1.00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No entry #3"));
}

#[test]
fn test_export_requires_employee() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    kabala(&dir)
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No employee details"));
}

#[test]
fn test_export_writes_report_and_mail_link() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    kabala(&dir)
        .args(["employee", "--name", "Dana", "--id", "7"])
        .assert()
        .success();
    write_draft(&dir, r#"[{"amount":"12.00","date":"2024-01-15","description":""}]"#);

    kabala(&dir)
        .args(["export", "--mail", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mailto:").and(predicate::str::contains("12.00")));

    let pdf = std::fs::read(dir.path().join("expenses.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(!dir.path().join("data").join("draft.json").exists());
}

#[test]
fn test_scan_without_models_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    kabala(&dir)
        .args(["employee", "--name", "Dana", "--id", "7"])
        .assert()
        .success();

    kabala(&dir)
        .args(["scan", "receipt.png", "--model-dir"])
        .arg(dir.path().join("no-models"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing model file"));
}

#[test]
fn test_config_set_and_get() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    kabala(&dir)
        .args(["config", "set", "mail.recipient", "finance@example.com"])
        .assert()
        .success();

    kabala(&dir)
        .args(["config", "get", "mail.recipient"])
        .assert()
        .success()
        .stdout(predicate::str::contains("finance@example.com"));

    kabala(&dir)
        .args(["config", "set", "mail.nope", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}
