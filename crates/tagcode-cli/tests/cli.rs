use assert_cmd::Command;
use predicates::prelude::*;

fn tagcode() -> Command {
    Command::cargo_bin("tagcode").expect("binary")
}

#[test]
fn info_for_builtin() {
    tagcode()
        .args(["info", "--family", "tag16h5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("codes: 30"))
        .stdout(predicate::str::contains("min hamming: 5"));
}

#[test]
fn decode_prints_json_lines() {
    let out = tagcode()
        .args(["decode", "--family", "tag16h5", "0x231b", "0x231a", "0x0000"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 0);
    assert_eq!(lines[0]["hamming_distance"], 0);
    assert_eq!(lines[1]["hamming_distance"], 1);
    assert_eq!(lines[1]["good"], true);
    assert_eq!(lines[2]["observed_code"], 0);
}

#[test]
fn error_recovery_override() {
    tagcode()
        .args(["decode", "--family", "tag16h5", "--error-recovery-bits", "0", "0x231a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"good\":false"));
}

#[test]
fn decode_from_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mini.json");
    std::fs::write(
        &path,
        r#"{ "name": "mini", "bit_count": 16, "codes": ["0x0f0f", "0xf0f0"] }"#,
    )
    .expect("write config");

    tagcode()
        .arg("decode")
        .arg("--config")
        .arg(&path)
        .arg("0x0f0e")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":0"))
        .stdout(predicate::str::contains("\"hamming_distance\":1"));
}

#[test]
fn pattern_prints_grid() {
    tagcode()
        .args(["pattern", "--family", "tag16h5", "--id", "0"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("........\n.######.\n"));
}

#[test]
fn bad_inputs_fail() {
    tagcode()
        .args(["decode", "--family", "tag16h5", "0xnothex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid code word"));

    tagcode()
        .args(["info", "--family", "tag99h1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown built-in family"));

    tagcode()
        .args(["pattern", "--family", "tag16h5", "--id", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    tagcode().args(["info"]).assert().failure();
}
