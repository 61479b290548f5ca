use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn condenser(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("condenser");
    cmd.current_dir(home).env("CONDENSER_HOME", home);
    cmd
}

#[test]
fn rules_add_list_and_clear_round_trip() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path();

    condenser(home)
        .args(["rules", "add", "exclude", "thinking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added exclude thinking"));

    assert!(home.join("condenser.toml").exists());

    condenser(home)
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] exclude thinking"));

    condenser(home)
        .args(["rules", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared 1 rule(s)"));

    condenser(home)
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no rules"));
}

#[test]
fn invalid_regex_rule_is_rejected_and_not_stored() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path();

    condenser(home)
        .args(["rules", "add", "regex-exclude", "([unclosed"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗"));

    // The insert failed before anything was written.
    assert!(!home.join("condenser.toml").exists());
}

#[test]
fn preset_installs_rules_only_once() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path();

    condenser(home)
        .args(["rules", "preset", "content-tag"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("preset=content-tag").and(predicate::str::contains("added=1")),
        );

    condenser(home)
        .args(["rules", "preset", "content-tag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added=0"));

    condenser(home)
        .args(["rules", "preset", "no-such-preset"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("known presets"));
}

#[test]
fn rules_test_runs_extraction_against_last_message() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path();
    let chat = home.join("chat.json");
    fs::write(
        &chat,
        r#"[{"text":"<thinking>secret plan</thinking>She waves.","speaker_name":"Aria"}]"#,
    )
    .expect("write chat");

    condenser(home)
        .args(["rules", "add", "exclude", "thinking"])
        .assert()
        .success();

    condenser(home)
        .args(["rules", "test", "--chat"])
        .arg(&chat)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("=== original")
                .and(predicate::str::contains("=== extracted"))
                .and(predicate::str::contains("She waves.")),
        );
}

#[test]
fn blacklist_entries_deduplicate_across_invocations() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path();

    condenser(home)
        .args(["blacklist", "add", "OOC:"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added `OOC:`"));

    condenser(home)
        .args(["blacklist", "add", "OOC:"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗"));

    condenser(home)
        .args(["blacklist", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] OOC:"));
}
