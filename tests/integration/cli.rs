mod common;

use common::{excheck, stderr, stdout, write_source};

const CLEAN: &str = "fn helper() {\n}\nfn main() {\n    helper()\n}\n";

const RISKY: &str = "extern fn read() throws io.IoError\nfn main() {\n    read()\n}\n";

#[test]
fn clean_file_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.xc", CLEAN);

    let output = excheck(&["check", file.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn findings_print_but_exit_zero_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.xc", RISKY);

    let output = excheck(&["check", file.to_str().unwrap()]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Unhandled exception: io.IoError"));
    assert!(out.contains("not caught or declared here"));
}

#[test]
fn deny_flag_exits_one_on_findings() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.xc", RISKY);

    let output = excheck(&["check", "--deny", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn deny_flag_with_clean_file_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.xc", CLEAN);

    let output = excheck(&["check", "--deny", file.to_str().unwrap()]);
    assert!(output.status.success());
}

#[test]
fn json_output_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.xc", RISKY);

    let output = excheck(&["check", "--json", file.to_str().unwrap()]);
    assert!(output.status.success());

    let findings: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let findings = findings.as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["unhandled"][0], "io.IoError");
    let fixes = findings[0]["fixes"].as_array().unwrap();
    assert!(fixes.contains(&serde_json::json!("declare_throws")));
    assert!(fixes.contains(&serde_json::json!("surround_with_try_catch")));
}

#[test]
fn missing_file_exits_two() {
    let output = excheck(&["check", "/nonexistent/never.xc"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("cannot read"));
}

#[test]
fn syntax_error_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "bad.xc", "fn main() {\n");

    let output = excheck(&["check", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn config_deny_applies_without_the_flag() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "excheck.toml", "[check]\ndeny = true\n");
    let file = write_source(dir.path(), "main.xc", RISKY);

    let output = excheck(&["check", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn config_exempt_skips_the_function() {
    let dir = tempfile::tempdir().unwrap();
    write_source(
        dir.path(),
        "excheck.toml",
        "[check]\nexempt = [\"main\"]\n",
    );
    let file = write_source(dir.path(), "main.xc", RISKY);

    let output = excheck(&["check", "--deny", file.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn config_is_discovered_from_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "excheck.toml", "[check]\ndeny = true\n");
    let nested = dir.path().join("src");
    std::fs::create_dir(&nested).unwrap();
    let file = write_source(&nested, "main.xc", RISKY);

    let output = excheck(&["check", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn invalid_config_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "excheck.toml", "[check]\nbogus = 1\n");
    let file = write_source(dir.path(), "main.xc", CLEAN);

    let output = excheck(&["check", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}
