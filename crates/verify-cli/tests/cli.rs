use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../verify-driver/tests/fixtures")
        .join(name)
}

fn verify(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_verify"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run verify")
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_fixture_passes() {
    let dir = TempDir::new().unwrap();
    let directives = fixture("default_arguments_imported.swift");
    let input = fixture("default_arguments_imported.sil");
    let out = verify(
        &[directives.to_str().unwrap(), input.to_str().unwrap()],
        dir.path(),
    );
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_fixture_failure_exits_one() {
    let dir = TempDir::new().unwrap();
    let directives = fixture("default_arguments_imported.swift");
    let input = fixture("default_arguments_imported_nil.sil");
    let out = verify(
        &[directives.to_str().unwrap(), input.to_str().unwrap()],
        dir.path(),
    );
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("CHECK-NOT"), "{stderr}");
}

#[test]
fn test_malformed_directive_exits_two() {
    let dir = TempDir::new().unwrap();
    let directives = write(dir.path(), "t.swift", "// CHECK: a\n// CHECK-BOGUS: b\n");
    let input = write(dir.path(), "out.txt", "a\nb\n");
    let out = verify(&[&directives, &input], dir.path());
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("CHECK-BOGUS"));
}

#[test]
fn test_missing_input_exits_two() {
    let dir = TempDir::new().unwrap();
    let directives = write(dir.path(), "t.swift", "// CHECK: a\n");
    let out = verify(&[&directives, "does-not-exist.txt"], dir.path());
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_reads_stdin() {
    let dir = TempDir::new().unwrap();
    let directives = write(dir.path(), "t.swift", "// CHECK: foo\n// CHECK-NOT: bar\n// CHECK: baz\n");

    let run = |input: &str| {
        let mut child = Command::new(env!("CARGO_BIN_EXE_verify"))
            .args([directives.as_str(), "-"])
            .current_dir(dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    };

    assert_eq!(run("foo qux baz").status.code(), Some(0));
    assert_eq!(run("foo bar baz").status.code(), Some(1));
}

#[test]
fn test_json_output() {
    let dir = TempDir::new().unwrap();
    let directives = write(dir.path(), "t.swift", "// CHECK: [[N:[0-9]+]] apples\n");
    let input = write(dir.path(), "out.txt", "3 apples\n");
    let out = verify(&["--format", "json", &directives, &input], dir.path());
    assert_eq!(out.status.code(), Some(0));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["status"], "pass");
    assert_eq!(json["bindings"]["N"], "3");
    assert_eq!(json["matches"][0]["directive"], "CHECK");
}

#[test]
fn test_prefix_and_flags() {
    let dir = TempDir::new().unwrap();
    let directives = write(dir.path(), "t.ll", "; SIL: define\n; SIL-NEXT: ret\n");
    let input = write(dir.path(), "out.ll", "define\nret\n");
    let out = verify(&["--check-prefix", "SIL", &directives, &input], dir.path());
    assert_eq!(out.status.code(), Some(0));

    let out = verify(
        &["--check-prefix", "SIL", "--implicit-check-not", "ret", &directives, &input],
        dir.path(),
    );
    // `ret` is matched by SIL-NEXT; nothing is left between matches.
    assert_eq!(out.status.code(), Some(0));

    let empty = write(dir.path(), "empty.txt", "");
    let only_not = write(dir.path(), "n.ll", "; SIL-NOT: x\n");
    let args = ["--check-prefix", "SIL", only_not.as_str(), empty.as_str()];
    assert_eq!(verify(&args, dir.path()).status.code(), Some(1));
    let args = ["--check-prefix", "SIL", "--allow-empty", only_not.as_str(), empty.as_str()];
    assert_eq!(verify(&args, dir.path()).status.code(), Some(0));
}

#[test]
fn test_config_file_discovery() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "verify.toml", "[prefixes]\ncheck = [\"EXPECT\"]\n");
    let directives = write(dir.path(), "t.swift", "// EXPECT: hello\n");
    let input = write(dir.path(), "out.txt", "hello\n");
    assert_eq!(verify(&[&directives, &input], dir.path()).status.code(), Some(0));

    write(dir.path(), "bad.toml", "[prefixes]\ncheck = [\"9X\"]\n");
    let out = verify(&["--config", "bad.toml", &directives, &input], dir.path());
    assert_eq!(out.status.code(), Some(2));
}
