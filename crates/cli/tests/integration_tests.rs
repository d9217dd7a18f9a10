/// Integration tests for the Lingua CLI.
/// Each test spawns the binary, scripts it over stdin, and checks stdout.
use std::path::Path;
use tempfile::tempdir;

/// Runs the CLI with the given stdin script and environment, returning stdout.
fn run_cli(commands: &str, cache_path: Option<&Path>) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut cmd = Command::new("cargo");
    cmd.args(["run", "-p", "cli", "--quiet", "--"]);
    if let Some(path) = cache_path {
        cmd.env("LINGUA_CACHE_PATH", path);
    }

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn CLI");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin
            .write_all(commands.as_bytes())
            .expect("failed to write to stdin");
        stdin.write_all(b"EXIT\n").expect("failed to write EXIT");
    }

    let output = child.wait_with_output().expect("failed to read output");
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn store_compact_get() {
    let output = run_cli(
        "STORE en greeting.morning Good morning\nCOMPACT\nGET en greeting.morning\n",
        None,
    );

    assert!(output.contains("OK (1 locales compacted)"), "{output}");
    assert!(output.contains("Good morning"), "{output}");
}

#[test]
fn subtree_get_renders_a_map() {
    let output = run_cli(
        "STORE en menu.open Open\nSTORE en menu.close Close\nCOMPACT\nGET en menu\n",
        None,
    );

    assert!(output.contains(r#"{close: "Close", open: "Open"}"#), "{output}");
}

#[test]
fn missing_keys_print_nil() {
    let output = run_cli("GET en nothing\n", None);
    assert!(output.contains("(nil)"), "{output}");
}

#[test]
fn scoped_get() {
    let output = run_cli(
        "STORE en menu.file.open Open\nCOMPACT\nGET en open menu file\n",
        None,
    );
    assert!(output.contains("Open"), "{output}");
}

#[test]
fn cache_file_is_written_and_reused() {
    let dir = tempdir().unwrap();
    let cache = dir.path().join("translations.cache");

    let output = run_cli("STORE en msg hello\nCOMPACT\n", Some(&cache));
    assert!(output.contains("OK (1 locales compacted)"), "{output}");
    assert!(cache.exists());

    // Second run: nothing stored; everything comes from the cache.
    let output = run_cli("COMPACT\nGET en msg\n", Some(&cache));
    assert!(output.contains("hello"), "{output}");
}
