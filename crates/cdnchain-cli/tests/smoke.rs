use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn run_cli(args: &[&str], cwd: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_cdnchain"))
        .args(args)
        .current_dir(cwd)
        .env_remove("CDNCHAIN_API_KEY")
        .env_remove("CDNCHAIN_POLICY")
        .env_remove("CDNCHAIN_SIGNATURE")
        .env_remove("CDNCHAIN_CDN_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("cli process should start")
}

#[test]
fn url_command_prints_unescaped_chain() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(
        &[
            "url",
            "--handle",
            "FILE1",
            "--cdn-url",
            "https://cdn.example.com",
            "--task",
            "resize=w:100,h:200",
            "--task",
            "rotate=deg:90",
        ],
        temp.path(),
    );

    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf8");
    assert_eq!(
        stdout.trim(),
        "https://cdn.example.com/resize=w:100,h:200/rotate=deg:90/FILE1"
    );
}

#[test]
fn url_command_prefixes_security_task() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(
        &[
            "url",
            "--handle",
            "FILE1",
            "--cdn-url",
            "https://cdn.example.com",
            "--policy",
            "POL",
            "--signature",
            "SIG",
            "--task",
            "flip",
        ],
        temp.path(),
    );

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf8");
    assert_eq!(
        stdout.trim(),
        "https://cdn.example.com/security=policy:POL,signature:SIG/flip/FILE1"
    );
}

#[test]
fn url_command_rejects_external_sources() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(
        &[
            "url",
            "--external-url",
            "https://example.com/cat.jpg",
            "--api-key",
            "APIKEY",
            "--task",
            "flip",
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("only available for stored handles"), "{stderr}");
}

#[test]
fn malformed_task_fails_before_any_request() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(
        &["debug", "--handle", "FILE1", "--task", "resize=w100"],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid argument"), "{stderr}");
}

#[test]
fn empty_chain_fails_before_any_request() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(&["debug", "--handle", "FILE1"], temp.path());

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("empty task chain"), "{stderr}");
}

#[test]
fn external_source_without_api_key_fails() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(
        &[
            "store",
            "--external-url",
            "https://example.com/cat.jpg",
            "--task",
            "flip",
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("api key"), "{stderr}");
}
