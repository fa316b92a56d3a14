use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn skuh_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("skuh");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Create a small corpus of plain-text catalogs
    let catalogs_dir = root.join("catalogs");
    fs::create_dir_all(&catalogs_dir).unwrap();
    fs::write(
        catalogs_dir.join("catalogA.txt"),
        "Filter HF6553-OLD and part 8923712 plus word\nAlso P550440 appears here.",
    )
    .unwrap();
    fs::write(
        catalogs_dir.join("catalogB.txt"),
        "Cross reference list:\nP550440 replaces LF3349\nno codes on this line",
    )
    .unwrap();
    fs::write(
        catalogs_dir.join("readme.docx"),
        "B7030 hides in an unsupported file and must not be mined",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/skuh.sqlite"

[mining]
batch_size = 500
exclude_globs = ["*Interchange*"]

[classifier]
provider = "groq"
model = "llama-3.3-70b-versatile"
batch_size = 20
"#,
        root.display()
    );

    let config_path = config_dir.join("skuh.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_skuh(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = skuh_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("GROQ_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run skuh binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_skuh(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_skuh(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_skuh(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_mine_corpus() {
    let (tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let corpus = tmp.path().join("catalogs");
    let (stdout, stderr, success) =
        run_skuh(&config_path, &["mine", corpus.to_str().unwrap()]);
    assert!(success, "mine failed: stdout={}, stderr={}", stdout, stderr);

    // catalogA: HF6553-OLD, 8923712, P550440. catalogB: P550440, LF3349.
    assert!(stdout.contains("documents scanned: 2"), "{}", stdout);
    assert!(stdout.contains("codes merged: 5"), "{}", stdout);
    assert!(stdout.contains("codes new: 4"), "{}", stdout);
    assert!(stdout.contains("ok"));
}

#[test]
fn test_mine_idempotent_no_duplicates() {
    let (tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let corpus = tmp.path().join("catalogs");
    run_skuh(&config_path, &["mine", corpus.to_str().unwrap()]);
    let (stdout, _, success) = run_skuh(&config_path, &["mine", corpus.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("codes new: 0"), "{}", stdout);

    let (status_out, _, _) = run_skuh(&config_path, &["status"]);
    assert!(status_out.contains("Records:     4"), "{}", status_out);
}

#[test]
fn test_mine_skips_unsupported_and_excluded_files() {
    let (tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let corpus = tmp.path().join("catalogs");
    fs::write(
        corpus.join("04_Master_Interchange.txt"),
        "GIANT1000 GIANT2000",
    )
    .unwrap();

    let (stdout, _, success) = run_skuh(&config_path, &["mine", corpus.to_str().unwrap()]);
    assert!(success);
    // The .docx and the excluded interchange file are not scanned.
    assert!(stdout.contains("documents scanned: 2"), "{}", stdout);
    assert!(!stdout.contains("Interchange"), "{}", stdout);
}

#[test]
fn test_mine_single_file_bypasses_excludes() {
    let (tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let giant = tmp.path().join("catalogs").join("04_Master_Interchange.txt");
    fs::write(&giant, "GIANT1000 GIANT2000").unwrap();

    let (stdout, _, success) = run_skuh(&config_path, &["mine", giant.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("codes new: 2"), "{}", stdout);
}

#[test]
fn test_mine_continues_past_broken_document() {
    let (tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let corpus = tmp.path().join("catalogs");
    fs::write(corpus.join("broken.pdf"), b"not a pdf at all").unwrap();

    let (stdout, stderr, success) = run_skuh(&config_path, &["mine", corpus.to_str().unwrap()]);
    assert!(success, "corpus scan must survive a broken document");
    assert!(stdout.contains("documents skipped: 1"), "{}", stdout);
    assert!(stdout.contains("documents scanned: 2"), "{}", stdout);
    assert!(stderr.contains("broken.pdf"), "{}", stderr);
}

#[test]
fn test_status_reports_queue_counts() {
    let (tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let corpus = tmp.path().join("catalogs");
    run_skuh(&config_path, &["mine", corpus.to_str().unwrap()]);

    let (stdout, stderr, success) = run_skuh(&config_path, &["status"]);
    assert!(success, "status failed: {}", stderr);
    assert!(stdout.contains("Records:     4"), "{}", stdout);
    assert!(stdout.contains("RAW:         4"), "{}", stdout);
    assert!(stdout.contains("CLASSIFIED:  0"), "{}", stdout);
    assert!(stdout.contains("catalogA.txt"), "{}", stdout);
}

#[test]
fn test_classify_without_api_key_is_fatal() {
    let (_tmp, config_path) = setup_test_env();

    run_skuh(&config_path, &["init"]);
    let (_, stderr, success) = run_skuh(&config_path, &["classify", "--drain"]);
    assert!(!success, "classify must fail fast without credentials");
    assert!(stderr.contains("GROQ_API_KEY"), "{}", stderr);
}

#[test]
fn test_missing_config_is_fatal() {
    let (tmp, _config) = setup_test_env();
    let bogus = tmp.path().join("nope.toml");

    let binary = skuh_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(bogus.to_str().unwrap())
        .arg("init")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
