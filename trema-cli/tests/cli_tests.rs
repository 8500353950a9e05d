use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn trema_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("trema"))
}

const DB: &str = r#"{
  "master_language": "de",
  "text_nodes": [
    {
      "key": "greeting",
      "context": "start page",
      "values": [
        { "language": "de", "status": "verified", "value": "Hallo" },
        { "language": "fr", "status": "translated", "value": "Bonjour" }
      ]
    },
    {
      "key": "farewell",
      "context": "",
      "values": [
        { "language": "de", "status": "verified", "value": "Tschüss" },
        { "language": "fr", "status": "verified", "value": "Au revoir" }
      ]
    }
  ]
}"#;

const IMPORT: &str = "Key;Status;Master (de);Value (fr);Context
greeting;verified;Hallo;Bonjour;start page
farewell;verified;Tschüss;Salut;
extra;translated;Neu;Nouveau;
";

fn setup(dir: &Path) -> (String, String) {
    let db = dir.join("db.json");
    let input = dir.join("texts_fr.csv");
    fs::write(&db, DB).unwrap();
    fs::write(&input, IMPORT).unwrap();
    (
        db.to_str().unwrap().to_string(),
        input.to_str().unwrap().to_string(),
    )
}

#[test]
fn test_analyze_prints_report() {
    let temp_dir = TempDir::new().unwrap();
    let (db, input) = setup(temp_dir.path());

    let output = trema_cmd()
        .args(["analyze", "--db", &db, "-i", &input])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Conflicting changes (2) ==="));
    assert!(stdout.contains("=== Non-conflicting changes (1) ==="));
    assert!(stdout.contains("extra [fr] Key addition"));
    assert!(stdout.contains("value_changed: 1"));
}

#[test]
fn test_analyze_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let (db, input) = setup(temp_dir.path());

    let output = trema_cmd()
        .args(["analyze", "--db", &db, "--input", &input, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["total"], 3);
    assert_eq!(report["summary"]["conflicting"], 2);
    assert_eq!(report["non_conflicting"][0]["key"], "greeting");
    assert_eq!(report["non_conflicting"][0]["type"], "imported_status_newer");

    let conflicting = report["conflicting"].as_array().unwrap();
    let farewell = conflicting.iter().find(|c| c["key"] == "farewell").unwrap();
    assert_eq!(farewell["type"], "value_changed");
    assert_eq!(farewell["acceptable"], true);
    assert_eq!(farewell["accept"], false);
}

#[test]
fn test_import_applies_non_conflicting_changes() {
    let temp_dir = TempDir::new().unwrap();
    let (db, input) = setup(temp_dir.path());
    let out = temp_dir.path().join("out").join("db.json");

    let output = trema_cmd()
        .args([
            "import",
            "--db",
            &db,
            "-i",
            &input,
            "-o",
            out.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Applied 1 changes"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let nodes = written["text_nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["values"][1]["status"], "verified");
    assert_eq!(nodes[1]["values"][1]["value"], "Au revoir");
}

#[test]
fn test_export_then_analyze_is_clean() {
    let temp_dir = TempDir::new().unwrap();
    let (db, _) = setup(temp_dir.path());
    let csv = temp_dir.path().join("export_fr.csv");

    let output = trema_cmd()
        .args(["export", "--db", &db, "-l", "fr", "-o", csv.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = fs::read_to_string(&csv).unwrap();
    assert!(content.starts_with("Key;Status;Master (de);Value (fr);Context\n"));
    assert!(content.contains("farewell;verified;Tschüss;Au revoir;"));

    let output = trema_cmd()
        .args(["analyze", "--db", &db, "-i", csv.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["total"], 0);
}

#[test]
fn test_export_status_filter() {
    let temp_dir = TempDir::new().unwrap();
    let (db, _) = setup(temp_dir.path());
    let csv = temp_dir.path().join("export_fr.csv");

    let output = trema_cmd()
        .args([
            "export",
            "--db",
            &db,
            "--lang",
            "fr",
            "--output",
            csv.to_str().unwrap(),
            "--status",
            "translated",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let content = fs::read_to_string(&csv).unwrap();
    assert!(content.contains("greeting;translated;"));
    assert!(!content.contains("farewell"));
}

#[test]
fn test_master_language_mismatch_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (db, _) = setup(temp_dir.path());
    let input = temp_dir.path().join("texts_en.csv");
    fs::write(&input, "Key;Status;Master (en);Value (fr);Context\n").unwrap();

    let output = trema_cmd()
        .args(["analyze", "--db", &db, "-i", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("master language `en`"), "{stderr}");
}

#[test]
fn test_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (db, _) = setup(temp_dir.path());

    let output = trema_cmd()
        .args(["analyze", "--db", &db, "-i", "does_not_exist.csv"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("File does not exist"));
}

#[test]
fn test_invalid_header_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (db, _) = setup(temp_dir.path());
    let input = temp_dir.path().join("broken.csv");
    fs::write(&input, "Key,Status,Value (de),Context\n").unwrap();

    let output = trema_cmd()
        .args(["analyze", "--db", &db, "-i", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid header"));
}

const VERIFIED_DB: &str = r#"{
  "master_language": "de",
  "text_nodes": [
    {
      "key": "g",
      "context": "",
      "values": [
        { "language": "de", "status": "verified", "value": "Hallo" },
        { "language": "fr", "status": "verified", "value": "Bonjour" }
      ]
    }
  ]
}"#;

fn import_older_status(dir: &Path, extra_args: &[&str]) -> serde_json::Value {
    let db = dir.join("db.json");
    let input = dir.join("texts_fr.csv");
    let out = dir.join("out.json");
    fs::write(&db, VERIFIED_DB).unwrap();
    fs::write(
        &input,
        "Key;Status;Master (de);Value (fr);Context\ng;initial;Hallo;Bonjour;\n",
    )
    .unwrap();

    let mut args = vec![
        "import",
        "--db",
        db.to_str().unwrap(),
        "-i",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ];
    args.extend_from_slice(extra_args);
    let output = trema_cmd().args(&args).output().unwrap();
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap()
}

#[test]
fn test_import_leaves_conflicting_changes_unwritten_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let written = import_older_status(temp_dir.path(), &[]);

    let fr = &written["text_nodes"][0]["values"][1];
    assert_eq!(fr["language"], "fr");
    assert_eq!(fr["status"], "verified");
    assert_eq!(fr["value"], "Bonjour");
}

#[test]
fn test_import_include_conflicting_applies_accepted_conflicts() {
    let temp_dir = TempDir::new().unwrap();
    let written = import_older_status(temp_dir.path(), &["--include-conflicting"]);

    let fr = &written["text_nodes"][0]["values"][1];
    assert_eq!(fr["language"], "fr");
    assert_eq!(fr["status"], "initial");
}
