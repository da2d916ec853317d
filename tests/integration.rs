use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn bankbot_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bankbot"))
}

/// Temp workspace with an empty knowledge directory and a config that
/// never reaches a model (embeddings disabled).
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("knowledge_base")).unwrap();

    let config_content = format!(
        r#"[paths]
customers_csv = "{root}/knowledge_base/bank_daten.csv"
knowledge_dir = "{root}/knowledge_base"
knowledge_store = "{root}/vector_db/knowledge_store.sqlite"

[embedding]
provider = "disabled"

[llm]
provider = "ollama"
url = "http://127.0.0.1:9"
timeout_secs = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("bankbot.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_bankbot(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = bankbot_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run bankbot binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_help_lists_commands() {
    let output = Command::new(bankbot_binary())
        .arg("--help")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for cmd in ["generate-data", "generate-policy", "index", "search", "chat"] {
        assert!(stdout.contains(cmd), "help is missing {}", cmd);
    }
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_bankbot(&tmp.path().join("nope.toml"), &["index"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

#[test]
fn test_chat_without_customer_file_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_bankbot(&config_path, &["chat"]);
    assert!(!success);
    assert!(stderr.contains("Customer file not found"), "stderr: {}", stderr);
}

#[test]
fn test_index_with_no_text_files_succeeds() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("knowledge_base").join("bank_daten.csv"),
        "Kundennummer,Nachname,Vorname,Passwort\n",
    )
    .unwrap();

    let (stdout, stderr, success) = run_bankbot(&config_path, &["index"]);
    assert!(success, "index failed: {}", stderr);
    assert!(stdout.contains("No text files found"));
    assert!(!tmp.path().join("vector_db").join("knowledge_store.sqlite").exists());
}

#[test]
fn test_index_embedding_failure_writes_nothing() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("knowledge_base").join("agb_regeln.txt"),
        "Nur Kunden der Risikoklasse 1, 2 oder 3 dürfen Genossenschaftsanteile erwerben.",
    )
    .unwrap();

    let (_, stderr, success) = run_bankbot(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);

    let store_dir = tmp.path().join("vector_db");
    assert!(!store_dir.join("knowledge_store.sqlite").exists());
    assert!(!store_dir.join("knowledge_store.sqlite.staging").exists());
}

#[test]
fn test_search_without_index_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_bankbot(&config_path, &["search", "Anteile"]);
    assert!(!success);
    assert!(stderr.contains("Knowledge store not found"), "stderr: {}", stderr);
}

#[test]
fn test_generate_policy_unreachable_model_fails() {
    let (tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_bankbot(&config_path, &["generate-policy"]);
    assert!(!success);
    assert!(stderr.contains("Policy generation failed"), "stderr: {}", stderr);
    assert!(!tmp.path().join("knowledge_base").join("agb_regeln.txt").exists());
}
