use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let output = Command::new(env!("CARGO_BIN_EXE_reloader"))
        .arg("init")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run init command");

    assert!(output.status.success());

    // Check that config file was created
    let config_path = temp_path.join(".reloader/settings.toml");
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("check_interval_ms = 2000"));
    assert!(content.contains("[artifacts]"));

    // A second init without --force refuses to overwrite
    let output = Command::new(env!("CARGO_BIN_EXE_reloader"))
        .arg("init")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run init command");
    assert!(!output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let config_dir = temp_path.join(".reloader");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("settings.toml"),
        "version = 2\ncheck_interval_ms = 4321\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_reloader"))
        .arg("config")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run config command");

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("check_interval_ms = 4321"));
}

#[test]
fn test_status_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();
    std::fs::write(
        temp_path.join("alpha.json"),
        r#"{ "attributes": { "vsn": ["42"] } }"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_reloader"))
        .arg("status")
        .arg(temp_path)
        .current_dir(temp_path)
        .output()
        .expect("Failed to run status command");

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("42"));
}
