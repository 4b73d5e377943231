use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("bookstore-cli").unwrap();
    cmd.env_remove("BOOKSTORE_ENV")
        .env("BOOKSTORE_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"));
    cmd
}

#[test]
fn help_lists_the_subcommands() {
    let output = cli().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    for command in ["serve", "config", "indexes"] {
        assert!(stdout.contains(command), "missing {} in {}", command, stdout);
    }
}

#[test]
fn config_prints_the_resolved_settings() {
    let output = cli()
        .arg("config")
        .env("BOOKSTORE_SERVER__PORT", "4321")
        .env("BOOKSTORE_DATABASE__BACKEND", "memory")
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);

    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["server"]["port"], 4321);
    assert_eq!(settings["database"]["backend"], "memory");
    assert_eq!(settings["query"]["max_limit"], 100);
}

#[test]
fn indexes_succeed_on_the_memory_store() {
    cli()
        .arg("indexes")
        .env("BOOKSTORE_DATABASE__BACKEND", "memory")
        .assert()
        .success();
}

#[test]
fn unknown_environment_fails() {
    cli()
        .arg("config")
        .env("BOOKSTORE_ENV", "mars")
        .assert()
        .failure();
}
