#[test]
fn crawlpipe_env_file_is_applied_before_argument_parsing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_file = dir.path().join("crawlpipe.env");
    std::fs::write(&env_file, "# local overrides\nPORT=not-a-port\n").expect("write env file");

    let bin = assert_cmd::cargo::cargo_bin!("crawlpipe");
    let out = std::process::Command::new(bin)
        .args(["serve"])
        .env("CRAWLPIPE_ENV_FILE", &env_file)
        .env_remove("PORT")
        .output()
        .expect("run crawlpipe serve");

    assert!(!out.status.success(), "serve should reject the env file's port");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("not-a-port"), "{stderr}");
}

