//! Integration tests for artcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    const REPO_FILE: &str = r#"{"org":"a","repo":"b","path":"f.txt"}"#;

    /// Command isolated from the user's config and cache
    fn artcache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("artcache");
        cmd.env("ARTCACHE_CONFIG", temp.path().join("config.toml"))
            .env("ARTCACHE_DIR", temp.path().join("cache"))
            .env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("content-addressed cache for remote artifacts"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("artcache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        artcache(&temp).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").is_file());
    }

    #[test]
    fn list_empty() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached tokens"));
    }

    #[test]
    fn list_empty_json() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn check_all_empty() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .arg("check-all")
            .assert()
            .success()
            .stdout(predicate::str::contains("No tokens registered"));
    }

    #[test]
    fn check_unknown_token() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .args(["check", REPO_FILE])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Token not found"));
        assert!(!temp.path().join("cache").join("index").exists());
    }

    #[test]
    fn invalid_token() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .args(["at", r#"{"org":"a"}"#])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid token"));
    }

    #[test]
    fn gist_has_no_builtin_adapter() {
        let temp = TempDir::new().unwrap();
        artcache(&temp)
            .args(["register", r#"{"id":"abc"}"#])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No fetch adapter registered for gist"));
    }
}
