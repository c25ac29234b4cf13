//! Integration tests for Repocache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn repocache() -> Command {
        cargo_bin_cmd!("repocache")
    }

    /// Lay out a local channel with one subdir and return its file:// URL.
    fn local_channel(root: &Path, platform: &str, body: &str) -> String {
        let subdir = root.join(platform);
        fs::create_dir_all(&subdir).unwrap();
        fs::write(subdir.join("repodata.json"), body).unwrap();
        format!("file://{}", root.display())
    }

    fn cached_json(cache_dir: &Path) -> Vec<std::path::PathBuf> {
        fs::read_dir(cache_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }

    #[test]
    fn help_displays() {
        repocache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cache-coherency engine"));
    }

    #[test]
    fn version_displays() {
        repocache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("repocache"));
    }

    #[test]
    fn config_path() {
        repocache()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        repocache()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn fetch_local_channel_writes_spliced_cache() {
        let channel = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let url = local_channel(channel.path(), "noarch", r#"{"packages":{}}"#);

        repocache()
            .args(["fetch", &url, "--cache-dir"])
            .arg(cache.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("noarch"));

        let files = cached_json(&cache.path().join("cache"));
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.starts_with(r#"{"_url":"file://"#), "{content}");
        assert!(content.contains(r#""packages":{}"#));
    }

    #[test]
    fn fetch_missing_critical_subdir_fails() {
        let channel = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        // The channel directory exists but has no noarch subdir.
        let url = format!("file://{}", channel.path().display());

        repocache()
            .args(["fetch", &url, "--cache-dir"])
            .arg(cache.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("required subdir"));
    }

    #[test]
    fn fetch_missing_noncritical_subdir_succeeds() {
        let channel = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        // noarch is present; linux-64 is not and is allowed to be missing.
        let url = local_channel(channel.path(), "noarch", r#"{"packages":{}}"#);

        repocache()
            .args(["fetch", &url, "--platform", "linux-64,noarch", "--cache-dir"])
            .arg(cache.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("unavailable"));
    }

    #[test]
    fn fetch_offline_without_cache_reports_unavailable() {
        let cache = TempDir::new().unwrap();

        repocache()
            .args([
                "fetch",
                "https://example.invalid/channel",
                "--offline",
                "--cache-dir",
            ])
            .arg(cache.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("unavailable"));
    }

    #[test]
    fn fetch_rejects_bad_scheme() {
        repocache()
            .args(["fetch", "ftp://example.org/channel"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid channel URL"));
    }

    #[test]
    fn clear_removes_cached_repodata() {
        let channel = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let url = local_channel(channel.path(), "noarch", r#"{"packages":{}}"#);

        repocache()
            .args(["fetch", &url, "--cache-dir"])
            .arg(cache.path())
            .assert()
            .success();
        assert_eq!(cached_json(&cache.path().join("cache")).len(), 1);

        repocache()
            .args(["clear", &url, "--cache-dir"])
            .arg(cache.path())
            .assert()
            .success();
        assert!(cached_json(&cache.path().join("cache")).is_empty());
    }

    #[test]
    fn clear_on_empty_cache_succeeds() {
        let cache = TempDir::new().unwrap();
        repocache()
            .args(["clear", "https://example.org/channel", "--cache-dir"])
            .arg(cache.path())
            .assert()
            .success();
    }
}
