//! Integration tests for configuration loading and the resolution
//! priority chain.
//!
//! Note: Uses the serial_test crate to prevent ENV variable race
//! conditions. Tests that manipulate CANTATA_CONFIG are marked with
//! #[serial] so they run sequentially, not in parallel.

use cantata_common::config::{PlayerConfig, CacheConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file.flush().expect("flush config");
    file
}

#[test]
#[serial]
fn load_without_file_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let config = PlayerConfig::load(None).expect("defaults should load");
    assert_eq!(config, PlayerConfig::default());
}

#[test]
#[serial]
fn explicit_path_takes_priority_over_env() {
    let explicit = write_config(
        r#"
        [decoder]
        path = "/usr/local/bin/ffmpeg"
        "#,
    );
    let from_env = write_config(
        r#"
        [decoder]
        path = "/env/ffmpeg"
        "#,
    );
    env::set_var(CONFIG_ENV_VAR, from_env.path());

    let config = PlayerConfig::load(Some(explicit.path())).expect("load explicit");
    assert_eq!(config.decoder.path, "/usr/local/bin/ffmpeg");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn env_var_is_used_when_no_explicit_path() {
    let from_env = write_config(
        r#"
        [fetcher]
        path = "/env/yt-dlp"
        use_cookies = true
        cookies_from_browser = "firefox"

        [cache]
        backend = "memory"
        "#,
    );
    env::set_var(CONFIG_ENV_VAR, from_env.path());

    let config = PlayerConfig::load(None).expect("load from env");
    assert_eq!(config.fetcher.path, "/env/yt-dlp");
    assert!(config.fetcher.use_cookies);
    assert_eq!(config.fetcher.cookies_from_browser.as_deref(), Some("firefox"));
    assert_eq!(config.cache, CacheConfig::Memory);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn malformed_file_is_a_config_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let broken = write_config("decoder = \"not a table\"");
    let err = PlayerConfig::load(Some(broken.path())).expect_err("should fail");
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn empty_required_path_fails_at_load() {
    env::remove_var(CONFIG_ENV_VAR);
    let empty_path = write_config(
        r#"
        [decoder]
        path = ""
        "#,
    );
    assert!(PlayerConfig::load(Some(empty_path.path())).is_err());
}
