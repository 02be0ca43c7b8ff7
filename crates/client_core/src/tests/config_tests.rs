use super::{load_settings_from, normalize_base_url, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use shared::domain::UserId;

fn no_env(_: &str) -> Option<String> {
    None
}

fn temp_dir(prefix: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("{prefix}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

#[test]
fn strips_trailing_slash_from_base_url() {
    assert_eq!(
        normalize_base_url("http://localhost:5000/").expect("normalize"),
        "http://localhost:5000"
    );
}

#[test]
fn empty_base_url_falls_back_to_default() {
    assert_eq!(
        normalize_base_url("   ").expect("normalize"),
        Settings::default().base_url
    );
}

#[test]
fn rejects_non_http_base_url() {
    let err = normalize_base_url("ftp://example.com").expect_err("must fail");
    assert!(err.to_string().contains("http or https"), "{err}");
    assert!(normalize_base_url("not a url").is_err());
}

#[test]
fn endpoints_join_base_url_and_routes() {
    let settings = Settings::with_base_url("http://api.test")
        .normalized()
        .expect("settings");
    assert_eq!(settings.users_endpoint(), "http://api.test/api/users");
    assert_eq!(
        settings.user_endpoint(&UserId::from(1)),
        "http://api.test/api/users/1"
    );
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let dir = temp_dir("users_client_defaults");
    let settings = load_settings_from(&dir.join("absent.toml"), no_env).expect("load");
    assert_eq!(settings, Settings::default());
    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn file_values_are_overridden_by_env() {
    let dir = temp_dir("users_client_layering");
    let file = dir.join("users_client.toml");
    fs::write(
        &file,
        "base_url = \"http://from-file:8080/\"\npoll_interval_ms = 2500\nrequest_timeout_ms = 900\n",
    )
    .expect("write settings");

    let from_file = load_settings_from(&file, no_env).expect("load");
    assert_eq!(from_file.base_url, "http://from-file:8080");
    assert_eq!(from_file.poll_interval_ms, 2500);
    assert_eq!(from_file.request_timeout_ms, 900);

    let env_vars: HashMap<&str, &str> = [
        ("APP__BASE_URL", "https://from-env.example"),
        ("APP__POLL_INTERVAL_MS", "750"),
        ("APP__REQUEST_TIMEOUT_MS", "not-a-number"),
    ]
    .into_iter()
    .collect();
    let layered = load_settings_from(&file, |key| env_vars.get(key).map(|v| v.to_string()))
        .expect("load");
    assert_eq!(layered.base_url, "https://from-env.example");
    assert_eq!(layered.poll_interval_ms, 750);
    assert_eq!(layered.request_timeout_ms, 900);

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn zero_poll_interval_is_rejected() {
    let settings = Settings {
        poll_interval_ms: 0,
        ..Settings::default()
    };
    assert!(settings.normalized().is_err());
}
