use super::*;

use std::{collections::HashMap, fs};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn no_env() -> impl Fn(&str) -> Option<String> {
    env_from(&[])
}

#[test]
fn defaults_point_at_local_service() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");

    let settings = Settings::default();
    assert_eq!(settings.server_url, "http://127.0.0.1:5000");
    assert_eq!(settings.feedback_path, "/get-feedback");
    assert_eq!(settings.default_mode, SessionMode::Quiz);

    let config = settings.service_config();
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert!(load_settings_with(Some(&missing), no_env()).is_err());
}

#[test]
fn default_settings_match_service_defaults() {
    assert_eq!(Settings::default().service_config(), ServiceConfig::default());
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("checkin.toml");
    fs::write(
        &path,
        r#"
server_url = "http://checkin.internal:8080"
request_timeout_secs = 5
feedback_path = "/submit-answer"
default_mode = "summary"
"#,
    )
    .expect("write config");

    let settings = load_settings_with(Some(&path), no_env()).expect("settings");

    assert_eq!(
        settings,
        Settings {
            server_url: "http://checkin.internal:8080".into(),
            request_timeout_secs: 5,
            feedback_path: "/submit-answer".into(),
            default_mode: SessionMode::Summary,
        }
    );
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("checkin.toml");
    fs::write(&path, "server_url = \"http://from-file:1\"\n").expect("write config");

    let settings = load_settings_with(
        Some(&path),
        env_from(&[
            ("CHECKIN_SERVER_URL", "http://from-env:2"),
            ("APP__SERVER_URL", "http://from-app-env:3"),
            ("CHECKIN_REQUEST_TIMEOUT_SECS", " 12 "),
        ]),
    )
    .expect("settings");

    assert_eq!(settings.server_url, "http://from-app-env:3");
    assert_eq!(settings.request_timeout_secs, 12);
}

#[test]
fn rejects_malformed_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("checkin.toml");
    fs::write(&path, "default_mode = \"report\"\n").expect("write config");
    assert!(load_settings_with(Some(&path), no_env()).is_err());

    fs::write(&path, "server = \"typo\"\n").expect("write config");
    assert!(load_settings_with(Some(&path), no_env()).is_err());

    fs::write(&path, "").expect("write config");
    let err = load_settings_with(
        Some(&path),
        env_from(&[("CHECKIN_REQUEST_TIMEOUT_SECS", "soon")]),
    )
    .expect_err("must fail");
    assert!(err.to_string().contains("CHECKIN_REQUEST_TIMEOUT_SECS"));
}
