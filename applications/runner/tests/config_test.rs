//! Configuration loading from TOML files and environment overrides

use playmark::config::{environment, ConfigError, PlaymarkConfig};
use playmark_core::TrackRole;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const SAMPLE: &str = r#"
[api]
base_url = "https://api.example.com"

[auth]
client_id = "client-123"
refresh_token = "from-file"

[device]
name = "Study Room"

[catalog.anchor]
uri = "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
name = "Anchor"

[catalog.primary]
uri = "7GhIk7Il098yCjg4BQjzvb"
name = "Primary"

[[catalog.fillers]]
uri = "0VjIjW4GlUZAMYd2vXMi3b"
name = "Filler A"

[[catalog.fillers]]
uri = "1301WleyT98MSxVHPZCA6M"
name = "Filler B"

[policy]
save_button_probability = 1.0
completion_code_prefix = "LAB-"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn env(vars: &[(&str, &str)]) -> config::Environment {
    environment().source(Some(
        vars.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    ))
}

#[test]
fn test_load_sample_file() {
    let file = write_config(SAMPLE);
    let config = PlaymarkConfig::load_with(Some(file.path()), env(&[])).unwrap();
    config.validate().unwrap();

    assert_eq!(config.api.base_url, "https://api.example.com");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.device.name, "Study Room");
    assert_eq!(config.device.poll_interval_ms, 500);
    assert!(config.telemetry.endpoint.is_none());
    assert_eq!(config.timing().elapsed_tick, Duration::from_secs(1));

    let catalog = config.catalog();
    assert_eq!(catalog.primary.uri, "spotify:track:7GhIk7Il098yCjg4BQjzvb");
    assert_eq!(catalog.primary.role, TrackRole::Primary);
    assert_eq!(catalog.fillers.len(), 2);
}

#[test]
fn test_partial_policy_keeps_defaults() {
    let file = write_config(SAMPLE);
    let config = PlaymarkConfig::load_with(Some(file.path()), env(&[])).unwrap();

    let defaults = playmark_policy::PolicyConfig::default();
    assert_eq!(config.policy.completion_code_prefix, "LAB-");
    assert_eq!(config.policy.save_button_probability, 1.0);
    assert_eq!(config.policy.session_duration_ms, defaults.session_duration_ms);
    assert_eq!(config.policy.naming, defaults.naming);
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config(SAMPLE);
    let config = PlaymarkConfig::load_with(
        Some(file.path()),
        env(&[
            ("PLAYMARK_AUTH__REFRESH_TOKEN", "from-env"),
            ("PLAYMARK_TIMING__ELAPSED_TICK_MS", "250"),
            ("PLAYMARK_TELEMETRY__ENDPOINT", "https://collector.example.com/events"),
        ]),
    )
    .unwrap();

    assert_eq!(config.auth.refresh_token.as_deref(), Some("from-env"));
    assert_eq!(config.timing.elapsed_tick_ms, 250);
    assert_eq!(
        config.telemetry.endpoint.as_deref(),
        Some("https://collector.example.com/events")
    );
}

#[test]
fn test_missing_catalog_fails_to_load() {
    let file = write_config("[auth]\nclient_id = \"c\"\n");
    let result = PlaymarkConfig::load_with(Some(file.path()), env(&[]));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_missing_file_fails_to_load() {
    let result = PlaymarkConfig::load_with(
        Some(std::path::Path::new("/nonexistent/playmark.toml")),
        env(&[]),
    );
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_invalid_policy_fails_validation() {
    let file = write_config(&SAMPLE.replace(
        "save_button_probability = 1.0",
        "save_button_probability = 2.0",
    ));
    let config = PlaymarkConfig::load_with(Some(file.path()), env(&[])).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Policy(_))));
}

#[test]
fn test_duplicate_track_fails_validation() {
    let file = write_config(&SAMPLE.replace("1301WleyT98MSxVHPZCA6M", "0VjIjW4GlUZAMYd2vXMi3b"));
    let config = PlaymarkConfig::load_with(Some(file.path()), env(&[])).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Catalog(_))));
}

#[test]
fn test_effective_config_round_trips_through_toml() {
    let file = write_config(SAMPLE);
    let config = PlaymarkConfig::load_with(Some(file.path()), env(&[])).unwrap();

    let rendered = config.to_toml().unwrap();
    assert!(!rendered.contains("from-file"));

    let reloaded: PlaymarkConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(reloaded.catalog().primary, config.catalog().primary);
    assert_eq!(reloaded.policy, config.policy);
}
