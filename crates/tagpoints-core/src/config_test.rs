use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("TAGPOINTS_ASSOCIATE_ID", "shopper-21");
    m
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "TAGPOINTS_ENV"));
}

#[test]
fn build_app_config_fails_without_associate_id() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "TAGPOINTS_ASSOCIATE_ID"),
        "expected MissingEnvVar(TAGPOINTS_ASSOCIATE_ID), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_associate_id_as_missing() {
    let mut map = HashMap::new();
    map.insert("TAGPOINTS_ASSOCIATE_ID", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.associate_id, "shopper-21");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.api_base, "http://localhost:5001");
    assert_eq!(cfg.store_path.to_str(), Some("./tagpoints-store.json"));
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "tagpoints/0.1 (points-relay)");
    assert_eq!(cfg.relay_retry_delay_ms, 2000);
    assert_eq!(cfg.channel_timeout_secs, 5);
    assert_eq!(cfg.rescan_debounce_ms, 500);
}

#[test]
fn build_app_config_rejects_non_http_api_base() {
    let mut map = full_env();
    map.insert("TAGPOINTS_API_BASE", "localhost:5001");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TAGPOINTS_API_BASE"),
        "expected InvalidEnvVar(TAGPOINTS_API_BASE), got: {result:?}"
    );
}

#[test]
fn relay_retry_delay_override() {
    let mut map = full_env();
    map.insert("TAGPOINTS_RELAY_RETRY_DELAY_MS", "250");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.relay_retry_delay_ms, 250);
}

#[test]
fn relay_retry_delay_invalid() {
    let mut map = full_env();
    map.insert("TAGPOINTS_RELAY_RETRY_DELAY_MS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TAGPOINTS_RELAY_RETRY_DELAY_MS"),
        "expected InvalidEnvVar(TAGPOINTS_RELAY_RETRY_DELAY_MS), got: {result:?}"
    );
}

#[test]
fn channel_timeout_override() {
    let mut map = full_env();
    map.insert("TAGPOINTS_CHANNEL_TIMEOUT_SECS", "10");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.channel_timeout_secs, 10);
}

#[test]
fn store_path_override() {
    let mut map = full_env();
    map.insert("TAGPOINTS_STORE_PATH", "/tmp/points.json");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.store_path.to_str(), Some("/tmp/points.json"));
}

#[test]
fn store_path_resolves_without_associate_id() {
    let empty: HashMap<&str, &str> = HashMap::new();
    assert_eq!(
        store_path_with(&lookup_from_map(&empty)).to_str(),
        Some("./tagpoints-store.json")
    );

    let mut map = HashMap::new();
    map.insert("TAGPOINTS_STORE_PATH", "/var/lib/tagpoints/store.json");
    assert_eq!(
        store_path_with(&lookup_from_map(&map)).to_str(),
        Some("/var/lib/tagpoints/store.json")
    );
}
