//! Tests for configuration loading

use std::fs;

use mirror_meta::{load_config, DiscoveryQuery, Error, MirrorConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[rstest]
#[case(
    "mirror.toml",
    "enabled = true\ndiscovery_queries = [\"tag|mirror:Mirror\", \"type|page\"]\nrescan_on_move = false\n"
)]
#[case(
    "mirror.json",
    r#"{"enabled": true, "discovery_queries": ["tag|mirror:Mirror", "type|page"], "rescan_on_move": false}"#
)]
#[case(
    "mirror.yaml",
    "enabled: true\ndiscovery_queries:\n  - tag|mirror:Mirror\n  - type|page\nrescan_on_move: false\n"
)]
fn test_load_config_in_every_format(#[case] name: &str, #[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, name, content);

    let config = load_config(&path).unwrap();
    assert_eq!(
        config,
        MirrorConfig {
            enabled: true,
            discovery_queries: vec![DiscoveryQuery::marker(), DiscoveryQuery::new("type", "page")],
            rescan_on_move: false,
        }
    );
}

#[test]
fn test_missing_fields_use_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "mirror.toml", "enabled = true\n");

    let config = load_config(&path).unwrap();
    assert!(config.enabled);
    assert!(config.rescan_on_move);
    assert_eq!(config.discovery_queries, vec![DiscoveryQuery::marker()]);
}

#[test]
fn test_malformed_query_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "mirror.toml",
        "enabled = true\ndiscovery_queries = [\"no-separator\"]\n",
    );

    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, Error::Store(_)), "got: {:?}", err);
    assert!(err.to_string().contains("no-separator"), "got: {}", err);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound { .. }));
}

#[test]
fn test_config_serializes_queries_as_strings() {
    let config = MirrorConfig::enabled();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains(r#""tag|mirror:Mirror""#), "got: {}", json);

    let toml = toml::to_string(&config).unwrap();
    let back: MirrorConfig = toml::from_str(&toml).unwrap();
    assert_eq!(back, config);
}
