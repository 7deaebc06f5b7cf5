//! Integration tests for configuration parsing and handling.
//!
//! These tests verify that configuration loaded from TOML and from
//! environment variables reaches request handling.

use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;

use quickview::memory::{MemorySerializer, MemorySource};
use quickview::{EntitySchema, ErrorCode, MapEnvSource, QuickConfig, QuickRequest, QuickViewSet, record};

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config = QuickConfig::from_toml_str("").expect("Failed to parse config");
    assert_eq!(config, QuickConfig::default());
    assert_eq!(config.datetime_format, "%Y/%m/%d");
    assert!(config.handle_datetimes);
    assert_eq!(config.page_size_param, "page_size");
    assert_eq!(config.default_page_size, None);
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r#"
        always_quick = true
        datetime_format = "%d.%m.%Y %H:%M"
        handle_datetimes = false
        page_size_param = "limit"
        quick_param = "flat"
        page_param = "p"
        default_page_size = 25
        max_page_size = 100
    "#;

    let config = QuickConfig::from_toml_str(config_str).expect("Failed to parse config");

    assert!(config.always_quick);
    assert_eq!(config.datetime_format, "%d.%m.%Y %H:%M");
    assert!(!config.handle_datetimes);
    assert_eq!(config.page_size_param, "limit");
    assert_eq!(config.quick_param, "flat");
    assert_eq!(config.page_param, "p");
    assert_eq!(config.default_page_size, Some(25));
    assert_eq!(config.max_page_size, Some(100));
}

/// Test loading configuration from a file
#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quickview.toml");
    std::fs::write(&path, "always_quick = true\nmax_page_size = 40\n").unwrap();

    let config = QuickConfig::load(&path).unwrap();
    assert!(config.always_quick);
    assert_eq!(config.max_page_size, Some(40));

    let err = QuickConfig::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(err.is_configuration_error());
}

/// Test that invalid values are rejected at load
#[test]
fn test_config_rejects_invalid_values() {
    for config_str in [
        r#"datetime_format = "%Y/%Q""#,
        r#"datetime_format = "%Y %z""#,
        r#"quick_param = """#,
        r#"page_size_param = "page""#,
        "default_page_size = 0",
        "default_page_size = 50\nmax_page_size = 10",
        "always_quick = \"maybe\"",
    ] {
        let err = QuickConfig::from_toml_str(config_str).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration, "{config_str}");
    }
}

/// Test environment overrides on top of file configuration
#[test]
fn test_env_overrides() {
    let file = QuickConfig::from_toml_str("quick_param = \"flat\"\nmax_page_size = 20").unwrap();
    let env = MapEnvSource::new()
        .set("QUICKVIEW_ALWAYS_QUICK", "yes")
        .set("QUICKVIEW_DATETIME_FORMAT", "%Y")
        .set("QUICKVIEW_DEFAULT_PAGE_SIZE", "5");

    let config = file.with_env(&env).unwrap();
    assert!(config.always_quick);
    assert_eq!(config.datetime_format, "%Y");
    assert_eq!(config.quick_param, "flat");
    assert_eq!(config.default_page_size, Some(5));
    assert_eq!(config.max_page_size, Some(20));

    let bad = MapEnvSource::new().set("QUICKVIEW_MAX_PAGE_SIZE", "many");
    assert!(QuickConfig::default().with_env(&bad).is_err());
}

/// Test that configured names and formats shape responses
#[tokio::test]
async fn test_config_applies_to_requests() {
    let schema = EntitySchema::new("event").scalar("title").scalar("starts");
    let source = Arc::new(MemorySource::new().with_schema(schema.clone()));
    let starts = NaiveDate::from_ymd_opt(2025, 7, 14)
        .and_then(|d| d.and_hms_opt(20, 0, 0))
        .unwrap();
    source
        .insert("event", record! { "title" => "Launch", "starts" => starts })
        .unwrap();

    let config = QuickConfig::from_toml_str("quick_param = \"flat\"\ndatetime_format = \"%d.%m.%Y\"").unwrap();
    let viewset = QuickViewSet::new(
        Arc::new(MemorySerializer::new(source.clone(), schema)),
        source,
        Arc::new(config),
    )
    .unwrap();

    let body = viewset
        .list(&QuickRequest::get().with_param("flat", "true"))
        .await
        .unwrap()
        .body
        .unwrap();
    assert_eq!(body, json!([{"id": 1, "title": "Launch", "starts": "14.07.2025"}]));

    // the default parameter name no longer toggles quick mode
    let body = viewset
        .list(&QuickRequest::get().with_param("quick", "true"))
        .await
        .unwrap()
        .body
        .unwrap();
    assert_eq!(body, json!([{"id": 1, "title": "Launch", "starts": "2025-07-14T20:00:00"}]));
}
