use flexprice::config::{Config, PriceUnit};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("flexprice.yaml");

    let mut cfg = Config::default();
    cfg.source.use_known_values = true;
    cfg.source.known_api_base_url = "https://api.example/v1".to_string();
    cfg.source.known_api_key = "k".to_string();
    cfg.source.evcc_unit = PriceUnit::Cents;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded, cfg);
    assert!(fs::read_to_string(&path).unwrap().contains("evcc_unit: cents"));
}

#[test]
fn config_validation_errors() {
    // Missing scrape URL without known values
    let mut cfg = Config::default();
    cfg.source.scrape_page_url.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.source.scrape_timeout_seconds = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.source.api_timeout_seconds = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.logging.level = "LOUD".to_string();
    assert!(cfg.validate().is_err());

    // Empty timezone means system local time
    cfg = Config::default();
    cfg.source.timezone.clear();
    assert!(cfg.validate().is_ok());
    assert!(cfg.source.tz().unwrap().is_none());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"source: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn unknown_unit_in_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"source:\n  evcc_unit: millis\n").unwrap();
    assert!(Config::from_file(tmp.path()).is_err());
}
