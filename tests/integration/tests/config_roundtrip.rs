//! Config save/load roundtrip integration tests.

use msgbridge_core::config::Config;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.streams.incoming, config.streams.incoming);
    assert_eq!(loaded.streams.task_response, config.streams.task_response);
    assert_eq!(
        loaded.delivery.throttle_interval_ms,
        config.delivery.throttle_interval_ms
    );
    assert_eq!(loaded.attachments.default_mime, config.attachments.default_mime);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.streams.outgoing = "custom:outgoing".to_string();
    config.delivery.max_retries = 7;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.streams.outgoing, "custom:outgoing");
    assert_eq!(loaded.delivery.max_retries, 7);
}

#[test]
fn test_duplicate_stream_names_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.streams.outgoing = config.streams.incoming.clone();
    // save() does not validate; load() must refuse the file.
    config.save(&path).unwrap();

    assert!(Config::load(&path).is_err());
}
