//! Integration tests: config file persistence.

use std::path::PathBuf;

use roombot::config::{LogFormat, RoomBotConfig};

fn sample() -> RoomBotConfig {
    let mut config = RoomBotConfig::default();
    config.app.app_id = "cli_a1".into();
    config.app.app_secret = "from-file".into();
    config.bitable.app_token = "wikcnNode".into();
    config.bitable.is_wiki = true;
    config.bitable.task_table_id = "tblTask".into();
    config.bitable.room_config_table_id = "tblRoom".into();
    config.bitable.completed_table_id = "tblDone".into();
    config.rooms.room_level_ids = vec!["omb_floor5".into()];
    config.scheduler.poll_interval_secs = 300;
    config.scheduler.resume_existing_events = true;
    config.logging.format = LogFormat::Simple;
    config.logging.file = PathBuf::new();
    config
}

#[test]
fn config_roundtrips_via_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("roombot.toml");

    sample().save_to_file(&path).expect("save");
    let saved = std::fs::read_to_string(&path).expect("read back");
    assert!(saved.contains("file = \"\""), "saved config:\n{saved}");

    let restored = RoomBotConfig::from_file(&path).expect("load");

    assert_eq!(restored.app.app_id, "cli_a1");
    assert!(restored.bitable.is_wiki);
    assert_eq!(restored.bitable.completed_table_id, "tblDone");
    assert_eq!(restored.rooms.room_level_ids, vec!["omb_floor5"]);
    assert_eq!(restored.scheduler.poll_interval_secs, 300);
    assert!(restored.scheduler.resume_existing_events);
    assert_eq!(restored.logging.format, LogFormat::Simple);
    assert!(restored.logging.file_path().is_none());
    assert!(restored.validate().is_ok());
}

#[test]
fn empty_file_loads_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roombot.toml");
    std::fs::write(&path, "").expect("write");

    let config = RoomBotConfig::from_file(&path).expect("load");
    assert_eq!(config.scheduler.horizon_days, 7);
    assert_eq!(config.scheduler.utc_offset, "+08:00");
    assert!(config.validate().is_err());
}

#[test]
fn malformed_toml_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roombot.toml");
    std::fs::write(&path, "[scheduler\npoll_interval_secs = ").expect("write");

    let err = RoomBotConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().starts_with("config error"), "got {err}");
    assert!(err.is_fatal());
}
