//! Integration test: `ROOMBOT_APP_SECRET` overrides the file's secret.
//!
//! Kept in its own test binary because it mutates the process environment.

use roombot::config::{APP_SECRET_ENV, RoomBotConfig};

#[test]
fn secret_env_var_overrides_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roombot.toml");

    let mut config = RoomBotConfig::default();
    config.app.app_id = "cli_a1".into();
    config.app.app_secret = "from-file".into();
    config.save_to_file(&path).expect("save");

    let loaded = RoomBotConfig::from_file(&path).expect("load");
    assert_eq!(loaded.app.app_secret, "from-file");

    // SAFETY: this is the only test in this binary.
    unsafe { std::env::set_var(APP_SECRET_ENV, "from-env") };
    let loaded = RoomBotConfig::from_file(&path);
    unsafe { std::env::remove_var(APP_SECRET_ENV) };

    assert_eq!(loaded.expect("load").app.app_secret, "from-env");
}
