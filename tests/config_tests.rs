use mensa_bot::config::load_config;
use mensa_bot::model::ConfigError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn loads_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "mattermost_api_url": "https://chat.example.org",
            "user_email": "bot@example.org",
            "user_password": "secret",
            "team_name": "uni",
            "display_name": "MensaBot",
            "mention_name": "@mensabot",
            "channel_name_debug": "bot-debug",
            "channel_name_production": "mensa",
            "favorites": ["Currywurst"],
            "poll_interval_seconds": 5,
            "retry": {{ "max_retries": 1 }}
        }}"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.team_name, "uni");
    assert_eq!(config.favorites, vec!["currywurst"]);
    assert_eq!(config.poll_interval_seconds, 5);
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.retry.base_delay_ms, 500);
}

#[test]
fn missing_file_is_an_io_error() {
    let result = load_config("/definitely/not/here/config.json");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "mattermost_api_url": "https://chat.example.org",
            "user_email": "bot@example.org",
            "user_password": "secret",
            "team_name": "uni",
            "display_name": "MensaBot",
            "mention_name": "@mensabot",
            "channel_name_debug": "bot-debug",
            "channel_name_production": "mensa",
            "request_timeout_seconds": 0
        }}"#
    )
    .unwrap();

    assert!(matches!(load_config(file.path()), Err(ConfigError::Invalid(_))));
}
