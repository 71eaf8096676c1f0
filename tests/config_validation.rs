#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Configuration parsing and validation.

use module_protocol::{ControllerConfig, DiscoveryConfig, PeerConfig, ProtocolConfig};
use std::time::Duration;

#[test]
fn default_configuration_is_valid() {
    let config = ProtocolConfig::default();
    let errors = config.validate();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert!(config.validate_strict().is_ok());
}

#[test]
fn example_config_round_trips_through_toml() {
    let example = ProtocolConfig::example_config();
    let parsed = ProtocolConfig::from_toml(&example).unwrap();
    assert!(parsed.validate().is_empty());
    assert_eq!(
        parsed.controller.response_timeout,
        ControllerConfig::default().response_timeout
    );
}

#[test]
fn toml_overrides_are_applied() {
    let config = ProtocolConfig::from_toml(
        r#"
        [controller]
        response_timeout = 1500
        max_retries = 1
        sequence_tracking = false

        [discovery]
        broadcast_address = "192.168.1.255"
        port = 9000
        timeout = 2000
        attempts = 4

        [peer]
        bind_address = "0.0.0.0:9000"
        max_commands = 8
        "#,
    )
    .unwrap();

    assert_eq!(
        config.controller.response_timeout,
        Duration::from_millis(1500)
    );
    assert_eq!(config.controller.max_retries, 1);
    assert!(!config.controller.sequence_tracking);
    assert_eq!(config.discovery.broadcast_address, "192.168.1.255");
    assert_eq!(config.discovery.attempts, 4);
    assert_eq!(config.peer.max_commands, 8);
    assert!(config.validate().is_empty());
}

#[test]
fn invalid_toml_is_a_config_error() {
    assert!(ProtocolConfig::from_toml("controller = 3").is_err());
    assert!(ProtocolConfig::from_toml("[[[").is_err());
}

#[test]
fn controller_validation_catches_bad_timeouts() {
    for (timeout, valid) in [
        (Duration::from_millis(1), false),
        (Duration::from_secs(3600), false),
        (Duration::from_secs(5), true),
    ] {
        let config = ControllerConfig {
            response_timeout: timeout,
            ..ControllerConfig::default()
        };
        assert_eq!(config.validate().is_empty(), valid, "timeout {timeout:?}");
    }
}

#[test]
fn discovery_validation_catches_bad_values() {
    let config = DiscoveryConfig {
        broadcast_address: "not-an-address".to_string(),
        attempts: 0,
        port: 0,
        ..DiscoveryConfig::default()
    };

    let errors = config.validate();
    assert_eq!(errors.len(), 3, "unexpected errors: {errors:?}");
}

#[test]
fn peer_validation_catches_bad_values() {
    let config = PeerConfig {
        bind_address: "nowhere".to_string(),
        max_commands: 0,
    };

    let errors = config.validate();
    assert_eq!(errors.len(), 2, "unexpected errors: {errors:?}");
}

#[test]
fn validate_strict_reports_every_problem() {
    let config = ProtocolConfig::default_with_overrides(|config| {
        config.discovery.attempts = 0;
        config.peer.max_commands = 0;
    });

    match config.validate_strict() {
        Err(error) => {
            let text = error.to_string();
            assert!(text.contains("attempts"));
            assert!(text.contains("Max commands"));
        }
        Ok(()) => panic!("expected validation failure"),
    }
}

#[test]
fn env_overrides_are_applied() {
    std::env::set_var("MODULE_PROTOCOL_RESPONSE_TIMEOUT_MS", "1234");
    std::env::set_var("MODULE_PROTOCOL_MAX_RETRIES", "7");
    std::env::set_var("MODULE_PROTOCOL_BROADCAST_ADDRESS", "10.0.0.255");

    let config = ProtocolConfig::from_env().unwrap();
    assert_eq!(
        config.controller.response_timeout,
        Duration::from_millis(1234)
    );
    assert_eq!(config.controller.max_retries, 7);
    assert_eq!(config.discovery.broadcast_address, "10.0.0.255");

    std::env::remove_var("MODULE_PROTOCOL_RESPONSE_TIMEOUT_MS");
    std::env::remove_var("MODULE_PROTOCOL_MAX_RETRIES");
    std::env::remove_var("MODULE_PROTOCOL_BROADCAST_ADDRESS");
}
