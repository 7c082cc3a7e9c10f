//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use sleeping_ta::config::HallwayConfig;
use sleeping_ta::core::HallwayError;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_match_classic_demo() {
    let cfg = HallwayConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.seats, 3);
    assert_eq!(cfg.clients, 10);
    assert_eq!(cfg.service(), Duration::from_secs(2));
    assert_eq!(cfg.patience_range().min(), Duration::from_secs(1));
    assert_eq!(cfg.patience_range().max(), Duration::from_secs(3));
    assert_eq!(cfg.stop_target(), Some(10));
    assert_eq!(cfg.run_time(), None);
}

#[test]
fn test_zero_seats_is_invalid() {
    assert!(HallwayConfig::default().with_seats(0).validate().is_err());
}

#[test]
fn test_zero_clients_is_invalid() {
    assert!(HallwayConfig::default().with_clients(0).validate().is_err());
}

#[test]
fn test_reversed_patience_bounds_are_invalid() {
    let mut cfg = HallwayConfig::default();
    cfg.patience_min_ms = 5000;
    cfg.patience_max_ms = 1000;
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("patience_min_ms"));
}

#[test]
fn test_zero_service_is_invalid() {
    assert!(HallwayConfig::default().with_service_ms(0).validate().is_err());
}

#[test]
fn test_unreachable_target_is_invalid() {
    let cfg = HallwayConfig::default()
        .with_clients(3)
        .with_help_quota(Some(1))
        .with_served_target(Some(4));
    assert!(cfg.validate().unwrap_err().contains("unreachable"));

    // A run time makes it a valid, time-bounded run.
    assert!(cfg.with_run_time_secs(Some(5)).validate().is_ok());
}

#[test]
fn test_run_time_replaces_default_target() {
    let cfg = HallwayConfig::default().with_run_time_secs(Some(30));
    assert_eq!(cfg.stop_target(), None);
    assert_eq!(cfg.run_time(), Some(Duration::from_secs(30)));
}

#[test]
fn test_from_json_fills_missing_fields_with_defaults() {
    let cfg = HallwayConfig::from_json_str(r#"{ "seats": 5, "run_time_secs": 12 }"#).unwrap();
    assert_eq!(cfg.seats, 5);
    assert_eq!(cfg.clients, 10);
    assert_eq!(cfg.run_time_secs, Some(12));
}

#[test]
fn test_from_json_rejects_invalid_values() {
    let err = HallwayConfig::from_json_str(r#"{ "clients": 0 }"#).unwrap_err();
    assert!(matches!(err, HallwayError::InvalidConfig(_)));
}

#[test]
fn test_from_json_rejects_malformed_input() {
    let err = HallwayConfig::from_json_str("{ seats: ").unwrap_err();
    assert!(err.to_string().contains("parse error"));
}

#[test]
fn test_json_round_trip_preserves_fields() {
    let cfg = HallwayConfig::default()
        .with_help_quota(Some(2))
        .with_served_target(Some(15));
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(HallwayConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_env_overrides_defaults() {
    let cfg = HallwayConfig::from_vars(vars(&[
        ("HALLWAY_SEATS", "2"),
        ("HALLWAY_CLIENTS", "6"),
        ("HALLWAY_RUN_TIME_SECS", "20"),
        ("HALLWAY_HELP_QUOTA", " 1 "),
        ("HALLWAY_SERVED_TARGET", ""),
    ]))
    .unwrap();
    assert_eq!(cfg.seats, 2);
    assert_eq!(cfg.clients, 6);
    assert_eq!(cfg.run_time_secs, Some(20));
    assert_eq!(cfg.help_quota, Some(1));
    assert_eq!(cfg.served_target, None);
    assert_eq!(cfg.service_ms, 2000);
}

#[test]
fn test_env_parse_failure_names_the_variable() {
    let err = HallwayConfig::from_vars(vars(&[("HALLWAY_SEATS", "three")])).unwrap_err();
    assert!(matches!(err, HallwayError::InvalidConfig(_)));
    assert!(err.to_string().contains("HALLWAY_SEATS"));
}

#[test]
fn test_spawn_plan_follows_config() {
    let cfg = HallwayConfig::default()
        .with_clients(4)
        .with_think_ms(100, 200)
        .with_spawn_stagger_ms(7);
    let plan = cfg.spawn_plan();
    assert_eq!(plan.clients, 4);
    assert_eq!(plan.think.max(), Duration::from_millis(200));
    assert_eq!(plan.stagger, Duration::from_millis(7));
}
