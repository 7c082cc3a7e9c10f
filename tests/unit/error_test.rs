//! Tests for error types

use sleeping_ta::core::HallwayError;
use sleeping_ta::util::ClientId;

#[test]
fn test_seat_unavailable_error() {
    let err = HallwayError::SeatUnavailable;
    assert_eq!(format!("{}", err), "no seat available");
    assert!(err.is_expected());
}

#[test]
fn test_patience_expired_error() {
    let err = HallwayError::PatienceExpired;
    assert_eq!(format!("{}", err), "patience expired");
    assert!(err.is_expected());
}

#[test]
fn test_duplicate_client_error() {
    let err = HallwayError::DuplicateClient(ClientId(7));
    assert_eq!(format!("{}", err), "client 7 is already in the waiting room");
    assert!(!err.is_expected());
}

#[test]
fn test_invalid_config_error() {
    let err = HallwayError::InvalidConfig("seats must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: seats must be greater than 0"
    );
}

#[test]
fn test_io_error_converts_to_spawn() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
    let err: HallwayError = io.into();
    assert!(matches!(err, HallwayError::Spawn(_)));
    assert_eq!(format!("{}", err), "failed to spawn thread: no threads left");
}

#[test]
fn test_errors_wrap_into_anyhow() {
    let result: sleeping_ta::core::AppResult<()> = Err(HallwayError::Cancelled.into());
    let err = result.unwrap_err();
    assert!(err.downcast_ref::<HallwayError>().is_some());
}
