use std::path::PathBuf;

use taskmaster::error::{exit_codes, Error, JsonError, INTERNAL_MESSAGE};

#[test]
fn exit_codes_map_correctly() {
    assert_eq!(Error::MissingTitle.exit_code(), exit_codes::VALIDATION);
    assert_eq!(
        Error::TaskNotFound("01abc".to_string()).exit_code(),
        exit_codes::NOT_FOUND
    );
    assert_eq!(
        Error::CategoryInUse {
            name: "Work".to_string(),
            tasks: 2
        }
        .exit_code(),
        exit_codes::CONFLICT
    );
    assert_eq!(
        Error::LockFailed(PathBuf::from("db.json.lock")).exit_code(),
        exit_codes::INTERNAL
    );
}

#[test]
fn json_error_hides_internal_detail() {
    let err = Error::OperationFailed("disk exploded at /home/me".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::INTERNAL);
    assert_eq!(json.kind, "internal");
    assert_eq!(json.error, INTERNAL_MESSAGE);
}

#[test]
fn json_error_keeps_validation_detail() {
    let err: Error = "sideways"
        .parse::<taskmaster::task::TaskStatus>()
        .expect_err("invalid status");
    let json = JsonError::from(&err);
    assert_eq!(json.kind, "validation");
    assert!(json.error.contains("sideways"));
    let details = json.details.expect("details");
    assert_eq!(details["field"], "status");
}
