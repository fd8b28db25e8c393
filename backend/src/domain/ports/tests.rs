use super::*;
use crate::domain::validation::{FieldError, FieldErrors, UNIQUE_CODE};
use crate::domain::{EnumKind, Error, ErrorCode, InvalidEnumValue};
use rstest::rstest;

#[rstest]
fn port_error_constructors_accept_str() {
    let err = UserCreationError::conflict("users_email_key");
    assert_eq!(err.to_string(), "user already exists: users_email_key");
    assert_eq!(err.kind(), "conflict");
}

#[rstest]
fn membership_enum_corruption_is_lifted_out_of_storage() {
    let invalid = InvalidEnumValue::new(EnumKind::Status, "suspended");
    let err = SignupError::from(MembershipRepositoryError::invalid_enum_value(invalid.clone()));
    assert_eq!(err, SignupError::InvalidEnumValue(invalid));
}

#[rstest]
fn other_membership_failures_stay_storage_errors() {
    let err = SignupError::from(MembershipRepositoryError::query("boom"));
    assert!(matches!(
        err,
        SignupError::Storage(StorageError::Membership(MembershipRepositoryError::Query { .. }))
    ));
}

#[rstest]
#[case(SignupError::from(UniquenessCheckError::connection("refused")), ErrorCode::ServiceUnavailable)]
#[case(SignupError::from(UniquenessCheckError::query("syntax")), ErrorCode::InternalError)]
#[case(SignupError::from(UserCreationError::conflict("email")), ErrorCode::Conflict)]
#[case(SignupError::from(AccountCreationError::conflict("name")), ErrorCode::Conflict)]
#[case(SignupError::from(MembershipRepositoryError::connection("gone")), ErrorCode::ServiceUnavailable)]
#[case(SignupError::Cancelled { stage: SignupStage::CreateUser }, ErrorCode::ServiceUnavailable)]
#[case(SignupError::DeadlineExceeded { stage: SignupStage::CheckEmail }, ErrorCode::ServiceUnavailable)]
#[case(
    SignupError::InvalidEnumValue(InvalidEnumValue::new(EnumKind::Role, "owner")),
    ErrorCode::InternalError
)]
fn signup_errors_map_to_domain_codes(#[case] err: SignupError, #[case] expected: ErrorCode) {
    assert_eq!(Error::from(err).code(), expected);
}

#[rstest]
fn validation_errors_carry_field_details() {
    let mut fields = FieldErrors::new();
    fields.push("user.email", FieldError::new(UNIQUE_CODE, "user.email is already taken"));

    let err = Error::from(SignupError::Validation(fields));

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    let details = err.details().expect("details present");
    assert_eq!(details["user.email"][0]["code"], UNIQUE_CODE);
}

#[rstest]
#[case(SignupError::from(UserCreationError::conflict("users_email_lower_key")), "conflict", false)]
#[case(SignupError::from(AccountCreationError::connection("refused")), "connection", false)]
#[case(SignupError::Validation(FieldErrors::new()), "validation", false)]
#[case(SignupError::Cancelled { stage: SignupStage::CreateUser }, "cancelled", true)]
#[case(
    SignupError::DeadlineExceeded { stage: SignupStage::CreateAccount },
    "deadline_exceeded",
    true
)]
fn signup_error_kind_and_interruption(
    #[case] err: SignupError,
    #[case] kind: &str,
    #[case] interrupted: bool,
) {
    assert_eq!(err.kind(), kind);
    assert_eq!(err.is_interrupted(), interrupted);
}

#[rstest]
fn stage_labels_are_snake_case() {
    assert_eq!(SignupStage::CheckAccountName.to_string(), "check_account_name");
    assert_eq!(
        SignupError::Cancelled { stage: SignupStage::CreateMembership }.to_string(),
        "signup cancelled during create_membership"
    );
}

#[rstest]
fn signup_user_debug_redacts_passwords() {
    let user = SignupUser {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        password: "hunter22".into(),
        password_confirm: "hunter22".into(),
    };
    let rendered = format!("{user:?}");
    assert!(!rendered.contains("hunter22"));
    assert!(rendered.contains("ada@example.com"));
}
