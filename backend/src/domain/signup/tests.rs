//! Tests for the signup orchestrator.

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mockall::Sequence;
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use super::*;
use crate::domain::ports::{
    AccountCreationError, MembershipRepositoryError, MockAccountCreator,
    MockMembershipRepository, MockUniquenessChecker, MockUserCreator, SignupAccount, SignupUser,
    StorageError, UniquenessCheckError, UserCreationError,
};
use crate::domain::validation::UNIQUE_CODE;
use crate::domain::{
    Account, EnumKind, InvalidEnumValue, Membership, MembershipId, Role, Status, User,
};

type Service =
    SignupService<MockUniquenessChecker, MockUserCreator, MockAccountCreator, MockMembershipRepository>;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn request() -> SignupRequest {
    SignupRequest {
        user: SignupUser {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "Grace@Example.com".into(),
            password: "cobol-1959".into(),
            password_confirm: "cobol-1959".into(),
        },
        account: SignupAccount {
            name: "Harvard Mark I".into(),
            address1: "1 Oxford Street".into(),
            address2: None,
            city: "Cambridge".into(),
            region: "MA".into(),
            country: "US".into(),
            zipcode: "02138".into(),
            timezone: Some("America/New_York".into()),
        },
    }
}

fn user_from(request: &NewUser, now: DateTime<Utc>) -> User {
    User {
        id: UserId::random(),
        first_name: request.first_name.clone(),
        last_name: request.last_name.clone(),
        email: request.email.clone(),
        timezone: request.timezone.clone(),
        created_at: now,
        updated_at: now,
        archived_at: None,
    }
}

fn account_from(request: &NewAccount, now: DateTime<Utc>) -> Account {
    Account {
        id: AccountId::random(),
        name: request.name.clone(),
        address1: request.address1.clone(),
        address2: request.address2.clone(),
        city: request.city.clone(),
        region: request.region.clone(),
        country: request.country.clone(),
        zipcode: request.zipcode.clone(),
        status: request.status.unwrap_or_default(),
        timezone: request.timezone.clone(),
        signup_user_id: request.signup_user_id,
        billing_user_id: request.billing_user_id,
        created_at: now,
        updated_at: now,
        archived_at: None,
    }
}

fn membership_from(request: &NewMembership, now: DateTime<Utc>) -> Membership {
    Membership {
        id: MembershipId::random(),
        user_id: request.user_id,
        account_id: request.account_id,
        roles: request.roles.clone(),
        status: request.effective_status(),
        created_at: now,
        updated_at: now,
        archived_at: None,
    }
}

fn uniqueness(email_unique: bool, name_unique: bool) -> MockUniquenessChecker {
    let mut checker = MockUniquenessChecker::new();
    checker
        .expect_is_email_unique()
        .times(1)
        .returning(move |_, _| Ok(email_unique));
    checker
        .expect_is_account_name_unique()
        .times(1)
        .returning(move |_, _| Ok(name_unique));
    checker
}

fn untouched_creators() -> (MockUserCreator, MockAccountCreator, MockMembershipRepository) {
    let mut users = MockUserCreator::new();
    users.expect_create().never();
    let mut accounts = MockAccountCreator::new();
    accounts.expect_create().never();
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();
    (users, accounts, memberships)
}

fn service(
    checker: MockUniquenessChecker,
    users: MockUserCreator,
    accounts: MockAccountCreator,
    memberships: MockMembershipRepository,
) -> Service {
    SignupService::new(
        Arc::new(checker),
        Arc::new(users),
        Arc::new(accounts),
        Arc::new(memberships),
        ContextualValidator::new(),
    )
}

#[rstest]
#[tokio::test]
async fn happy_path_creates_user_account_and_admin_membership(
    request: SignupRequest,
    now: DateTime<Utc>,
) {
    let mut seq = Sequence::new();
    let mut checker = MockUniquenessChecker::new();
    checker
        .expect_is_email_unique()
        .withf(|email, exclude| email == "grace@example.com" && exclude.is_none())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(true));
    checker
        .expect_is_account_name_unique()
        .withf(|name, exclude| name == "Harvard Mark I" && exclude.is_none())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(true));

    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .withf(|_, user, _| {
            user.email == "grace@example.com"
                && user.timezone.as_deref() == Some("America/New_York")
                && user.password.as_str() == "cobol-1959"
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, user, at| Ok(user_from(user, at)));

    let mut accounts = MockAccountCreator::new();
    accounts
        .expect_create()
        .withf(|_, account, _| {
            account.status == Some(AccountStatus::Active)
                && account.signup_user_id.is_some()
                && account.signup_user_id == account.billing_user_id
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, account, at| Ok(account_from(account, at)));

    let mut memberships = MockMembershipRepository::new();
    memberships
        .expect_create()
        .withf(|_, membership, _| {
            membership.roles.as_slice() == [Role::Admin] && membership.status.is_none()
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, membership, at| Ok(membership_from(membership, at)));

    let result = service(checker, users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect("signup succeeds");

    assert_eq!(result.account.signup_user_id, Some(result.user.id));
    assert_eq!(result.account.billing_user_id, Some(result.user.id));
    assert_eq!(result.account.status, AccountStatus::Active);
    assert_eq!(result.user.email, "grace@example.com");
    assert_eq!(result.user.created_at, now);
}

#[rstest]
#[tokio::test]
async fn membership_defaults_to_active_status(request: SignupRequest, now: DateTime<Utc>) {
    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .returning(|_, user, at| Ok(user_from(user, at)));
    let mut accounts = MockAccountCreator::new();
    accounts
        .expect_create()
        .returning(|_, account, at| Ok(account_from(account, at)));
    let mut memberships = MockMembershipRepository::new();
    memberships
        .expect_create()
        .withf(|_, membership, _| membership.effective_status() == Status::Active)
        .times(1)
        .returning(|_, membership, at| Ok(membership_from(membership, at)));

    service(uniqueness(true, true), users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect("signup succeeds");
}

#[rstest]
#[case(false, true, "user.email")]
#[case(true, false, "account.name")]
#[tokio::test]
async fn duplicate_values_fail_validation_without_writes(
    request: SignupRequest,
    now: DateTime<Utc>,
    #[case] email_unique: bool,
    #[case] name_unique: bool,
    #[case] field: &str,
) {
    let (users, accounts, memberships) = untouched_creators();

    let err = service(uniqueness(email_unique, name_unique), users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect_err("duplicate rejected");

    let SignupError::Validation(fields) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(fields.has(field, UNIQUE_CODE));
    assert_eq!(fields.fields().count(), 1);
}

#[rstest]
#[tokio::test]
async fn uniqueness_storage_failure_stops_before_validation(
    mut request: SignupRequest,
    now: DateTime<Utc>,
) {
    // An invalid email would fail validation if it were ever reached.
    request.user.email = "not-an-email".into();
    let mut checker = MockUniquenessChecker::new();
    checker
        .expect_is_email_unique()
        .times(1)
        .returning(|_, _| Err(UniquenessCheckError::connection("connection refused")));
    checker.expect_is_account_name_unique().never();
    let (users, accounts, memberships) = untouched_creators();

    let err = service(checker, users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect_err("storage failure");

    assert_eq!(
        err,
        SignupError::Storage(StorageError::Uniqueness(UniquenessCheckError::connection(
            "connection refused"
        )))
    );
}

#[rstest]
#[tokio::test]
async fn user_conflict_is_surfaced_unchanged(request: SignupRequest, now: DateTime<Utc>) {
    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .times(1)
        .returning(|_, _, _| Err(UserCreationError::conflict("users_email_lower_key")));
    let mut accounts = MockAccountCreator::new();
    accounts.expect_create().never();
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();

    let err = service(uniqueness(true, true), users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect_err("race lost");

    assert!(matches!(
        err,
        SignupError::Storage(StorageError::UserCreation(UserCreationError::Conflict { .. }))
    ));
}

#[rstest]
#[tokio::test]
async fn account_failure_skips_membership(request: SignupRequest, now: DateTime<Utc>) {
    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .times(1)
        .returning(|_, user, at| Ok(user_from(user, at)));
    let mut accounts = MockAccountCreator::new();
    accounts
        .expect_create()
        .times(1)
        .returning(|_, _, _| Err(AccountCreationError::query("disk full")));
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();

    let err = service(uniqueness(true, true), users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect_err("account failure");

    assert_eq!(
        err,
        SignupError::Storage(StorageError::AccountCreation(AccountCreationError::query(
            "disk full"
        )))
    );
}

#[rstest]
#[tokio::test]
async fn corrupt_membership_row_is_reported_as_invalid_enum(
    request: SignupRequest,
    now: DateTime<Utc>,
) {
    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .returning(|_, user, at| Ok(user_from(user, at)));
    let mut accounts = MockAccountCreator::new();
    accounts
        .expect_create()
        .returning(|_, account, at| Ok(account_from(account, at)));
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().times(1).returning(|_, _, _| {
        Err(MembershipRepositoryError::invalid_enum_value(
            InvalidEnumValue::new(EnumKind::Role, "owner"),
        ))
    });

    let err = service(uniqueness(true, true), users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect_err("corrupt row");

    assert_eq!(
        err,
        SignupError::InvalidEnumValue(InvalidEnumValue::new(EnumKind::Role, "owner"))
    );
}

#[rstest]
#[tokio::test]
async fn cancelled_scope_runs_no_stage(request: SignupRequest, now: DateTime<Utc>) {
    let mut checker = MockUniquenessChecker::new();
    checker.expect_is_email_unique().never();
    checker.expect_is_account_name_unique().never();
    let (users, accounts, memberships) = untouched_creators();
    let token = CancellationToken::new();
    token.cancel();

    let err = service(checker, users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::new(token))
        .await
        .expect_err("cancelled");

    assert_eq!(
        err,
        SignupError::Cancelled {
            stage: SignupStage::CheckEmail
        }
    );
}

/// User creator whose insert never completes.
struct StalledUsers;

#[async_trait]
impl UserCreator for StalledUsers {
    async fn create(
        &self,
        _claims: &Claims,
        _request: &NewUser,
        _now: DateTime<Utc>,
    ) -> Result<User, UserCreationError> {
        std::future::pending().await
    }
}

#[rstest]
#[tokio::test]
async fn deadline_names_the_interrupted_stage(request: SignupRequest, now: DateTime<Utc>) {
    let mut accounts = MockAccountCreator::new();
    accounts.expect_create().never();
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();
    let service = SignupService::new(
        Arc::new(uniqueness(true, true)),
        Arc::new(StalledUsers),
        Arc::new(accounts),
        Arc::new(memberships),
        ContextualValidator::new(),
    );
    let scope = CancellationScope::unbounded().with_timeout(Duration::from_millis(20));

    let err = service
        .signup(&Claims::anonymous(), request, now, &scope)
        .await
        .expect_err("deadline exceeded");

    assert_eq!(
        err,
        SignupError::DeadlineExceeded {
            stage: SignupStage::CreateUser
        }
    );
}

/// Account creator whose insert never completes.
struct StalledAccounts;

#[async_trait]
impl AccountCreator for StalledAccounts {
    async fn create(
        &self,
        _claims: &Claims,
        _request: &NewAccount,
        _now: DateTime<Utc>,
    ) -> Result<Account, AccountCreationError> {
        std::future::pending().await
    }
}

/// Records every `warn` event as `field=value` pairs.
#[derive(Clone, Default)]
struct WarningCapture(Arc<Mutex<Vec<String>>>);

impl WarningCapture {
    fn lines(&self) -> Vec<String> {
        self.0.lock().expect("capture lock").clone()
    }
}

impl<S: Subscriber> Layer<S> for WarningCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut line = String::new();
        event.record(&mut LineVisitor(&mut line));
        self.0.lock().expect("capture lock").push(line);
    }
}

struct LineVisitor<'a>(&'a mut String);

impl Visit for LineVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

fn capture_warnings() -> (WarningCapture, tracing::subscriber::DefaultGuard) {
    let capture = WarningCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

#[rstest]
#[case(None, SignupError::Cancelled { stage: SignupStage::CreateUser }, Leftovers::PossiblyWritten)]
#[case(
    Some(UserId::random()),
    SignupError::DeadlineExceeded { stage: SignupStage::CreateAccount },
    Leftovers::PossiblyWritten
)]
#[case(
    Some(UserId::random()),
    SignupError::from(AccountCreationError::query("disk full")),
    Leftovers::Orphaned
)]
#[case(
    None,
    SignupError::from(UserCreationError::conflict("users_email_lower_key")),
    Leftovers::Nothing
)]
fn failed_stages_classify_their_leftovers(
    #[case] user_id: Option<UserId>,
    #[case] error: SignupError,
    #[case] expected: Leftovers,
) {
    assert_eq!(leftovers(user_id, &error), expected);
}

#[rstest]
#[tokio::test]
async fn interrupted_user_insert_is_logged_as_possibly_written(
    request: SignupRequest,
    now: DateTime<Utc>,
) {
    let (capture, _guard) = capture_warnings();
    let mut accounts = MockAccountCreator::new();
    accounts.expect_create().never();
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();
    let service = SignupService::new(
        Arc::new(uniqueness(true, true)),
        Arc::new(StalledUsers),
        Arc::new(accounts),
        Arc::new(memberships),
        ContextualValidator::new(),
    );
    let scope = CancellationScope::unbounded().with_timeout(Duration::from_millis(20));

    service
        .signup(&Claims::anonymous(), request, now, &scope)
        .await
        .expect_err("deadline exceeded");

    let lines = capture.lines();
    assert_eq!(lines.len(), 1, "warnings: {lines:?}");
    assert!(lines[0].contains("possibly written"));
    assert!(lines[0].contains("email=grace@example.com"));
    assert!(lines[0].contains("error_kind=\"deadline_exceeded\""));
}

#[rstest]
#[tokio::test]
async fn interrupted_account_insert_names_the_orphaned_user(
    request: SignupRequest,
    now: DateTime<Utc>,
) {
    let (capture, _guard) = capture_warnings();
    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .times(1)
        .returning(|_, user, at| Ok(user_from(user, at)));
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();
    let service = SignupService::new(
        Arc::new(uniqueness(true, true)),
        Arc::new(users),
        Arc::new(StalledAccounts),
        Arc::new(memberships),
        ContextualValidator::new(),
    );
    let token = CancellationToken::new();
    let scope = CancellationScope::new(token.clone());
    let cancel_soon = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };

    let claims = Claims::anonymous();
    let (outcome, ()) = tokio::join!(
        service.signup(&claims, request, now, &scope),
        cancel_soon
    );

    assert_eq!(
        outcome.expect_err("cancelled"),
        SignupError::Cancelled {
            stage: SignupStage::CreateAccount
        }
    );
    let lines = capture.lines();
    assert_eq!(lines.len(), 1, "warnings: {lines:?}");
    assert!(lines[0].contains("possibly written"));
    assert!(lines[0].contains("user_id=Some("));
    assert!(lines[0].contains("account_id=None"));
}

#[rstest]
#[tokio::test]
async fn user_conflict_logs_no_orphans(request: SignupRequest, now: DateTime<Utc>) {
    let (capture, _guard) = capture_warnings();
    let mut users = MockUserCreator::new();
    users
        .expect_create()
        .times(1)
        .returning(|_, _, _| Err(UserCreationError::conflict("users_email_lower_key")));
    let mut accounts = MockAccountCreator::new();
    accounts.expect_create().never();
    let mut memberships = MockMembershipRepository::new();
    memberships.expect_create().never();

    service(uniqueness(true, true), users, accounts, memberships)
        .signup(&Claims::anonymous(), request, now, &CancellationScope::unbounded())
        .await
        .expect_err("race lost");

    assert!(capture.lines().is_empty());
}
