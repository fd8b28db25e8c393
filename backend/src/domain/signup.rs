//! Signup orchestration service.
//!
//! Stages run strictly in order with no retries:
//! 1. email uniqueness lookup;
//! 2. account name uniqueness lookup;
//! 3. validation with both outcomes in the context;
//! 4. user, then account (signup and billing user are the new user);
//! 5. admin membership joining the two.
//!
//! Stages 4 and 5 are not compensated. A failure there leaves the rows
//! already written and is logged at `warn` with their identifiers. A stage
//! abandoned by cancellation or deadline may still have committed its own
//! row, so that case is logged as well, keyed by email when no id is known.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::domain::cancellation::{CancellationScope, Interrupted};
use crate::domain::ports::{
    AccountCreator, MembershipRepository, SignupCommand, SignupError, SignupRequest,
    SignupResult, SignupStage, UniquenessChecker, UserCreator,
};
use crate::domain::validation::{ContextualValidator, UniquenessContext, UniquenessRule};
use crate::domain::{
    AccountId, AccountStatus, Claims, NewAccount, NewMembership, NewUser, Roles, UserId,
    normalize_email,
};

/// Domain service implementing [`SignupCommand`].
#[derive(Clone)]
pub struct SignupService<Q, U, A, M> {
    uniqueness: Arc<Q>,
    users: Arc<U>,
    accounts: Arc<A>,
    memberships: Arc<M>,
    validator: ContextualValidator,
}

impl<Q, U, A, M> SignupService<Q, U, A, M> {
    /// Create a new signup service.
    pub fn new(
        uniqueness: Arc<Q>,
        users: Arc<U>,
        accounts: Arc<A>,
        memberships: Arc<M>,
        validator: ContextualValidator,
    ) -> Self {
        Self {
            uniqueness,
            users,
            accounts,
            memberships,
            validator,
        }
    }
}

impl<Q, U, A, M> SignupService<Q, U, A, M>
where
    Q: UniquenessChecker,
    U: UserCreator,
    A: AccountCreator,
    M: MembershipRepository,
{
    /// Run one signup end to end.
    pub async fn signup(
        &self,
        claims: &Claims,
        request: SignupRequest,
        now: DateTime<Utc>,
        scope: &CancellationScope,
    ) -> Result<SignupResult, SignupError> {
        let email = normalize_email(&request.user.email);
        let account_name = request.account.name.trim().to_owned();

        let email_unique = guarded(
            scope,
            SignupStage::CheckEmail,
            self.uniqueness.is_email_unique(&email, None),
        )
        .await?;
        let name_unique = guarded(
            scope,
            SignupStage::CheckAccountName,
            self.uniqueness.is_account_name_unique(&account_name, None),
        )
        .await?;

        let context = UniquenessContext::new()
            .with(UniquenessRule::Email, email_unique)
            .with(UniquenessRule::AccountName, name_unique);
        self.validator
            .validate_signup(&request, &context)
            .map_err(SignupError::Validation)?;

        let SignupRequest { user, account } = request;
        let new_user = NewUser {
            first_name: user.first_name.trim().to_owned(),
            last_name: user.last_name.trim().to_owned(),
            email,
            password: Zeroizing::new(user.password),
            timezone: account.timezone.clone(),
        };
        let created_user = guarded(
            scope,
            SignupStage::CreateUser,
            self.users.create(claims, &new_user, now),
        )
        .await
        .inspect_err(|error| {
            report_partial_signup(SignupStage::CreateUser, &new_user.email, None, None, error);
        })?;

        let new_account = NewAccount {
            name: account_name,
            address1: account.address1,
            address2: account.address2,
            city: account.city,
            region: account.region,
            country: account.country,
            zipcode: account.zipcode,
            status: Some(AccountStatus::Active),
            timezone: account.timezone,
            signup_user_id: Some(created_user.id),
            billing_user_id: Some(created_user.id),
        };
        let created_account = guarded(
            scope,
            SignupStage::CreateAccount,
            self.accounts.create(claims, &new_account, now),
        )
        .await
        .inspect_err(|error| {
            report_partial_signup(
                SignupStage::CreateAccount,
                &created_user.email,
                Some(created_user.id),
                None,
                error,
            );
        })?;

        let new_membership = NewMembership {
            user_id: created_user.id,
            account_id: created_account.id,
            roles: Roles::admin(),
            status: None,
        };
        guarded(
            scope,
            SignupStage::CreateMembership,
            self.memberships.create(claims, &new_membership, now),
        )
        .await
        .inspect_err(|error| {
            report_partial_signup(
                SignupStage::CreateMembership,
                &created_user.email,
                Some(created_user.id),
                Some(created_account.id),
                error,
            );
        })?;

        info!(
            user_id = %created_user.id,
            account_id = %created_account.id,
            "signup completed"
        );
        Ok(SignupResult {
            user: created_user,
            account: created_account,
        })
    }
}

#[async_trait]
impl<Q, U, A, M> SignupCommand for SignupService<Q, U, A, M>
where
    Q: UniquenessChecker,
    U: UserCreator,
    A: AccountCreator,
    M: MembershipRepository,
{
    async fn signup(
        &self,
        claims: &Claims,
        request: SignupRequest,
        now: DateTime<Utc>,
        scope: &CancellationScope,
    ) -> Result<SignupResult, SignupError> {
        SignupService::signup(self, claims, request, now, scope).await
    }
}

async fn guarded<T, E, F>(
    scope: &CancellationScope,
    stage: SignupStage,
    future: F,
) -> Result<T, SignupError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<SignupError>,
{
    match scope.run(future).await {
        Ok(outcome) => outcome.map_err(Into::into),
        Err(Interrupted::Cancelled) => Err(SignupError::Cancelled { stage }),
        Err(Interrupted::DeadlineExceeded) => Err(SignupError::DeadlineExceeded { stage }),
    }
}

/// What a failed creation stage may have left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leftovers {
    /// Nothing was written.
    Nothing,
    /// Rows from earlier stages exist.
    Orphaned,
    /// The interrupted stage's row may exist, beside any earlier rows.
    PossiblyWritten,
}

fn leftovers(user_id: Option<UserId>, error: &SignupError) -> Leftovers {
    if error.is_interrupted() {
        Leftovers::PossiblyWritten
    } else if user_id.is_some() {
        Leftovers::Orphaned
    } else {
        Leftovers::Nothing
    }
}

fn report_partial_signup(
    stage: SignupStage,
    email: &str,
    user_id: Option<UserId>,
    account_id: Option<AccountId>,
    error: &SignupError,
) {
    match leftovers(user_id, error) {
        Leftovers::Nothing => {}
        Leftovers::Orphaned => warn!(
            %stage,
            %email,
            user_id = ?user_id,
            account_id = ?account_id,
            error_kind = error.kind(),
            error = %error,
            "signup stopped after partial creation; created rows are orphaned"
        ),
        Leftovers::PossiblyWritten => warn!(
            %stage,
            %email,
            user_id = ?user_id,
            account_id = ?account_id,
            error_kind = error.kind(),
            error = %error,
            "signup interrupted mid-write; the row for this stage was possibly written"
        ),
    }
}

#[cfg(test)]
mod tests;
