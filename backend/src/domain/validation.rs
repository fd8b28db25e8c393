//! Request validation with uniqueness results threaded in as explicit context.
//!
//! Uniqueness needs I/O, so it cannot be a pure structural rule. Callers run
//! the lookups first, record each boolean in a [`UniquenessContext`] and then
//! invoke the declarative rules once. The `unique-email` and `unique-name`
//! rules only read that context and fail closed: a missing entry rejects the
//! field, so a wiring mistake can never admit a duplicate.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use validator::{ValidateArgs, ValidationError, ValidationErrors};

use super::ports::{MembershipRequest, MembershipUpdateRequest, SignupRequest};
use super::{AccountId, MembershipChanges, NewMembership, Role, Roles, Status, UserId};

/// Field value that always fails a uniqueness rule regardless of context.
pub const FORCED_FAILURE_SENTINEL: &str = "invalid";

/// Error code for "already taken", distinct from format errors.
pub const UNIQUE_CODE: &str = "unique";

/// Error code for a missing or blank value.
pub const REQUIRED_CODE: &str = "required";

/// Error code for a value outside a closed set.
pub const ONE_OF_CODE: &str = "one_of";

/// Error code for an identifier that is not a UUID.
pub const UUID_CODE: &str = "uuid";

/// Uniqueness rules whose outcome is computed before validation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UniquenessRule {
    /// No other user holds the email.
    Email,
    /// No other active account holds the name.
    AccountName,
}

impl UniquenessRule {
    /// Rule tag as referenced by the declarative rule set.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Email => "unique-email",
            Self::AccountName => "unique-name",
        }
    }
}

impl fmt::Display for UniquenessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Precomputed uniqueness outcomes handed to the validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniquenessContext {
    outcomes: BTreeMap<UniquenessRule, bool>,
}

impl UniquenessContext {
    /// Empty context; every uniqueness rule fails against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one lookup.
    #[must_use]
    pub fn with(mut self, rule: UniquenessRule, unique: bool) -> Self {
        self.outcomes.insert(rule, unique);
        self
    }

    /// Outcome recorded for `rule`, if any.
    pub fn outcome(&self, rule: UniquenessRule) -> Option<bool> {
        self.outcomes.get(&rule).copied()
    }
}

/// One failed constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Stable rule code (`required`, `email`, `unique`, `must_match`, ...).
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldError {
    /// Build an error from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the value is well formed but already taken.
    pub fn is_uniqueness(&self) -> bool {
        self.code == UNIQUE_CODE
    }
}

/// Aggregated field failures keyed by dotted field path (`user.email`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<FieldError>>);

impl FieldErrors {
    /// Empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, error: FieldError) {
        self.0.entry(field.into()).or_default().push(error);
    }

    /// Fold a `validator` report in, prefixing every field with `prefix`.
    pub fn absorb(&mut self, prefix: &str, report: &ValidationErrors) {
        for (field, errors) in report.field_errors() {
            let path = format!("{prefix}{field}");
            for error in errors.iter() {
                let code = error.code.to_string();
                let message = error
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| default_message(&path, &code));
                self.push(path.clone(), FieldError { code, message });
            }
        }
    }

    /// Failures recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[FieldError]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` failed with `code`.
    pub fn has(&self, field: &str, code: &str) -> bool {
        self.get(field)
            .is_some_and(|errors| errors.iter().any(|error| error.code == code))
    }

    /// Failed field paths in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when nothing failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// JSON form attached to domain errors as details.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, errors) in &self.0 {
            for error in errors {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{field}: {}", error.message)?;
            }
        }
        Ok(())
    }
}

fn default_message(field: &str, code: &str) -> String {
    match code {
        REQUIRED_CODE => format!("{field} is required"),
        UNIQUE_CODE => format!("{field} is already taken"),
        "email" => format!("{field} must be a valid email address"),
        "length" => format!("{field} has an invalid length"),
        "must_match" => format!("{field} does not match"),
        _ => format!("{field} is invalid"),
    }
}

/// `required` rule for text: rejects blank values.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(REQUIRED_CODE));
    }
    Ok(())
}

/// `unique-email` rule.
pub fn unique_email(value: &str, context: &UniquenessContext) -> Result<(), ValidationError> {
    check_unique(UniquenessRule::Email, value, context)
}

/// `unique-name` rule.
pub fn unique_name(value: &str, context: &UniquenessContext) -> Result<(), ValidationError> {
    check_unique(UniquenessRule::AccountName, value, context)
}

fn check_unique(
    rule: UniquenessRule,
    value: &str,
    context: &UniquenessContext,
) -> Result<(), ValidationError> {
    let passes = value != FORCED_FAILURE_SENTINEL && context.outcome(rule) == Some(true);
    if passes {
        return Ok(());
    }
    let mut error = ValidationError::new(UNIQUE_CODE);
    error.add_param("rule".into(), &rule.tag());
    Err(error)
}

/// Validator for every inbound request, built once at start-up and injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualValidator;

impl ContextualValidator {
    /// Build the validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate a signup against precomputed uniqueness outcomes.
    ///
    /// Fields are reported as `user.<field>` and `account.<field>`.
    pub fn validate_signup(
        &self,
        request: &SignupRequest,
        context: &UniquenessContext,
    ) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(report) = request.user.validate_with_args(context) {
            errors.absorb("user.", &report);
        }
        if let Err(report) = request.account.validate_with_args(context) {
            errors.absorb("account.", &report);
        }
        errors.into_result()
    }

    /// Validate and decode a membership invitation.
    pub fn validate_membership(
        &self,
        request: &MembershipRequest,
    ) -> Result<NewMembership, FieldErrors> {
        let mut errors = FieldErrors::new();
        let user_id = parse_id(&mut errors, "user_id", &request.user_id, |raw| UserId::new(raw));
        let account_id = parse_id(&mut errors, "account_id", &request.account_id, |raw| {
            AccountId::new(raw)
        });
        let roles = parse_roles(&mut errors, &request.roles);
        let status = parse_status(&mut errors, request.status.as_deref());

        match (user_id, account_id, roles, status) {
            (Some(user_id), Some(account_id), Some(roles), Some(status)) => Ok(NewMembership {
                user_id,
                account_id,
                roles,
                status,
            }),
            _ => Err(errors),
        }
    }

    /// Validate and decode a membership change.
    pub fn validate_membership_update(
        &self,
        request: &MembershipUpdateRequest,
    ) -> Result<(UserId, AccountId, MembershipChanges), FieldErrors> {
        let mut errors = FieldErrors::new();
        let user_id = parse_id(&mut errors, "user_id", &request.user_id, |raw| UserId::new(raw));
        let account_id = parse_id(&mut errors, "account_id", &request.account_id, |raw| {
            AccountId::new(raw)
        });
        let roles = match request.roles.as_deref() {
            Some(raw) => parse_roles(&mut errors, raw).map(Some),
            None => Some(None),
        };
        let status = parse_status(&mut errors, request.status.as_deref());

        match (user_id, account_id, roles, status) {
            (Some(user_id), Some(account_id), Some(roles), Some(status)) => {
                Ok((user_id, account_id, MembershipChanges { roles, status }))
            }
            _ => Err(errors),
        }
    }
}

fn parse_id<T, E>(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Option<T> {
    if raw.trim().is_empty() {
        errors.push(field, FieldError::new(REQUIRED_CODE, default_message(field, REQUIRED_CODE)));
        return None;
    }
    match parse(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, FieldError::new(UUID_CODE, format!("{field} must be a valid UUID")));
            None
        }
    }
}

fn parse_roles(errors: &mut FieldErrors, raw: &[String]) -> Option<Roles> {
    if raw.is_empty() {
        errors.push("roles", FieldError::new(REQUIRED_CODE, default_message("roles", REQUIRED_CODE)));
        return None;
    }
    match Roles::decode(raw) {
        Ok(roles) => Some(roles),
        Err(invalid) => {
            let allowed = Role::ALL.map(Role::encode).join(", ");
            errors.push(
                "roles",
                FieldError::new(ONE_OF_CODE, format!("`{}` is not one of {allowed}", invalid.value())),
            );
            None
        }
    }
}

fn parse_status(errors: &mut FieldErrors, raw: Option<&str>) -> Option<Option<Status>> {
    let Some(raw) = raw else {
        return Some(None);
    };
    match Status::decode(raw) {
        Ok(status) => Some(Some(status)),
        Err(invalid) => {
            let allowed = Status::ALL.map(Status::encode).join(", ");
            errors.push(
                "status",
                FieldError::new(ONE_OF_CODE, format!("`{}` is not one of {allowed}", invalid.value())),
            );
            None
        }
    }
}
