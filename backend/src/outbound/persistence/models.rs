//! Internal Diesel row structs and their conversions to domain types.
//!
//! Rows never leave the persistence layer. Membership rows are decoded through
//! the closed role and status enumerations, so a row holding an unknown value
//! is rejected as a whole.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountStatus, InvalidEnumValue, Membership, MembershipId, Roles, Status,
    User, UserId,
};

use super::schema::{accounts, user_accounts, users};

/// Row read from `users`. The password hash is never selected.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub timezone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            timezone: row.timezone,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
        }
    }
}

/// Insert for `users`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub timezone: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row read from `accounts`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub region: String,
    pub country: String,
    pub zipcode: String,
    pub status: String,
    pub timezone: Option<String>,
    pub signup_user_id: Option<Uuid>,
    pub billing_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl AccountRow {
    /// Convert to the domain type; `None` when `status` is not recognised.
    pub fn into_domain(self) -> Option<Account> {
        let status = AccountStatus::parse(&self.status)?;
        Some(Account {
            id: AccountId::from_uuid(self.id),
            name: self.name,
            address1: self.address1,
            address2: self.address2,
            city: self.city,
            region: self.region,
            country: self.country,
            zipcode: self.zipcode,
            status,
            timezone: self.timezone,
            signup_user_id: self.signup_user_id.map(UserId::from_uuid),
            billing_user_id: self.billing_user_id.map(UserId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
            archived_at: self.archived_at,
        })
    }
}

/// Insert for `accounts`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub address1: &'a str,
    pub address2: Option<&'a str>,
    pub city: &'a str,
    pub region: &'a str,
    pub country: &'a str,
    pub zipcode: &'a str,
    pub status: &'a str,
    pub timezone: Option<&'a str>,
    pub signup_user_id: Option<Uuid>,
    pub billing_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row read from `user_accounts`, still in raw text form.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub roles: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = InvalidEnumValue;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MembershipId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            account_id: AccountId::from_uuid(row.account_id),
            roles: Roles::decode(&row.roles)?,
            status: Status::decode(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
        })
    }
}

/// Insert for `user_accounts`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_accounts)]
pub(crate) struct NewMembershipRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub roles: &'a [String],
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for `user_accounts`; `None` fields are left unchanged.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = user_accounts)]
pub(crate) struct MembershipChangeset<'a> {
    pub roles: Option<&'a [String]>,
    pub status: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}
