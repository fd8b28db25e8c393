//! Diesel table definitions for the tenancy schema.
//!
//! These must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered users. Email is unique case-insensitively.
    users (id) {
        id -> Uuid,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        /// Argon2 PHC string.
        password_hash -> Text,
        timezone -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Tenants. Name is unique among rows with `archived_at IS NULL`.
    accounts (id) {
        id -> Uuid,
        name -> Text,
        address1 -> Text,
        address2 -> Nullable<Text>,
        city -> Text,
        region -> Text,
        country -> Text,
        zipcode -> Text,
        /// One of `active`, `pending`, `disabled`.
        status -> Text,
        timezone -> Nullable<Text>,
        signup_user_id -> Nullable<Uuid>,
        billing_user_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Memberships joining users to accounts, unique per pair.
    user_accounts (id) {
        id -> Uuid,
        user_id -> Uuid,
        account_id -> Uuid,
        /// Non-empty subset of `admin`, `user`.
        roles -> Array<Text>,
        /// One of `active`, `invited`, `disabled`.
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(user_accounts -> users (user_id));
diesel::joinable!(user_accounts -> accounts (account_id));

diesel::allow_tables_to_appear_in_same_query!(users, accounts, user_accounts);
