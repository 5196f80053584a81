//! Refresh token query builders.
//!
//! The `refresh_token` column holds the SHA-256 digest of the token handed to
//! the client, never the token itself.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{Tokens, Users};

/// Insert refresh token.
pub fn insert(
    token_hash: &str,
    username: &str,
    device_name: &str,
    created_time: &str,
    expiry_time: &str,
) -> Built {
    Query::insert()
        .into_table(Tokens::Table)
        .columns([
            Tokens::RefreshToken,
            Tokens::Username,
            Tokens::DeviceName,
            Tokens::CreatedTime,
            Tokens::ExpiryTime,
        ])
        .values_panic([
            token_hash.into(),
            username.into(),
            device_name.into(),
            created_time.into(),
            expiry_time.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Lookup refresh token with user join
/// (returns username, display_name, device_name, expiry_time).
pub fn lookup(token_hash: &str) -> Built {
    Query::select()
        .column((Tokens::Table, Tokens::Username))
        .column((Users::Table, Users::DisplayName))
        .column((Tokens::Table, Tokens::DeviceName))
        .column((Tokens::Table, Tokens::ExpiryTime))
        .from(Tokens::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Username)).equals((Tokens::Table, Tokens::Username)),
        )
        .and_where(Expr::col((Tokens::Table, Tokens::RefreshToken)).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// Delete refresh token by hash.
pub fn delete(token_hash: &str) -> Built {
    Query::delete()
        .from_table(Tokens::Table)
        .and_where(Expr::col(Tokens::RefreshToken).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// Delete every refresh token of a user.
pub fn delete_all_for_user(username: &str) -> Built {
    Query::delete()
        .from_table(Tokens::Table)
        .and_where(Expr::col(Tokens::Username).eq(username))
        .build(SqliteQueryBuilder)
}

/// Delete tokens whose expiry is before `now`.
pub fn delete_expired(now: &str) -> Built {
    Query::delete()
        .from_table(Tokens::Table)
        .and_where(Expr::col(Tokens::ExpiryTime).lt(now))
        .build(SqliteQueryBuilder)
}

/// List a user's devices, newest first (returns device_name, created_time, expiry_time).
pub fn list_for_user(username: &str) -> Built {
    Query::select()
        .columns([Tokens::DeviceName, Tokens::CreatedTime, Tokens::ExpiryTime])
        .from(Tokens::Table)
        .and_where(Expr::col(Tokens::Username).eq(username))
        .order_by(Tokens::CreatedTime, Order::Desc)
        .build(SqliteQueryBuilder)
}
