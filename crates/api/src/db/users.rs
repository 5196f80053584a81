//! User query builders.

use sea_query::{Asterisk, Expr, Func, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Users;

/// Find user by username (returns username, display_name, created_time).
pub fn get_by_username(username: &str) -> Built {
    Query::select()
        .columns([Users::Username, Users::DisplayName, Users::CreatedTime])
        .from(Users::Table)
        .and_where(Expr::col(Users::Username).eq(username))
        .build(SqliteQueryBuilder)
}

/// Find user for login (returns username, display_name, password_hash).
pub fn get_for_login(username: &str) -> Built {
    Query::select()
        .columns([Users::Username, Users::DisplayName, Users::PasswordHash])
        .from(Users::Table)
        .and_where(Expr::col(Users::Username).eq(username))
        .build(SqliteQueryBuilder)
}

/// Check username existence.
pub fn exists(username: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Users::Table)
        .and_where(Expr::col(Users::Username).eq(username))
        .build(SqliteQueryBuilder)
}

/// Insert a new user.
pub fn insert(username: &str, display_name: &str, password_hash: &str, created_time: &str) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Username,
            Users::DisplayName,
            Users::PasswordHash,
            Users::CreatedTime,
        ])
        .values_panic([
            username.into(),
            display_name.into(),
            password_hash.into(),
            created_time.into(),
        ])
        .build(SqliteQueryBuilder)
}
