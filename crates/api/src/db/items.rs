//! Item catalogue query builders.

use sea_query::{Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Items;

/// List all items (returns id, name).
pub fn list() -> Built {
    Query::select()
        .columns([Items::Id, Items::Name])
        .from(Items::Table)
        .order_by(Items::Name, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Check item existence.
pub fn exists(id: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Items::Table)
        .and_where(Expr::col(Items::Id).eq(id))
        .build(SqliteQueryBuilder)
}
