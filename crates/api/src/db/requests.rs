//! IOU request query builders.

use sea_query::{Expr, LikeExpr, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::Built;
use super::tables::Requests;

/// Columns returned by [`get`] and [`list`], in row order.
pub const COLUMNS: [Requests; 8] = [
    Requests::Id,
    Requests::Author,
    Requests::CompletedBy,
    Requests::ProofOfCompletion,
    Requests::Details,
    Requests::CreatedTime,
    Requests::CompletionTime,
    Requests::IsCompleted,
];

#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub author: Option<String>,
    /// Substring of `details`.
    pub details: Option<String>,
}

fn select() -> SelectStatement {
    let mut query = Query::select();
    query.columns(COLUMNS).from(Requests::Table);
    query
}

/// Find request by id.
pub fn get(id: &str) -> Built {
    select()
        .and_where(Expr::col(Requests::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// List requests, newest first.
pub fn list(filter: &RequestFilter, start: u64, limit: u64) -> Built {
    let mut query = select();
    if let Some(ref author) = filter.author {
        query.and_where(Expr::col(Requests::Author).eq(author.as_str()));
    }
    if let Some(ref details) = filter.details {
        let pattern = LikeExpr::new(format!("%{}%", escape_like(details))).escape('\\');
        query.and_where(Expr::col(Requests::Details).like(pattern));
    }
    query
        .order_by(Requests::CreatedTime, Order::Desc)
        .order_by_expr(Expr::cust("rowid"), Order::Desc)
        .limit(limit)
        .offset(start)
        .build(SqliteQueryBuilder)
}

/// Insert a new, open request.
pub fn insert(id: &str, author: &str, details: &str, created_time: &str) -> Built {
    Query::insert()
        .into_table(Requests::Table)
        .columns([
            Requests::Id,
            Requests::Author,
            Requests::Details,
            Requests::CreatedTime,
            Requests::IsCompleted,
        ])
        .values_panic([
            id.into(),
            author.into(),
            details.into(),
            created_time.into(),
            false.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Replace the details of an open request.
pub fn update_details(id: &str, details: &str) -> Built {
    Query::update()
        .table(Requests::Table)
        .value(Requests::Details, details)
        .and_where(Expr::col(Requests::Id).eq(id))
        .and_where(Expr::col(Requests::IsCompleted).eq(false))
        .build(SqliteQueryBuilder)
}

/// Complete an open request. Affects no rows once completed.
pub fn complete(id: &str, completed_by: &str, proof: &str, completion_time: &str) -> Built {
    Query::update()
        .table(Requests::Table)
        .value(Requests::IsCompleted, true)
        .value(Requests::CompletedBy, completed_by)
        .value(Requests::ProofOfCompletion, proof)
        .value(Requests::CompletionTime, completion_time)
        .and_where(Expr::col(Requests::Id).eq(id))
        .and_where(Expr::col(Requests::IsCompleted).eq(false))
        .build(SqliteQueryBuilder)
}

/// Delete request by id.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Requests::Table)
        .and_where(Expr::col(Requests::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
