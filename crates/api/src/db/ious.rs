//! IOU query builders.

use sea_query::{Alias, Asterisk, Expr, Func, JoinType, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{Ious, Items, Users};

/// Optional equality filters for [`list`]; `None` fields are not constrained.
#[derive(Debug, Default, Clone)]
pub struct IouFilter {
    pub giver: Option<String>,
    pub receiver: Option<String>,
    pub parent_request: Option<String>,
    pub is_claimed: Option<bool>,
    pub item: Option<String>,
}

/// List IOUs with item and user details joined in, newest first.
///
/// Row order: id, item id, item name, giver username, giver display name,
/// receiver username, receiver display name, parent_request, proof_of_debt,
/// proof_of_completion, created_time, claimed_time, is_claimed.
pub fn list(filter: &IouFilter, start: u64, limit: u64) -> Built {
    let giver = Alias::new("giver_user");
    let receiver = Alias::new("receiver_user");

    let mut query = Query::select();
    query
        .column((Ious::Table, Ious::Id))
        .column((Items::Table, Items::Id))
        .column((Items::Table, Items::Name))
        .column((giver.clone(), Users::Username))
        .column((giver.clone(), Users::DisplayName))
        .column((receiver.clone(), Users::Username))
        .column((receiver.clone(), Users::DisplayName))
        .column((Ious::Table, Ious::ParentRequest))
        .column((Ious::Table, Ious::ProofOfDebt))
        .column((Ious::Table, Ious::ProofOfCompletion))
        .column((Ious::Table, Ious::CreatedTime))
        .column((Ious::Table, Ious::ClaimedTime))
        .column((Ious::Table, Ious::IsClaimed))
        .from(Ious::Table)
        .inner_join(
            Items::Table,
            Expr::col((Items::Table, Items::Id)).equals((Ious::Table, Ious::Item)),
        )
        .join_as(
            JoinType::InnerJoin,
            Users::Table,
            giver.clone(),
            Expr::col((giver, Users::Username)).equals((Ious::Table, Ious::Giver)),
        )
        .join_as(
            JoinType::InnerJoin,
            Users::Table,
            receiver.clone(),
            Expr::col((receiver, Users::Username)).equals((Ious::Table, Ious::Receiver)),
        );

    if let Some(ref giver) = filter.giver {
        query.and_where(Expr::col((Ious::Table, Ious::Giver)).eq(giver.as_str()));
    }
    if let Some(ref receiver) = filter.receiver {
        query.and_where(Expr::col((Ious::Table, Ious::Receiver)).eq(receiver.as_str()));
    }
    if let Some(ref parent) = filter.parent_request {
        query.and_where(Expr::col((Ious::Table, Ious::ParentRequest)).eq(parent.as_str()));
    }
    if let Some(is_claimed) = filter.is_claimed {
        query.and_where(Expr::col((Ious::Table, Ious::IsClaimed)).eq(is_claimed));
    }
    if let Some(ref item) = filter.item {
        query.and_where(Expr::col((Ious::Table, Ious::Item)).eq(item.as_str()));
    }

    query
        .order_by((Ious::Table, Ious::CreatedTime), Order::Desc)
        .order_by_expr(Expr::cust(r#""ious"."rowid""#), Order::Desc)
        .limit(limit)
        .offset(start)
        .build(SqliteQueryBuilder)
}

/// Check IOU existence.
pub fn exists(id: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Ious::Table)
        .and_where(Expr::col(Ious::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Fetch the parties and claim state of an IOU (returns giver, receiver, is_claimed).
pub fn get_parties(id: &str) -> Built {
    Query::select()
        .columns([Ious::Giver, Ious::Receiver, Ious::IsClaimed])
        .from(Ious::Table)
        .and_where(Expr::col(Ious::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Insert a new, unclaimed IOU.
pub fn insert(
    id: &str,
    item: &str,
    giver: &str,
    receiver: &str,
    proof_of_debt: Option<&str>,
    created_time: &str,
) -> Built {
    Query::insert()
        .into_table(Ious::Table)
        .columns([
            Ious::Id,
            Ious::Item,
            Ious::Giver,
            Ious::Receiver,
            Ious::ProofOfDebt,
            Ious::CreatedTime,
            Ious::IsClaimed,
        ])
        .values_panic([
            id.into(),
            item.into(),
            giver.into(),
            receiver.into(),
            proof_of_debt.map(str::to_string).into(),
            created_time.into(),
            false.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Mark an IOU claimed by its receiver. Affects no rows for anyone else.
pub fn complete_owed(id: &str, receiver: &str, claimed_time: &str) -> Built {
    Query::update()
        .table(Ious::Table)
        .value(Ious::IsClaimed, true)
        .value(Ious::ClaimedTime, claimed_time)
        .and_where(Expr::col(Ious::Id).eq(id))
        .and_where(Expr::col(Ious::Receiver).eq(receiver))
        .build(SqliteQueryBuilder)
}

/// Mark an IOU claimed by its giver, with proof. Affects no rows for anyone else.
pub fn complete_owe(id: &str, giver: &str, proof: &str, claimed_time: &str) -> Built {
    Query::update()
        .table(Ious::Table)
        .value(Ious::IsClaimed, true)
        .value(Ious::ProofOfCompletion, proof)
        .value(Ious::ClaimedTime, claimed_time)
        .and_where(Expr::col(Ious::Id).eq(id))
        .and_where(Expr::col(Ious::Giver).eq(giver))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_without_filters_only_binds_paging() {
        let (sql, values) = list(&IouFilter::default(), 0, 25);
        assert!(!sql.contains("WHERE"));
        assert!(sql.contains("LIMIT"));
        assert!(sql.contains(r#"AS "giver_user""#));
        assert!(sql.contains(r#"AS "receiver_user""#));
        assert_eq!(values.0.len(), 2);
    }

    #[test]
    fn list_binds_each_filter() {
        let filter = IouFilter {
            receiver: Some("alice".into()),
            is_claimed: Some(false),
            ..Default::default()
        };
        let (sql, values) = list(&filter, 25, 25);
        assert!(sql.contains(r#""ious"."receiver" = ?"#));
        assert!(sql.contains(r#""ious"."is_claimed" = ?"#));
        assert!(!sql.contains(r#""ious"."giver" = ?"#));
        assert!(sql.contains("ORDER BY"));
        assert_eq!(values.0.len(), 4);
    }

    #[test]
    fn completion_is_gated_on_the_party() {
        let (sql, _) = complete_owed("id", "alice", "2024-01-01 00:00:00");
        assert!(sql.contains(r#""receiver" = ?"#));
        let (sql, values) = complete_owe("id", "bob", "photo", "2024-01-01 00:00:00");
        assert!(sql.contains(r#""giver" = ?"#));
        assert!(sql.contains(r#""proof_of_completion" = ?"#));
        assert_eq!(values.0.len(), 5);
    }
}
