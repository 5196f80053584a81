use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::{Connection, Row};

use iou_api::{
    BasicUser, CompleteIouOweRequest, CreateIouOweRequest, CreateIouOwedRequest, Iou,
    IouCreatedResponse, IouListQuery, IouListResponse, Item, ServiceError,
    db::{self, ious::IouFilter},
    service,
};

use crate::error::ApiErr;
use crate::extract::{ValidJson, ValidQuery};
use crate::routes::auth::AuthUser;
use crate::routes::{collect, now_timestamp};
use crate::storage::{self, Db};

const NOT_OWNER: &str = "Not authorised to complete this request (you are not the owner of it)";

/// Map a row of `db::ious::list` to an [`Iou`].
fn iou_from_row(row: &Row<'_>) -> rusqlite::Result<Iou> {
    Ok(Iou {
        id: row.get(0)?,
        item: Item {
            id: row.get(1)?,
            name: row.get(2)?,
        },
        giver: BasicUser {
            username: row.get(3)?,
            display_name: row.get(4)?,
        },
        receiver: BasicUser {
            username: row.get(5)?,
            display_name: row.get(6)?,
        },
        parent_request: row.get(7)?,
        proof_of_debt: row.get(8)?,
        proof_of_completion: row.get(9)?,
        created_time: row.get(10)?,
        claimed_time: row.get(11)?,
        is_claimed: row.get(12)?,
    })
}

fn list_unclaimed(db: &Db, filter: IouFilter, query: &IouListQuery) -> Result<IouListResponse, ApiErr> {
    let filter = IouFilter {
        is_claimed: Some(false),
        ..filter
    };
    let (start, limit) = service::page(query.start, query.limit);
    let conn = db.conn();
    let iou = storage::query_all(&conn, db::ious::list(&filter, start, limit), iou_from_row)
        .map_err(ApiErr::from_db("list ious"))?;
    Ok(IouListResponse { iou })
}

/// Check that the counterparty and the item both exist.
fn check_references(conn: &Connection, username: &str, item: &str) -> Result<(), ApiErr> {
    let mut errors = Vec::new();
    let user_exists: bool = storage::query_one(conn, db::users::exists(username), |row| row.get(0))
        .map_err(ApiErr::from_db("iou user check"))?;
    if !user_exists {
        errors.push(format!("User \"{username}\" does not exist"));
    }
    let item_exists: bool = storage::query_one(conn, db::items::exists(item), |row| row.get(0))
        .map_err(ApiErr::from_db("iou item check"))?;
    if !item_exists {
        errors.push(format!("Item \"{item}\" does not exist"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(errors).into())
    }
}

struct NewIou<'a> {
    item: &'a str,
    giver: &'a str,
    receiver: &'a str,
    proof_of_debt: Option<&'a str>,
}

fn insert_iou(db: &Db, counterparty: &str, new: NewIou<'_>) -> Result<String, ApiErr> {
    let id = service::new_id();
    let created_time = now_timestamp()?;
    let conn = db.conn();
    check_references(&conn, counterparty, new.item)?;
    storage::execute(
        &conn,
        db::ious::insert(
            &id,
            new.item,
            new.giver,
            new.receiver,
            new.proof_of_debt,
            &created_time,
        ),
    )
    .map_err(ApiErr::from_db("insert iou"))?;
    tracing::info!(iou = %id, giver = new.giver, receiver = new.receiver, "iou created");
    Ok(id)
}

/// Gate a completion on the IOU existing, belonging to `caller` and being open.
fn check_completable(
    conn: &Connection,
    id: &str,
    caller: &str,
    caller_is_giver: bool,
    not_found: &str,
) -> Result<(), ApiErr> {
    let parties = storage::query_opt(conn, db::ious::get_parties(id), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, bool>(2)?,
        ))
    })
    .map_err(ApiErr::from_db("iou parties"))?;
    let Some((giver, receiver, is_claimed)) = parties else {
        return Err(ApiErr::not_found(not_found));
    };
    let owner = if caller_is_giver { giver } else { receiver };
    if owner != caller {
        return Err(ApiErr::forbidden(NOT_OWNER));
    }
    if is_claimed {
        return Err(ApiErr::bad_request("IOU has already been completed"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Owed: IOUs where the caller is the receiver
// ---------------------------------------------------------------------------

/// GET /api/iou/owed — unclaimed IOUs owed to the caller.
pub async fn list_owed(
    State(db): State<Db>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<IouListQuery>,
) -> Result<Json<IouListResponse>, ApiErr> {
    let filter = IouFilter {
        receiver: Some(user.username),
        ..Default::default()
    };
    list_unclaimed(&db, filter, &query).map(Json)
}

/// POST /api/iou/owed — record that `username` owes the caller, with proof.
pub async fn create_owed(
    State(db): State<Db>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateIouOwedRequest>,
) -> Result<Json<IouCreatedResponse>, ApiErr> {
    let mut errors = Vec::new();
    let giver = collect(&mut errors, service::validate_counterparty(&req.username, &user.username));
    let item = collect(&mut errors, service::validate_item_id(&req.item));
    let proof = collect(&mut errors, service::validate_proof(&req.proof));
    let (Some(giver), Some(item), Some(proof)) = (giver, item, proof) else {
        return Err(ServiceError::BadRequest(errors).into());
    };

    let id = insert_iou(
        &db,
        &giver,
        NewIou {
            item: &item,
            giver: &giver,
            receiver: &user.username,
            proof_of_debt: Some(&proof),
        },
    )?;
    Ok(Json(IouCreatedResponse { iou: id }))
}

/// PUT /api/iou/owed/{iou_id}/complete — the receiver marks the debt repaid.
pub async fn complete_owed(
    State(db): State<Db>,
    user: AuthUser,
    Path(iou_id): Path<String>,
) -> Result<StatusCode, ApiErr> {
    let claimed_time = now_timestamp()?;
    let conn = db.conn();
    check_completable(
        &conn,
        &iou_id,
        &user.username,
        false,
        "Not found (did you mean to use the /owe endpoint)",
    )?;
    storage::execute(
        &conn,
        db::ious::complete_owed(&iou_id, &user.username, &claimed_time),
    )
    .map_err(ApiErr::from_db("complete owed"))?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// Owe: IOUs where the caller is the giver
// ---------------------------------------------------------------------------

/// GET /api/iou/owe — unclaimed IOUs the caller owes.
pub async fn list_owe(
    State(db): State<Db>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<IouListQuery>,
) -> Result<Json<IouListResponse>, ApiErr> {
    let filter = IouFilter {
        giver: Some(user.username),
        ..Default::default()
    };
    list_unclaimed(&db, filter, &query).map(Json)
}

/// POST /api/iou/owe — record that the caller owes `username`.
pub async fn create_owe(
    State(db): State<Db>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateIouOweRequest>,
) -> Result<Json<IouCreatedResponse>, ApiErr> {
    let mut errors = Vec::new();
    let receiver = collect(&mut errors, service::validate_counterparty(&req.username, &user.username));
    let item = collect(&mut errors, service::validate_item_id(&req.item));
    let (Some(receiver), Some(item)) = (receiver, item) else {
        return Err(ServiceError::BadRequest(errors).into());
    };

    let id = insert_iou(
        &db,
        &receiver,
        NewIou {
            item: &item,
            giver: &user.username,
            receiver: &receiver,
            proof_of_debt: None,
        },
    )?;
    Ok(Json(IouCreatedResponse { iou: id }))
}

/// PUT /api/iou/owe/{iou_id}/complete — the giver proves the debt repaid.
pub async fn complete_owe(
    State(db): State<Db>,
    user: AuthUser,
    Path(iou_id): Path<String>,
    ValidJson(req): ValidJson<CompleteIouOweRequest>,
) -> Result<StatusCode, ApiErr> {
    let proof = service::validate_proof(&req.proof)?;
    let claimed_time = now_timestamp()?;
    let conn = db.conn();
    check_completable(
        &conn,
        &iou_id,
        &user.username,
        true,
        "Not found (did you mean to use the /owed endpoint)",
    )?;
    storage::execute(
        &conn,
        db::ious::complete_owe(&iou_id, &user.username, &proof, &claimed_time),
    )
    .map_err(ApiErr::from_db("complete owe"))?;
    Ok(StatusCode::OK)
}
