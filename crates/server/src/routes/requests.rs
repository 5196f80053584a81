use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::{Connection, Row};

use iou_api::{
    CompleteRequestBody, IouRequest, OkResponse, RequestDetailsBody, RequestListQuery,
    RequestListResponse,
    db::{self, requests::RequestFilter},
    service,
};

use crate::error::ApiErr;
use crate::extract::{ValidJson, ValidQuery};
use crate::routes::auth::AuthUser;
use crate::routes::now_timestamp;
use crate::storage::{self, Db};

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<IouRequest> {
    Ok(IouRequest {
        id: row.get(0)?,
        author: row.get(1)?,
        completed_by: row.get(2)?,
        proof_of_completion: row.get(3)?,
        details: row.get(4)?,
        created_time: row.get(5)?,
        completion_time: row.get(6)?,
        is_completed: row.get(7)?,
    })
}

fn load(conn: &Connection, id: &str) -> Result<IouRequest, ApiErr> {
    storage::query_opt(conn, db::requests::get(id), request_from_row)
        .map_err(ApiErr::from_db("get request"))?
        .ok_or_else(|| ApiErr::not_found("Request not found"))
}

/// Load a request the caller authored and may still change.
fn load_own_open(conn: &Connection, id: &str, caller: &str) -> Result<IouRequest, ApiErr> {
    let request = load(conn, id)?;
    if request.author != caller {
        return Err(ApiErr::forbidden(
            "Not authorised to modify this request (you are not the author of it)",
        ));
    }
    if request.is_completed {
        return Err(ApiErr::bad_request("Request has already been completed"));
    }
    Ok(request)
}

/// GET /api/requests — open and completed requests, newest first.
pub async fn list_requests(
    State(db): State<Db>,
    ValidQuery(query): ValidQuery<RequestListQuery>,
) -> Result<Json<RequestListResponse>, ApiErr> {
    let filter = RequestFilter {
        author: query
            .author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
        details: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    };
    let (start, limit) = service::page(query.start, query.limit);
    let conn = db.conn();
    let requests = storage::query_all(
        &conn,
        db::requests::list(&filter, start, limit),
        request_from_row,
    )
    .map_err(ApiErr::from_db("list requests"))?;
    Ok(Json(RequestListResponse { requests }))
}

/// GET /api/requests/{id}
pub async fn get_request(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<IouRequest>, ApiErr> {
    let conn = db.conn();
    load(&conn, &id).map(Json)
}

/// POST /api/requests — open a new request authored by the caller.
pub async fn create_request(
    State(db): State<Db>,
    user: AuthUser,
    ValidJson(req): ValidJson<RequestDetailsBody>,
) -> Result<(StatusCode, Json<IouRequest>), ApiErr> {
    let details = service::validate_details(&req.details)?;
    let id = service::new_id();
    let created_time = now_timestamp()?;

    let conn = db.conn();
    storage::execute(
        &conn,
        db::requests::insert(&id, &user.username, &details, &created_time),
    )
    .map_err(ApiErr::from_db("insert request"))?;
    tracing::info!(request = %id, author = %user.username, "request created");

    Ok((
        StatusCode::CREATED,
        Json(IouRequest {
            id,
            author: user.username,
            completed_by: None,
            proof_of_completion: None,
            details,
            created_time,
            completion_time: None,
            is_completed: false,
        }),
    ))
}

/// PUT /api/requests/{id} — the author edits the details of an open request.
pub async fn update_request(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<RequestDetailsBody>,
) -> Result<Json<IouRequest>, ApiErr> {
    let details = service::validate_details(&req.details)?;
    let conn = db.conn();
    let mut request = load_own_open(&conn, &id, &user.username)?;
    storage::execute(&conn, db::requests::update_details(&id, &details))
        .map_err(ApiErr::from_db("update request"))?;
    request.details = details;
    Ok(Json(request))
}

/// PUT /api/requests/{id}/complete — anyone but the author fulfils a request.
pub async fn complete_request(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<CompleteRequestBody>,
) -> Result<Json<IouRequest>, ApiErr> {
    let proof = service::validate_request_proof(&req.proof)?;
    let completion_time = now_timestamp()?;

    let conn = db.conn();
    let request = load(&conn, &id)?;
    if request.author == user.username {
        return Err(ApiErr::forbidden("You cannot complete your own request"));
    }
    if request.is_completed {
        return Err(ApiErr::bad_request("Request has already been completed"));
    }

    let updated = storage::execute(
        &conn,
        db::requests::complete(&id, &user.username, &proof, &completion_time),
    )
    .map_err(ApiErr::from_db("complete request"))?;
    if updated == 0 {
        return Err(ApiErr::bad_request("Request has already been completed"));
    }
    tracing::info!(request = %id, completed_by = %user.username, "request completed");

    Ok(Json(IouRequest {
        completed_by: Some(user.username),
        proof_of_completion: Some(proof),
        completion_time: Some(completion_time),
        is_completed: true,
        ..request
    }))
}

/// DELETE /api/requests/{id} — the author withdraws an open request.
pub async fn delete_request(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    load_own_open(&conn, &id, &user.username)?;
    storage::execute(&conn, db::requests::delete(&id))
        .map_err(ApiErr::from_db("delete request"))?;
    Ok(Json(OkResponse { ok: true }))
}
