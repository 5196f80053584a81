use axum::{
    Json,
    extract::{Path, State},
};

use iou_api::{BasicUser, db};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::storage::{self, Db};

/// GET /api/users/{username} — public profile of another user.
pub async fn get_user(
    State(db): State<Db>,
    _user: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<BasicUser>, ApiErr> {
    let conn = db.conn();
    storage::query_opt(&conn, db::users::get_by_username(&username), |row| {
        Ok(BasicUser {
            username: row.get(0)?,
            display_name: row.get(1)?,
        })
    })
    .map_err(ApiErr::from_db("get user"))?
    .map(Json)
    .ok_or_else(|| ApiErr::not_found("User not found"))
}
