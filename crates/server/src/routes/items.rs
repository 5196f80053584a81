use axum::{Json, extract::State};

use iou_api::{Item, ListItemsResponse, db};

use crate::error::ApiErr;
use crate::storage::{self, Db};

/// GET /api/items — the catalogue of things that can be owed.
pub async fn list_items(State(db): State<Db>) -> Result<Json<ListItemsResponse>, ApiErr> {
    let conn = db.conn();
    let items = storage::query_all(&conn, db::items::list(), |row| {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })
    .map_err(ApiErr::from_db("list items"))?;
    Ok(Json(ListItemsResponse { items }))
}
