use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use rusqlite::Connection;

use iou_api::{
    AuthTokenResponse, DeviceResponse, ListDevicesResponse, LoginRequest, LogoutRequest,
    OkResponse, RefreshRequest, ServiceError, SignupRequest, UserResponse, crypto, db, service,
};

use crate::config::AppConfig;
use crate::error::ApiErr;
use crate::extract::ValidJson;
use crate::routes::{collect, now_timestamp, now_unix};
use crate::storage::{self, Db};

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub display_name: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db = Db::from_ref(state);
        let config = AppConfig::from_ref(state);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = service::resolve_bearer(header)?;
        let username = crypto::verify_jwt(token, &config.jwt_secret, now_unix())?;

        let conn = db.conn();
        let user = storage::query_opt(&conn, db::users::get_by_username(&username), |row| {
            Ok(AuthUser {
                username: row.get(0)?,
                display_name: row.get(1)?,
            })
        })
        .map_err(ApiErr::from_db("auth user lookup"))?;

        user.ok_or_else(|| ApiErr::unauthorized("Not authenticated"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue an access token and store a fresh refresh token for `device_name`.
fn issue_tokens(
    conn: &Connection,
    config: &AppConfig,
    username: &str,
    display_name: &str,
    device_name: &str,
) -> Result<AuthTokenResponse, ApiErr> {
    let bundle =
        service::prepare_token_bundle(&config.jwt_secret, username, display_name, now_unix())?;
    storage::execute(
        conn,
        db::tokens::insert(
            &bundle.token_hash,
            username,
            device_name,
            &bundle.created_time,
            &bundle.expiry_time,
        ),
    )
    .map_err(ApiErr::from_db("insert refresh token"))?;
    Ok(bundle.response)
}

async fn hash_password(password: String, iterations: u32) -> Result<String, ApiErr> {
    tokio::task::spawn_blocking(move || crypto::hash_password(&password, iterations))
        .await
        .map_err(ApiErr::from_db("hash password task"))?
        .map_err(ApiErr::from)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Signup
// ---------------------------------------------------------------------------

/// POST /api/auth/signup — create an account and log the new user in.
pub async fn signup(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ValidJson(req): ValidJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthTokenResponse>), ApiErr> {
    let mut errors = Vec::new();
    let username = collect(&mut errors, service::validate_username(&req.username));
    let display_name = collect(&mut errors, service::validate_display_name(&req.display_name));
    let password_ok = collect(&mut errors, service::validate_password(&req.password));
    let device_name = collect(
        &mut errors,
        service::validate_device_name(req.device_name.as_deref()),
    );
    let (Some(username), Some(display_name), Some(()), Some(device_name)) =
        (username, display_name, password_ok, device_name)
    else {
        return Err(ServiceError::BadRequest(errors).into());
    };

    {
        let conn = db.conn();
        let taken: bool = storage::query_one(&conn, db::users::exists(&username), |row| row.get(0))
            .map_err(ApiErr::from_db("signup exists check"))?;
        if taken {
            return Err(ApiErr::conflict("Username already taken"));
        }
    }

    let password_hash = hash_password(req.password, config.password_iterations).await?;
    let created_time = now_timestamp()?;

    let conn = db.conn();
    match storage::execute(
        &conn,
        db::users::insert(&username, &display_name, &password_hash, &created_time),
    ) {
        Ok(_) => {}
        Err(e) if is_constraint_violation(&e) => {
            return Err(ApiErr::conflict("Username already taken"));
        }
        Err(e) => return Err(ApiErr::from_db("insert user")(e)),
    }

    let tokens = issue_tokens(&conn, &config, &username, &display_name, &device_name)?;
    tracing::info!(username = %username, "user signed up");
    Ok((StatusCode::CREATED, Json(tokens)))
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// POST /api/auth/login — exchange credentials for tokens.
pub async fn login(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    let device_name = service::validate_device_name(req.device_name.as_deref())?;

    let found = {
        let conn = db.conn();
        storage::query_opt(&conn, db::users::get_for_login(req.username.trim()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(ApiErr::from_db("login lookup"))?
    };
    let Some((username, display_name, password_hash)) = found else {
        return Err(ApiErr::unauthorized("Invalid username or password"));
    };

    let password = req.password;
    let valid =
        tokio::task::spawn_blocking(move || crypto::verify_password(&password, &password_hash))
            .await
            .map_err(ApiErr::from_db("verify password task"))?;
    if !valid {
        return Err(ApiErr::unauthorized("Invalid username or password"));
    }

    let conn = db.conn();
    let tokens = issue_tokens(&conn, &config, &username, &display_name, &device_name)?;
    Ok(Json(tokens))
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

/// POST /api/auth/refresh — rotate a refresh token. The old token stops working.
pub async fn refresh(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.refresh_token);
    let now = now_timestamp()?;
    let conn = db.conn();

    let found = storage::query_opt(&conn, db::tokens::lookup(&token_hash), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })
    .map_err(ApiErr::from_db("refresh lookup"))?;
    let Some((username, display_name, device_name, expiry_time)) = found else {
        return Err(ApiErr::unauthorized("Invalid refresh token"));
    };

    storage::execute(&conn, db::tokens::delete(&token_hash))
        .map_err(ApiErr::from_db("delete refresh token"))?;

    if expiry_time < now {
        return Err(ApiErr::unauthorized("Refresh token expired"));
    }

    let tokens = issue_tokens(&conn, &config, &username, &display_name, &device_name)?;
    Ok(Json(tokens))
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

/// POST /api/auth/logout — invalidate one refresh token. Unknown tokens are not an error.
pub async fn logout(
    State(db): State<Db>,
    ValidJson(req): ValidJson<LogoutRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.refresh_token);
    let conn = db.conn();
    storage::execute(&conn, db::tokens::delete(&token_hash))
        .map_err(ApiErr::from_db("logout"))?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/auth/logout-all — invalidate every refresh token of the caller.
pub async fn logout_all(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let removed = storage::execute(&conn, db::tokens::delete_all_for_user(&user.username))
        .map_err(ApiErr::from_db("logout all"))?;
    tracing::info!(username = %user.username, removed, "logged out everywhere");
    Ok(Json(OkResponse { ok: true }))
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// GET /api/auth/me — profile of the authenticated user.
pub async fn me(State(db): State<Db>, user: AuthUser) -> Result<Json<UserResponse>, ApiErr> {
    let conn = db.conn();
    storage::query_opt(&conn, db::users::get_by_username(&user.username), |row| {
        Ok(UserResponse {
            username: row.get(0)?,
            display_name: row.get(1)?,
            created_time: row.get(2)?,
        })
    })
    .map_err(ApiErr::from_db("me"))?
    .map(Json)
    .ok_or_else(|| ApiErr::not_found("User not found"))
}

/// GET /api/auth/devices — devices holding a refresh token, newest first.
pub async fn devices(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<ListDevicesResponse>, ApiErr> {
    let conn = db.conn();
    let devices = storage::query_all(&conn, db::tokens::list_for_user(&user.username), |row| {
        Ok(DeviceResponse {
            device_name: row.get(0)?,
            created_time: row.get(1)?,
            expiry_time: row.get(2)?,
        })
    })
    .map_err(ApiErr::from_db("list devices"))?;
    Ok(Json(ListDevicesResponse { devices }))
}
