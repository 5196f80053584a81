use anyhow::{Result, ensure};

use iou_api::signup::SignupForm;
use iou_api::{ApiError, LoginRequest, LogoutRequest, RefreshRequest, SignupRequest};
use iou_api_client::ApiClient;

use crate::client::TestContext;
use crate::fixtures;

/// POST /api/auth/signup → 201, tokens usable for /auth/me.
pub async fn signup_returns_tokens(ctx: &TestContext) -> Result<()> {
    let user = ctx.signup_user().await?;
    ensure!(!user.access_token.is_empty(), "expected access_token");
    ensure!(!user.refresh_token.is_empty(), "expected refresh_token");

    let me = ctx.client_for(&user)?.me().await?;
    ensure!(me.username == user.username, "me returned {}", me.username);
    ensure!(me.display_name == user.display_name, "unexpected display name");
    Ok(())
}

/// Same username → 409.
pub async fn signup_duplicate_username(ctx: &TestContext) -> Result<()> {
    let user = ctx.signup_user().await?;
    let resp = ctx
        .post_json(
            "/auth/signup",
            &SignupRequest {
                username: user.username.clone(),
                display_name: "Someone else".into(),
                password: fixtures::PASSWORD.into(),
                device_name: None,
            },
        )
        .await?;
    ensure!(resp.status() == 409, "expected 409, got {}", resp.status());
    Ok(())
}

/// Weak password → 400 listing each unmet requirement.
pub async fn signup_weak_password(ctx: &TestContext) -> Result<()> {
    let resp = ctx
        .post_json(
            "/auth/signup",
            &SignupRequest {
                username: fixtures::unique_username(),
                display_name: "Weak".into(),
                password: "short".into(),
                device_name: None,
            },
        )
        .await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());
    let body: ApiError = resp.json().await?;
    ensure!(body.errors.len() == 3, "expected 3 errors, got {:?}", body.errors);
    Ok(())
}

/// The signup form gates submission and records the server's answer.
pub async fn signup_through_form(ctx: &TestContext) -> Result<()> {
    let mut api = ApiClient::with_client(ctx.api.reqwest_client().clone(), ctx.api.base_url());
    let mut form = SignupForm::new();
    form.set_username(fixtures::unique_username());
    form.set_display_name("Form User");
    form.set_password("weak");
    ensure!(!form.can_submit(), "weak password must block submission");

    form.set_password(fixtures::PASSWORD);
    ensure!(form.can_submit(), "form should be submittable");
    api.signup_with_form(&mut form).await?;
    ensure!(form.successful_signup, "form should record success");
    ensure!(api.auth_token().is_some(), "client should hold the new token");

    // Same username again: the server error lands on a fresh form.
    let mut again = SignupForm::new();
    again.set_username(form.username.clone());
    again.set_display_name("Form User");
    again.set_password(fixtures::PASSWORD);
    let result = api.signup_with_form(&mut again).await;
    ensure!(result.is_err(), "duplicate signup should fail");
    ensure!(again.error.is_some(), "form should record the error");
    ensure!(again.can_submit(), "form should allow a retry");
    Ok(())
}

/// Login issues tokens; refresh rotates them and retires the old one.
pub async fn login_and_refresh(ctx: &TestContext) -> Result<()> {
    let user = ctx.signup_user().await?;
    let tokens = ctx
        .api
        .login(&LoginRequest {
            username: user.username.clone(),
            password: user.password.clone(),
            device_name: Some("phone".into()),
        })
        .await?;
    ensure!(tokens.username == user.username, "login returned another user");

    let rotated = ctx
        .api
        .refresh(&RefreshRequest {
            refresh_token: tokens.refresh_token.clone(),
        })
        .await?;
    ensure!(
        rotated.refresh_token != tokens.refresh_token,
        "refresh token should rotate"
    );

    let reused = ctx
        .api
        .refresh(&RefreshRequest {
            refresh_token: tokens.refresh_token,
        })
        .await;
    ensure!(
        reused.as_ref().err().and_then(|e| e.status()) == Some(401),
        "reused refresh token should be rejected"
    );

    let wrong = ctx
        .api
        .login(&LoginRequest {
            username: user.username,
            password: "Wrong!password".into(),
            device_name: None,
        })
        .await;
    ensure!(
        wrong.as_ref().err().and_then(|e| e.status()) == Some(401),
        "bad password should be rejected"
    );
    Ok(())
}

/// Logout → the refresh token stops working.
pub async fn logout_revokes_refresh_token(ctx: &TestContext) -> Result<()> {
    let user = ctx.signup_user().await?;
    let ok = ctx
        .api
        .logout(&LogoutRequest {
            refresh_token: user.refresh_token.clone(),
        })
        .await?;
    ensure!(ok.ok, "expected ok");

    let refreshed = ctx
        .api
        .refresh(&RefreshRequest {
            refresh_token: user.refresh_token,
        })
        .await;
    ensure!(refreshed.is_err(), "refresh after logout should fail");
    Ok(())
}

/// Logout everywhere removes every device.
pub async fn logout_all_clears_devices(ctx: &TestContext) -> Result<()> {
    let user = ctx.signup_user().await?;
    ctx.api
        .login(&LoginRequest {
            username: user.username.clone(),
            password: user.password.clone(),
            device_name: Some("laptop".into()),
        })
        .await?;

    let api = ctx.client_for(&user)?;
    let devices = api.devices().await?.devices;
    ensure!(devices.len() == 2, "expected 2 devices, got {}", devices.len());

    api.logout_all().await?;
    let devices = api.devices().await?.devices;
    ensure!(devices.is_empty(), "expected no devices after logout-all");
    Ok(())
}
