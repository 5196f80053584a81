use anyhow::{Result, ensure};

use iou_api::{ApiError, CompleteIouOweRequest, CreateIouOweRequest, CreateIouOwedRequest, IouListQuery};

use crate::client::TestContext;

/// IOU endpoints reject anonymous callers.
pub async fn requires_auth(ctx: &TestContext) -> Result<()> {
    for path in ["/iou/owed", "/iou/owe"] {
        let resp = ctx.get(path).await?;
        ensure!(resp.status() == 401, "{path}: expected 401, got {}", resp.status());
    }
    Ok(())
}

/// Record a debt owed to the caller, then mark it repaid.
pub async fn owed_lifecycle(ctx: &TestContext) -> Result<()> {
    let alice = ctx.signup_user().await?;
    let bob = ctx.signup_user().await?;
    let alice_api = ctx.client_for(&alice)?;
    let bob_api = ctx.client_for(&bob)?;

    let created = alice_api
        .create_owed(&CreateIouOwedRequest {
            username: bob.username.clone(),
            item: "coffee".into(),
            proof: "receipt.jpg".into(),
        })
        .await?;

    let owed = alice_api.list_owed(&IouListQuery::default()).await?.iou;
    ensure!(owed.len() == 1, "expected 1 owed IOU, got {}", owed.len());
    ensure!(owed[0].id == created.iou, "unexpected IOU id");
    ensure!(owed[0].giver.username == bob.username, "bob should be the giver");

    let owe = bob_api.list_owe(&IouListQuery::default()).await?.iou;
    ensure!(owe.len() == 1, "bob should owe one IOU");

    alice_api.complete_owed(&created.iou).await?;
    let owed = alice_api.list_owed(&IouListQuery::default()).await?.iou;
    ensure!(owed.is_empty(), "claimed IOU should leave the listing");
    Ok(())
}

/// Record a debt the caller owes, then prove it repaid.
pub async fn owe_lifecycle(ctx: &TestContext) -> Result<()> {
    let alice = ctx.signup_user().await?;
    let bob = ctx.signup_user().await?;
    let alice_api = ctx.client_for(&alice)?;

    let created = alice_api
        .create_owe(&CreateIouOweRequest {
            username: bob.username.clone(),
            item: "pizza".into(),
        })
        .await?;

    let owe = alice_api.list_owe(&IouListQuery::default()).await?.iou;
    ensure!(owe.len() == 1, "expected 1 IOU, got {}", owe.len());
    ensure!(owe[0].item.id == "pizza", "unexpected item {}", owe[0].item.id);
    ensure!(owe[0].proof_of_debt.is_none(), "owe IOUs carry no proof of debt");

    alice_api
        .complete_owe(
            &created.iou,
            &CompleteIouOweRequest {
                proof: "delivered.png".into(),
            },
        )
        .await?;
    let owe = alice_api.list_owe(&IouListQuery::default()).await?.iou;
    ensure!(owe.is_empty(), "claimed IOU should leave the listing");
    Ok(())
}

/// Only the relevant party may complete an IOU.
pub async fn wrong_party_is_forbidden(ctx: &TestContext) -> Result<()> {
    let alice = ctx.signup_user().await?;
    let bob = ctx.signup_user().await?;
    let alice_api = ctx.client_for(&alice)?;

    let created = alice_api
        .create_owe(&CreateIouOweRequest {
            username: bob.username.clone(),
            item: "cake".into(),
        })
        .await?;

    // Bob is the receiver and completes via /owed, not /owe.
    let resp = ctx
        .put_json_authed(
            &format!("/iou/owe/{}/complete", created.iou),
            &bob.access_token,
            &CompleteIouOweRequest {
                proof: "x".into(),
            },
        )
        .await?;
    ensure!(resp.status() == 403, "expected 403, got {}", resp.status());

    // Alice is the giver, so /owed is not hers to complete.
    let result = alice_api.complete_owed(&created.iou).await;
    ensure!(
        result.as_ref().err().and_then(|e| e.status()) == Some(403),
        "expected 403 for the giver on /owed"
    );
    Ok(())
}

/// Completing an unknown IOU → 404 pointing at the other endpoint.
pub async fn unknown_iou_not_found(ctx: &TestContext) -> Result<()> {
    let user = ctx.signup_user().await?;
    let resp = ctx
        .put_json_authed(
            "/iou/owe/00000000-0000-0000-0000-000000000000/complete",
            &user.access_token,
            &CompleteIouOweRequest {
                proof: "x".into(),
            },
        )
        .await?;
    ensure!(resp.status() == 404, "expected 404, got {}", resp.status());
    let body: ApiError = resp.json().await?;
    ensure!(
        body.errors == ["Not found (did you mean to use the /owed endpoint)"],
        "unexpected errors {:?}",
        body.errors
    );
    Ok(())
}
