use anyhow::{Result, ensure};

use iou_api::{CompleteRequestBody, RequestDetailsBody, RequestListQuery};
use iou_api_client::RetryConfig;

use crate::client::TestContext;
use crate::fixtures;

/// Create, edit, and fulfil a request.
pub async fn request_lifecycle(ctx: &TestContext) -> Result<()> {
    let alice = ctx.signup_user().await?;
    let bob = ctx.signup_user().await?;
    let alice_api = ctx.client_for(&alice)?;
    let bob_api = ctx.client_for(&bob)?;

    let created = alice_api
        .create_request(
            &RequestDetailsBody {
                details: fixtures::unique_details("Walk the dog"),
            },
            &RetryConfig::default(),
        )
        .await?;
    ensure!(created.author == alice.username, "author should be alice");
    ensure!(!created.is_completed, "new request should be open");

    let details = fixtures::unique_details("Walk both dogs");
    let updated = alice_api
        .update_request(
            &created.id,
            &RequestDetailsBody {
                details: details.clone(),
            },
        )
        .await?;
    ensure!(updated.details == details, "details should be updated");

    let completed = bob_api
        .complete_request(
            &created.id,
            &CompleteRequestBody {
                proof: "walked.jpg".into(),
            },
        )
        .await?;
    ensure!(completed.is_completed, "request should be completed");
    ensure!(
        completed.completed_by.as_deref() == Some(bob.username.as_str()),
        "bob should be recorded as completer"
    );

    let fetched = ctx.api.get_request(&created.id).await?;
    ensure!(fetched.is_completed, "completion should persist");
    Ok(())
}

/// Authors cannot fulfil their own requests.
pub async fn author_cannot_complete_own_request(ctx: &TestContext) -> Result<()> {
    let alice = ctx.signup_user().await?;
    let api = ctx.client_for(&alice)?;
    let created = api
        .create_request(
            &RequestDetailsBody {
                details: fixtures::unique_details("Buy milk"),
            },
            &RetryConfig::none(),
        )
        .await?;

    let result = api
        .complete_request(
            &created.id,
            &CompleteRequestBody {
                proof: "milk.jpg".into(),
            },
        )
        .await;
    ensure!(
        result.as_ref().err().and_then(|e| e.status()) == Some(403),
        "expected 403 for the author"
    );
    Ok(())
}

/// Search by details and author; delete an open request.
pub async fn search_and_delete(ctx: &TestContext) -> Result<()> {
    let alice = ctx.signup_user().await?;
    let api = ctx.client_for(&alice)?;
    let details = fixtures::unique_details("Mow lawn");
    let created = api
        .create_request(
            &RequestDetailsBody {
                details: details.clone(),
            },
            &RetryConfig::none(),
        )
        .await?;

    let found = ctx
        .api
        .list_requests(&RequestListQuery {
            search: Some(details.clone()),
            ..Default::default()
        })
        .await?
        .requests;
    ensure!(found.len() == 1, "expected 1 match, got {}", found.len());
    ensure!(found[0].id == created.id, "search found the wrong request");

    let mine = ctx
        .api
        .list_requests(&RequestListQuery {
            author: Some(alice.username.clone()),
            ..Default::default()
        })
        .await?
        .requests;
    ensure!(mine.len() == 1, "expected 1 request by alice");

    let ok = api.delete_request(&created.id).await?;
    ensure!(ok.ok, "expected ok");

    let gone = ctx.api.get_request(&created.id).await;
    ensure!(
        gone.as_ref().err().and_then(|e| e.status()) == Some(404),
        "deleted request should be gone"
    );
    Ok(())
}
