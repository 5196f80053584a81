pub mod client;
pub mod fixtures;
pub mod specs;

/// Invoke `$mac!(module::name)` for every E2E spec.
///
/// This is the **single source of truth** for the E2E test list. Adding an entry
/// here automatically registers it in `tests/server.rs`.
#[macro_export]
macro_rules! for_each_spec {
    ($mac:ident) => {
        // health (1)
        $mac!(health::health_check);

        // auth (7)
        $mac!(auth::signup_returns_tokens);
        $mac!(auth::signup_duplicate_username);
        $mac!(auth::signup_weak_password);
        $mac!(auth::signup_through_form);
        $mac!(auth::login_and_refresh);
        $mac!(auth::logout_revokes_refresh_token);
        $mac!(auth::logout_all_clears_devices);

        // ious (5)
        $mac!(ious::requires_auth);
        $mac!(ious::owed_lifecycle);
        $mac!(ious::owe_lifecycle);
        $mac!(ious::wrong_party_is_forbidden);
        $mac!(ious::unknown_iou_not_found);

        // requests (3)
        $mac!(requests::request_lifecycle);
        $mac!(requests::author_cannot_complete_own_request);
        $mac!(requests::search_and_delete);
    };
}
