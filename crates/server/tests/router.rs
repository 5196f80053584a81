use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use iou_server::{AppConfig, AppState, build_router, storage};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

const PASSWORD: &str = "Secret!pw";

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = storage::init_db(dir.path()).unwrap();
        let config = AppConfig::for_tests(dir.path().to_path_buf());
        Self {
            router: build_router(AppState { db, config }),
            _dir: dir,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Sign up `username` and return the full token response.
    async fn signup(&self, username: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "username": username,
                    "display_name": format!("{username} display"),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn token(&self, username: &str) -> String {
        self.signup(username).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

fn errors(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Public endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_and_items_are_public() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 5);
    assert!(ids.contains(&"coffee"));
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/iou/owed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(errors(&body), vec!["Not authenticated"]);

    let (status, _) = app
        .send(Method::GET, "/api/auth/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Authentication is checked before the body.
    let (status, _) = app
        .send(Method::POST, "/api/iou/owed", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_reports_every_unmet_password_requirement() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "alice", "display_name": "Alice", "password": "abc"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = errors(&body);
    assert_eq!(errors.len(), 3);
    assert!(errors.contains(&"Needs to be at least 8 characters".to_string()));
}

#[tokio::test]
async fn signup_with_missing_fields_is_a_bad_request() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "alice", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors(&body).len(), 1);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = TestApp::new();
    app.signup("alice").await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "alice", "display_name": "Other", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(errors(&body), vec!["Username already taken"]);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = TestApp::new();
    app.signup("alice").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "Wrong!pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": PASSWORD, "device_name": "phone"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["expires_in"], 3600);

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = app
        .send(Method::GET, "/api/auth/me", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["display_name"], "alice display");
}

#[tokio::test]
async fn refresh_rotates_and_logout_revokes() {
    let app = TestApp::new();
    let signup = app.signup("alice").await;
    let first = signup["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": first})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    // The rotated-out token no longer works.
    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": first})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/logout",
            None,
            Some(json!({"refresh_token": second})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": second})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn devices_and_logout_everywhere() {
    let app = TestApp::new();
    let bob = app.signup("bob").await;
    let bob_refresh = bob["refresh_token"].as_str().unwrap();
    let signup = app.signup("alice").await;
    let token = signup["access_token"].as_str().unwrap();
    let refresh = signup["refresh_token"].as_str().unwrap();

    app.send(
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": PASSWORD, "device_name": "laptop"})),
    )
    .await;

    let (status, body) = app
        .send(Method::GET, "/api/auth/devices", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let mut names: Vec<&str> = body["devices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["device_name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["laptop", "unknown"]);

    let (status, _) = app
        .send(Method::POST, "/api/auth/logout-all", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Method::GET, "/api/auth/devices", Some(token), None)
        .await;
    assert!(body["devices"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Other users keep their sessions.
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": bob_refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["username"], "bob");
}

#[tokio::test]
async fn user_lookup() {
    let app = TestApp::new();
    let token = app.token("alice").await;
    app.signup("bob").await;

    let (status, body) = app
        .send(Method::GET, "/api/users/bob", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"username": "bob", "display_name": "bob display"}));

    let (status, _) = app
        .send(Method::GET, "/api/users/nobody", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// IOUs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn owed_iou_lifecycle() {
    let app = TestApp::new();
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;

    // Bob owes Alice a coffee.
    let (status, body) = app
        .send(
            Method::POST,
            "/api/iou/owed",
            Some(&alice),
            Some(json!({"username": "bob", "item": "coffee", "proof": "receipt.jpg"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["iou"].as_str().unwrap().to_string();

    let (_, body) = app
        .send(Method::GET, "/api/iou/owed", Some(&alice), None)
        .await;
    let owed = body["iou"].as_array().unwrap();
    assert_eq!(owed.len(), 1);
    assert_eq!(owed[0]["id"], id.as_str());
    assert_eq!(owed[0]["giver"]["username"], "bob");
    assert_eq!(owed[0]["receiver"]["display_name"], "alice display");
    assert_eq!(owed[0]["item"]["name"], "Coffee");
    assert_eq!(owed[0]["proof_of_debt"], "receipt.jpg");

    let (_, body) = app
        .send(Method::GET, "/api/iou/owe", Some(&bob), None)
        .await;
    assert_eq!(body["iou"].as_array().unwrap().len(), 1);

    // Only the receiver may mark it repaid.
    let uri = format!("/api/iou/owed/{id}/complete");
    let (status, body) = app.send(Method::PUT, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        errors(&body),
        vec!["Not authorised to complete this request (you are not the owner of it)"]
    );

    let (status, _) = app.send(Method::PUT, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Method::GET, "/api/iou/owed", Some(&alice), None)
        .await;
    assert!(body["iou"].as_array().unwrap().is_empty());

    let (status, _) = app.send(Method::PUT, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owe_iou_lifecycle() {
    let app = TestApp::new();
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;

    // Alice owes Bob a cake.
    let (status, body) = app
        .send(
            Method::POST,
            "/api/iou/owe",
            Some(&alice),
            Some(json!({"username": "bob", "item": "cake"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["iou"].as_str().unwrap().to_string();

    let (_, body) = app
        .send(Method::GET, "/api/iou/owed", Some(&bob), None)
        .await;
    assert_eq!(body["iou"][0]["proof_of_debt"], Value::Null);

    let uri = format!("/api/iou/owe/{id}/complete");
    let proof = json!({"proof": "photo.png"});
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&bob), Some(proof.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&alice), Some(json!({"proof": ""})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(&alice), Some(proof.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Method::GET, "/api/iou/owe", Some(&alice), None)
        .await;
    assert!(body["iou"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn completing_an_unknown_iou_points_at_the_other_endpoint() {
    let app = TestApp::new();
    let alice = app.token("alice").await;

    let (status, body) = app
        .send(Method::PUT, "/api/iou/owed/missing/complete", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        errors(&body),
        vec!["Not found (did you mean to use the /owe endpoint)"]
    );

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/iou/owe/missing/complete",
            Some(&alice),
            Some(json!({"proof": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        errors(&body),
        vec!["Not found (did you mean to use the /owed endpoint)"]
    );
}

#[tokio::test]
async fn iou_creation_validates_parties_and_items() {
    let app = TestApp::new();
    let alice = app.token("alice").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/iou/owe",
            Some(&alice),
            Some(json!({"username": "alice", "item": "coffee"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/iou/owe",
            Some(&alice),
            Some(json!({"username": "ghost", "item": "caviar"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors(&body).len(), 2);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/iou/owed",
            Some(&alice),
            Some(json!({"username": "bob", "item": "coffee"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn iou_listing_pages() {
    let app = TestApp::new();
    let alice = app.token("alice").await;
    app.signup("bob").await;

    for item in ["coffee", "cake", "pizza"] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/iou/owe",
                Some(&alice),
                Some(json!({"username": "bob", "item": item})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app
        .send(Method::GET, "/api/iou/owe?start=0&limit=2", Some(&alice), None)
        .await;
    let page = body["iou"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["item"]["id"], "pizza");

    let (_, body) = app
        .send(Method::GET, "/api/iou/owe?start=2&limit=2", Some(&alice), None)
        .await;
    assert_eq!(body["iou"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::GET, "/api/iou/owe?limit=lots", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_lifecycle() {
    let app = TestApp::new();
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;

    let (status, created) = app
        .send(
            Method::POST,
            "/api/requests",
            Some(&alice),
            Some(json!({"details": "Clean the kitchen"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"], "alice");
    assert_eq!(created["is_completed"], false);
    let uri = format!("/api/requests/{}", created["id"].as_str().unwrap());

    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"], "Clean the kitchen");

    let edit = json!({"details": "Clean the whole kitchen"});
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&bob), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .send(Method::PUT, &uri, Some(&alice), Some(edit))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"], "Clean the whole kitchen");

    let complete_uri = format!("{uri}/complete");
    let proof = json!({"proof": "sparkling.jpg"});
    let (status, _) = app
        .send(Method::PUT, &complete_uri, Some(&alice), Some(proof.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PUT, &complete_uri, Some(&bob), Some(proof.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed_by"], "bob");
    assert_eq!(body["is_completed"], true);

    let (status, _) = app
        .send(Method::PUT, &complete_uri, Some(&bob), Some(proof))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Completed requests are frozen.
    let (status, _) = app.send(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn requests_can_be_searched_and_deleted() {
    let app = TestApp::new();
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;

    for (token, details) in [
        (&alice, "Walk the dog"),
        (&bob, "Water 100% of the plants"),
        (&alice, "Wash the car"),
    ] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/requests",
                Some(token),
                Some(json!({"details": details})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app.send(Method::GET, "/api/requests", None, None).await;
    let all = body["requests"].as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["details"], "Wash the car");

    let (_, body) = app
        .send(Method::GET, "/api/requests?author=alice", None, None)
        .await;
    assert_eq!(body["requests"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .send(Method::GET, "/api/requests?search=100%25", None, None)
        .await;
    let found = body["requests"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["author"], "bob");

    let id = all[0]["id"].as_str().unwrap();
    let uri = format!("/api/requests/{id}");
    let (status, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.send(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_details_are_bounded() {
    let app = TestApp::new();
    let alice = app.token("alice").await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/requests",
            Some(&alice),
            Some(json!({"details": "x".repeat(51)})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
