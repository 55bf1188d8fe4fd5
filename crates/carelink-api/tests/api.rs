//! End-to-end checks of the HTTP surface against an in-memory database.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use carelink_api::{AppStateInner, router};
use carelink_db::Database;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    uploads: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let uploads = TempDir::new().unwrap();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.into(),
            upload_dir: uploads.path().to_path_buf(),
        });
        Self {
            router: router(state),
            uploads,
        }
    }

    async fn raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: &str,
        body: Vec<u8>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let payload = body.map(|b| b.to_string().into_bytes()).unwrap_or_default();
        let (status, bytes) = self
            .raw(method, uri, token, "application/json", payload)
            .await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Sign up and return (token, user id, caregiver or recipient profile id).
    async fn signup(&self, username: &str, role: &str) -> (String, i64, i64) {
        let mut body = json!({
            "username": username,
            "name": format!("{} Example", username),
            "password": "long-enough-password",
            "role": role,
        });
        body[role] = json!({});
        let (status, value) = self.call(Method::POST, "/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", value);

        let token = value["token"].as_str().unwrap().to_string();
        let user_id = value["user"]["id"].as_i64().unwrap();
        let profile_path = if role == "caregiver" { "caregivers" } else { "recipients" };
        let (status, profile) = self
            .get(&format!("/{}/user/{}", profile_path, user_id), &token)
            .await;
        assert_eq!(status, StatusCode::OK);
        (token, user_id, profile["id"].as_i64().unwrap())
    }
}

#[tokio::test]
async fn accepted_request_links_the_pair() {
    let app = TestApp::new();
    let (carol, _, caregiver) = app.signup("carol", "caregiver").await;
    let (rita, _, recipient) = app.signup("rita", "recipient").await;

    let (status, created) = app
        .post(
            "/requests",
            &carol,
            json!({ "caregiverId": caregiver, "recipientId": recipient }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let request_id = created["id"].as_i64().unwrap();

    let (status, pending) = app
        .get(&format!("/recipients/{}/requests?status=pending", recipient), &rita)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, accepted) = app
        .patch(&format!("/requests/{}", request_id), &rita, json!({ "status": "accepted" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert!(accepted["respondedAt"].is_string());

    let (_, linked) = app
        .get(&format!("/caregivers/{}/recipients", caregiver), &carol)
        .await;
    assert_eq!(linked[0]["id"].as_i64(), Some(recipient));

    let (_, linked) = app
        .get(&format!("/recipients/{}/caregivers", recipient), &rita)
        .await;
    assert_eq!(linked[0]["id"].as_i64(), Some(caregiver));

    // A second answer loses and leaves the first one in place.
    let (status, body) = app
        .patch(&format!("/requests/{}", request_id), &rita, json!({ "status": "rejected" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (_, all) = app
        .get(&format!("/recipients/{}/requests", recipient), &rita)
        .await;
    assert_eq!(all[0]["status"], "accepted");

    // Linked pairs cannot request again.
    let (status, _) = app
        .post(
            "/requests",
            &carol,
            json!({ "caregiverId": caregiver, "recipientId": recipient }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_pending_request_conflicts_until_rejected() {
    let app = TestApp::new();
    let (carol, _, caregiver) = app.signup("carol", "caregiver").await;
    let (rita, _, recipient) = app.signup("rita", "recipient").await;
    let body = json!({ "caregiverId": caregiver, "recipientId": recipient });

    let (status, first) = app.post("/requests", &carol, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/requests", &carol, body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, rejected) = app
        .patch(
            &format!("/requests/{}", first["id"]),
            &rita,
            json!({ "status": "rejected" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");

    let (status, second) = app.post("/requests", &carol, body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(second["id"], first["id"]);

    let (_, rows) = app
        .get(&format!("/recipients?caregiverId={}", caregiver), &carol)
        .await;
    let row = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"].as_i64() == Some(recipient))
        .unwrap();
    assert_eq!(row["requestId"], second["id"]);
    assert_eq!(row["requestStatus"], "pending");
}

#[tokio::test]
async fn request_errors_map_to_statuses() {
    let app = TestApp::new();
    let (carol, _, caregiver) = app.signup("carol", "caregiver").await;
    let (dave, _, _) = app.signup("dave", "caregiver").await;
    let (rita, _, recipient) = app.signup("rita", "recipient").await;
    let (sam, _, _) = app.signup("sam", "recipient").await;

    // No token
    let (status, _) = app
        .call(Method::GET, &format!("/recipients/{}/requests", recipient), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Garbage token
    let (status, _) = app
        .get(&format!("/recipients/{}/requests", recipient), "not-a-jwt")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Sending as someone else's caregiver profile
    let (status, _) = app
        .post(
            "/requests",
            &dave,
            json!({ "caregiverId": caregiver, "recipientId": recipient }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown recipient
    let (status, _) = app
        .post(
            "/requests",
            &carol,
            json!({ "caregiverId": caregiver, "recipientId": 9999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, created) = app
        .post(
            "/requests",
            &carol,
            json!({ "caregiverId": caregiver, "recipientId": recipient }),
        )
        .await;
    let uri = format!("/requests/{}", created["id"]);

    // Another recipient cannot answer
    let (status, _) = app.patch(&uri, &sam, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Only terminal decisions are accepted
    let (status, _) = app.patch(&uri, &rita, json!({ "status": "pending" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.patch(&uri, &rita, json!({ "status": "maybe" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch("/requests/424242", &rita, json!({ "status": "accepted" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get(&format!("/recipients/{}/requests?status=bogus", recipient), &rita)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Only the recipient sees their inbox
    let (status, _) = app
        .get(&format!("/recipients/{}/requests", recipient), &sam)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown fields are rejected as JSON errors
    let (status, body) = app
        .post(
            "/requests",
            &carol,
            json!({ "caregiverId": caregiver, "recipientId": recipient, "extra": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn direct_link_is_idempotent() {
    let app = TestApp::new();
    let (carol, _, caregiver) = app.signup("carol", "caregiver").await;
    let (_, _, recipient) = app.signup("rita", "recipient").await;
    let body = json!({ "caregiverId": caregiver, "recipientId": recipient });

    let (status, first) = app.post("/care-relationships", &carol, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = app.post("/care-relationships", &carol, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);

    let (status, _) = app
        .post(
            "/care-relationships",
            &carol,
            json!({ "caregiverId": caregiver, "recipientId": 777 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_and_login() {
    let app = TestApp::new();
    app.signup("carol", "caregiver").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/signup",
            None,
            Some(json!({
                "username": "Carol",
                "name": "Another Carol",
                "password": "long-enough-password",
                "role": "caregiver",
                "caregiver": {},
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            "/signup",
            None,
            Some(json!({
                "username": "nora",
                "name": "Nora",
                "password": "long-enough-password",
                "role": "recipient",
                "caregiver": {},
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "carol", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": " CAROL ", "password": "long-enough-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "carol");
    assert_eq!(body["user"]["role"], "caregiver");
    assert!(body["user"].get("password").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, _) = app.get("/caregivers", token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profiles_are_edited_by_their_owner() {
    let app = TestApp::new();
    let (carol, carol_user, _) = app.signup("carol", "caregiver").await;
    let (rita, _, recipient) = app.signup("rita", "recipient").await;

    let (status, updated) = app
        .put(
            &format!("/recipients/{}", recipient),
            &rita,
            json!({ "name": "Rita R.", "likes": "gardening" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["user"]["name"], "Rita R.");
    assert_eq!(updated["likes"], "gardening");

    let (status, _) = app
        .put(&format!("/recipients/{}", recipient), &carol, json!({ "likes": "noise" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, renamed) = app
        .put(&format!("/caregivers/{}", carol_user), &carol, json!({ "name": "Caroline" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Caroline");
    let (_, profile) = app
        .get(&format!("/caregivers/user/{}", carol_user), &carol)
        .await;
    assert_eq!(profile["user"]["name"], "Caroline");

    let (status, _) = app
        .put(&format!("/caregivers/{}", carol_user), &rita, json!({ "name": "Nope" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn journal_entries_and_comments() {
    let app = TestApp::new();
    let (carol, _, caregiver) = app.signup("carol", "caregiver").await;
    let (rita, _, recipient) = app.signup("rita", "recipient").await;

    let (status, _) = app
        .get("/journal-entries", &rita)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, entry) = app
        .post(
            "/journal-entries",
            &rita,
            json!({ "recipientId": recipient, "content": "Walked to the park", "mood": "happy" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = entry["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            "/journal-entries",
            &rita,
            json!({ "recipientId": recipient, "content": "x", "mood": "grumpy" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Not linked yet
    let (_, accepted) = app
        .get(&format!("/journal-entries/accepted?caregiverId={}", caregiver), &carol)
        .await;
    assert!(accepted.as_array().unwrap().is_empty());

    app.post(
        "/care-relationships",
        &carol,
        json!({ "caregiverId": caregiver, "recipientId": recipient }),
    )
    .await;
    let (_, accepted) = app
        .get(&format!("/journal-entries/accepted?caregiverId={}", caregiver), &carol)
        .await;
    assert_eq!(accepted[0]["id"].as_str(), Some(entry_id.as_str()));

    let (status, updated) = app
        .put(&format!("/journal-entries/{}", entry_id), &rita, json!({ "mood": "neutral" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["mood"], "neutral");
    assert_eq!(updated["content"], "Walked to the park");

    let (status, _) = app
        .put(&format!("/journal-entries/{}", entry_id), &rita, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comment) = app
        .post(
            "/comments",
            &carol,
            json!({ "journalEntryId": entry_id, "content": "Lovely!" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["authorRole"], "caregiver");
    let comment_uri = format!("/comments/{}", comment["id"]);

    let (_, listed) = app
        .get(&format!("/comments?journalEntryId={}", entry_id), &rita)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app.put(&comment_uri, &rita, json!({ "content": "edited" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, edited) = app.put(&comment_uri, &carol, json!({ "content": "Lovely day!" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Lovely day!");

    // Deleting the entry takes its comments along.
    let (status, _) = app.delete(&format!("/journal-entries/{}", entry_id), &rita).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&comment_uri, &carol).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/journal-entries/{}", entry_id), &rita).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn todos_lifecycle() {
    let app = TestApp::new();
    let (carol, _, caregiver) = app.signup("carol", "caregiver").await;
    let (_, _, recipient) = app.signup("rita", "recipient").await;

    let (status, _) = app
        .post(
            "/todos",
            &carol,
            json!({
                "title": "Pharmacy",
                "description": "Pick up prescription",
                "dueDate": "tomorrow",
                "recipientId": recipient,
                "caregiverId": caregiver,
                "priority": "high",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, todo) = app
        .post(
            "/todos",
            &carol,
            json!({
                "title": "Pharmacy",
                "description": "Pick up prescription",
                "dueDate": "2026-11-02T10:00:00Z",
                "recipientId": recipient,
                "caregiverId": caregiver,
                "priority": "high",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(todo["completed"], false);
    let uri = format!("/todos/{}", todo["id"]);

    let (_, open) = app
        .get(&format!("/todos?caregiverId={}&completed=false", caregiver), &carol)
        .await;
    assert_eq!(open.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/todos?priority=urgent", &carol).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, done) = app.put(&uri, &carol, json!({ "completed": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["completed"], true);
    assert_eq!(done["title"], "Pharmacy");

    let (_, open) = app
        .get(&format!("/todos?caregiverId={}&completed=false", caregiver), &carol)
        .await;
    assert!(open.as_array().unwrap().is_empty());

    let (status, _) = app.delete(&uri, &carol).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, &carol).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audio_upload_is_served_back() {
    let app = TestApp::new();
    let (carol, _, _) = app.signup("carol", "caregiver").await;
    let clip = b"not really an mp4".to_vec();

    let (status, _) = app
        .raw(Method::POST, "/audio", Some(&carol), "audio/mp4", Vec::new())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .raw(Method::POST, "/audio", None, "audio/mp4", clip.clone())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .raw(Method::POST, "/audio", Some(&carol), "audio/mp4", clip.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".mp4"));

    let (status, served) = app
        .raw(Method::GET, url, None, "application/octet-stream", Vec::new())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, clip);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn large_audio_is_fully_written_before_created() {
    let app = TestApp::new();
    let (carol, _, _) = app.signup("carol", "caregiver").await;
    let clip: Vec<u8> = (0..(8 * 1024 * 1024 + 123)).map(|i| (i % 251) as u8).collect();

    for _ in 0..5 {
        let (status, body) = app
            .raw(Method::POST, "/audio", Some(&carol), "audio/mp4", clip.clone())
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let body: Value = serde_json::from_slice(&body).unwrap();
        let name = body["url"].as_str().unwrap().trim_start_matches("/uploads/");

        let stored = std::fs::read(app.uploads.path().join(name)).unwrap();
        assert_eq!(stored.len(), clip.len());
        assert!(stored == clip);
    }
}
