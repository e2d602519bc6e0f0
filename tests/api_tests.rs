//! End-to-end tests through the router.
//!
//! Each test runs against its own temporary database and upload directory,
//! with recording stubs in place of the mail relay and completion API.

use axum::http::{header, Method, StatusCode};
use edu_portal::auth::token::verify_token;
use edu_portal::config::Config;
use serde_json::json;

mod common;

use common::{
    body_bytes, body_json, create_test_app, create_test_app_with, create_test_app_with_store,
    get_request, json_request, upload_request, Fault, FaultyStore, Part,
};
use std::sync::Arc;
use std::time::Duration;

const PDF_BYTES: &[u8] = b"%PDF-1.4\n\n";

fn paper_parts<'a>(title: &'a str, data: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::Text("type", "paper"),
        Part::Text("title", title),
        Part::Text("description", "Lecture notes"),
        Part::Text("tags", "rust, systems"),
        Part::File {
            name: "file",
            file_name: "notes.pdf",
            content_type: "application/pdf",
            data,
        },
    ]
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_and_login_resolve_to_same_user() {
    let app = create_test_app();

    let registered = app.register("Alice", "Alice@X.com", "secret123").await;
    assert_eq!(registered["name"], "Alice");
    assert_eq!(registered["email"], "alice@x.com");
    assert_eq!(registered["role"], "student");
    assert!(registered.get("password").is_none());
    assert!(registered.get("password_hash").is_none());

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({"email": "alice@x.com", "password": "secret123"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in = body_json(response).await;
    assert_eq!(logged_in["id"], registered["id"]);

    let identity = verify_token(
        logged_in["token"].as_str().unwrap(),
        &app.state.config.auth.jwt_secret,
    )
    .unwrap();
    assert_eq!(identity.id, registered["id"].as_str().unwrap());
    assert_eq!(identity.name, "Alice");
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = create_test_app();
    app.register("Alice", "alice@x.com", "secret123").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/register",
            None,
            &json!({"name": "Other", "email": " ALICE@x.com", "password": "different1", "role": "teacher"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_register_validation() {
    let app = create_test_app();

    let cases = [
        json!({"name": "", "email": "a@x.com", "password": "secret123", "role": "student"}),
        json!({"name": "A", "email": "not-an-email", "password": "secret123", "role": "student"}),
        json!({"name": "A", "email": "a@x.com", "password": "123", "role": "student"}),
        json!({"name": "A", "email": "a@x.com", "password": "secret123", "role": "admin"}),
        json!({"name": "A", "email": "a@x.com", "password": "secret123"}),
    ];

    for case in cases {
        let response = app
            .send(json_request(Method::POST, "/api/auth/register", None, &case))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {case}");
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_test_app();
    app.register("Alice", "alice@x.com", "secret123").await;

    let wrong_password = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({"email": "alice@x.com", "password": "wrong-password"}),
        ))
        .await;
    let unknown_user = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({"email": "bob@x.com", "password": "secret123"}),
        ))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(wrong_password).await["message"],
        body_json(unknown_user).await["message"]
    );
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = create_test_app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            &json!({"email": "nobody@x.com"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = create_test_app();
    app.register("Alice", "alice@x.com", "secret123").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            &json!({"email": "alice@x.com"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Password reset link sent!");

    let mail = app.mailer.sent.lock().unwrap()[0].clone();
    assert_eq!(mail.to, "alice@x.com");
    assert_eq!(mail.subject, "Password Reset");
    let token = mail
        .text
        .split("/reset-password/")
        .nth(1)
        .expect("mail should contain a reset link")
        .trim()
        .to_string();

    let reset = json!({"token": token, "password": "brand-new-pass"});
    let response = app
        .send(json_request(Method::POST, "/api/auth/reset-password", None, &reset))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The token is single use
    let response = app
        .send(json_request(Method::POST, "/api/auth/reset-password", None, &reset))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let old = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({"email": "alice@x.com", "password": "secret123"}),
        ))
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({"email": "alice@x.com", "password": "brand-new-pass"}),
        ))
        .await;
    assert_eq!(new.status(), StatusCode::OK);
}

/// Ask for a reset link and return the token from the mailed URL.
async fn request_reset_token(app: &common::TestApp, email: &str) -> String {
    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            &json!({ "email": email }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mail = app.mailer.sent.lock().unwrap().last().cloned().unwrap();
    mail.text
        .split("/reset-password/")
        .nth(1)
        .expect("mail should contain a reset link")
        .trim()
        .to_string()
}

#[tokio::test]
async fn test_older_reset_link_is_dead_after_reset() {
    let app = create_test_app();
    app.register("Alice", "alice@x.com", "secret123").await;

    let older = request_reset_token(&app, "alice@x.com").await;
    let newer = request_reset_token(&app, "alice@x.com").await;
    assert_ne!(older, newer);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/reset-password",
            None,
            &json!({"token": newer, "password": "owner-chosen"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/reset-password",
            None,
            &json!({"token": older, "password": "attacker-chosen"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let login = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({"email": "alice@x.com", "password": "owner-chosen"}),
        ))
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    assert_eq!(app.state.db.reset_token_count().unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_forgot_password_keeps_one_token() {
    let app = create_test_app();
    app.register("Alice", "alice@x.com", "secret123").await;

    for _ in 0..5 {
        request_reset_token(&app, "alice@x.com").await;
    }
    assert_eq!(app.state.db.reset_token_count().unwrap(), 1);
}

#[tokio::test]
async fn test_reset_with_unknown_token() {
    let app = create_test_app();
    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/reset-password",
            None,
            &json!({"token": "made-up", "password": "whatever1"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = create_test_app();

    for uri in [
        "/api/v1/content/myuploads",
        "/api/v1/content/notes",
        "/api/v1/profile",
    ] {
        let response = app.send(get_request(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {uri}");
        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
    }

    let response = app
        .send(get_request("/api/v1/content/myuploads", Some("garbage.token.here")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_without_token_stores_nothing() {
    let app = create_test_app();

    let response = app
        .send(upload_request(None, &paper_parts("Notes", PDF_BYTES)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.state.db.list_all_content(None).unwrap().is_empty());
}

// ============================================================================
// Content
// ============================================================================

#[tokio::test]
async fn test_upload_then_fetch_binary() {
    let app = create_test_app();
    let alice = app.register("Alice", "alice@x.com", "secret123").await;
    let token = alice["token"].as_str().unwrap();

    let response = app
        .send(upload_request(Some(token), &paper_parts("Week 1", PDF_BYTES)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let content = body_json(response).await;

    assert_eq!(content["title"], "Week 1");
    assert_eq!(content["description"], "Lecture notes");
    assert_eq!(content["type"], "paper");
    assert_eq!(content["tags"], json!(["rust", "systems"]));
    assert_eq!(content["views"], 0);
    assert_eq!(content["byteSize"], 10);
    assert_eq!(content["mimeType"], "application/pdf");
    assert_eq!(content["uploadedBy"], alice["id"]);

    let file_url = content["fileUrl"].as_str().unwrap();
    assert!(file_url.starts_with("/uploads/file-"));
    assert!(file_url.ends_with(".pdf"));

    // Binaries are public
    let response = app.send(get_request(file_url, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(body_bytes(response).await, PDF_BYTES);
}

#[tokio::test]
async fn test_my_uploads_only_lists_own_content() {
    let app = create_test_app();
    let alice = app.token_for("Alice", "alice@x.com").await;
    let bob = app.token_for("Bob", "bob@x.com").await;

    for title in ["First", "Second"] {
        let response = app
            .send(upload_request(Some(&alice), &paper_parts(title, PDF_BYTES)))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .send(get_request("/api/v1/content/myuploads", Some(&alice)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mine = body_json(response).await;
    let titles: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);

    let response = app
        .send(get_request("/api/v1/content/myuploads", Some(&bob)))
        .await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_all_content_is_public_and_filterable() {
    let app = create_test_app();
    let token = app.token_for("Alice", "alice@x.com").await;

    app.send(upload_request(Some(&token), &paper_parts("Paper", PDF_BYTES)))
        .await;
    let video_parts = vec![
        Part::Text("type", "video"),
        Part::Text("title", "Clip"),
        Part::File {
            name: "file",
            file_name: "clip.mp4",
            content_type: "video/mp4",
            data: b"not really a video",
        },
    ];
    let response = app.send(upload_request(Some(&token), &video_parts)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let all = body_json(app.send(get_request("/api/v1/content/all", None)).await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["title"], "Paper");
    assert_eq!(all[1]["title"], "Clip");

    let videos =
        body_json(app.send(get_request("/api/v1/content/all?type=video", None)).await).await;
    assert_eq!(videos.as_array().unwrap().len(), 1);
    assert_eq!(videos[0]["type"], "video");

    let response = app
        .send(get_request("/api/v1/content/all?type=audio", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = create_test_app();
    let token = app.token_for("Alice", "alice@x.com").await;

    let parts = vec![Part::Text("type", "paper"), Part::Text("title", "No file")];
    let response = app.send(upload_request(Some(&token), &parts)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "file field is required");

    // An empty file part counts as no file
    let response = app
        .send(upload_request(Some(&token), &paper_parts("Empty", b"")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.state.db.list_all_content(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_field_validation() {
    let app = create_test_app();
    let token = app.token_for("Alice", "alice@x.com").await;

    let file = Part::File {
        name: "file",
        file_name: "notes.pdf",
        content_type: "application/pdf",
        data: PDF_BYTES,
    };

    // Missing title
    let parts = vec![Part::Text("type", "paper"), file];
    let response = app.send(upload_request(Some(&token), &parts)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown type
    let parts = paper_parts("Notes", PDF_BYTES)
        .into_iter()
        .map(|p| match p {
            Part::Text("type", _) => Part::Text("type", "podcast"),
            other => other,
        })
        .collect::<Vec<_>>();
    let response = app.send(upload_request(Some(&token), &parts)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.state.db.list_all_content(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_with_wrong_media_type() {
    let app = create_test_app();
    let token = app.token_for("Alice", "alice@x.com").await;

    let parts = vec![
        Part::Text("type", "paper"),
        Part::Text("title", "Not a paper"),
        Part::File {
            name: "file",
            file_name: "clip.mp4",
            content_type: "video/mp4",
            data: b"0123456789",
        },
    ];
    let response = app.send(upload_request(Some(&token), &parts)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.state.db.list_all_content(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let mut config = Config::test_default();
    config.limits.max_paper_size = 5;
    let app = create_test_app_with(config);
    let token = app.token_for("Alice", "alice@x.com").await;

    let response = app
        .send(upload_request(Some(&token), &paper_parts("Too big", PDF_BYTES)))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.state.db.list_all_content(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_storage_write_creates_no_record() {
    let store = Arc::new(FaultyStore::new(Fault::FailWrites));
    let app = create_test_app_with_store(Config::test_default(), store.clone());
    let token = app.token_for("Alice", "alice@x.com").await;

    let response = app
        .send(upload_request(Some(&token), &paper_parts("Lost", PDF_BYTES)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Upload failed");

    assert!(app.state.db.list_all_content(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_stalled_storage_write_times_out_and_is_cleaned_up() {
    let mut config = Config::test_default();
    config.storage.timeout_secs = 1;
    let store = Arc::new(FaultyStore::new(Fault::StallWrites(Duration::from_secs(5))));
    let app = create_test_app_with_store(config, store.clone());
    let token = app.token_for("Alice", "alice@x.com").await;

    let response = app
        .send(upload_request(Some(&token), &paper_parts("Slow", PDF_BYTES)))
        .await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_json(response).await["status"], "error");
    assert!(app.state.db.list_all_content(None).unwrap().is_empty());

    // Cleanup of the abandoned write runs in the background
    let mut deleted = Vec::new();
    for _ in 0..40 {
        deleted = store.deleted.lock().unwrap().clone();
        if !deleted.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(deleted.len(), 1);
    assert!(deleted[0].starts_with("file-"));
    assert!(deleted[0].ends_with(".pdf"));
}

#[tokio::test]
async fn test_fetch_missing_binary() {
    let app = create_test_app();

    let response = app
        .send(get_request("/uploads/file-0-missing.pdf", None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get_request("/uploads/..hidden", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Notes and profile
// ============================================================================

#[tokio::test]
async fn test_notes_lifecycle() {
    let app = create_test_app();
    let token = app.token_for("Alice", "alice@x.com").await;

    let empty = body_json(
        app.send(get_request("/api/v1/content/notes", Some(&token)))
            .await,
    )
    .await;
    assert_eq!(empty["content"], "");

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/content/notes",
            Some(&token),
            &json!({"content": "Remember lifetimes"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["content"], "Remember lifetimes");
    assert_eq!(saved["username"], "Alice");

    let fetched = body_json(
        app.send(get_request("/api/v1/content/notes", Some(&token)))
            .await,
    )
    .await;
    assert_eq!(fetched["content"], "Remember lifetimes");

    let response = app
        .send(json_request(
            Method::DELETE,
            "/api/v1/content/notes",
            Some(&token),
            &json!({}),
        ))
        .await;
    assert_eq!(body_json(response).await["deleted"], true);
}

#[tokio::test]
async fn test_profile_defaults_and_update() {
    let app = create_test_app();
    let token = app.token_for("Alice", "alice@x.com").await;

    let response = app.send(get_request("/api/v1/profile", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["name"], "Alice");
    assert_eq!(profile["email"], "alice@x.com");
    assert_eq!(profile["about"], "");

    let response = app
        .send(json_request(
            Method::PUT,
            "/api/v1/profile",
            Some(&token),
            &json!({"study": "Physics", "about": "Hello"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["study"], "Physics");
    assert_eq!(updated["name"], "Alice");

    let response = app
        .send(json_request(
            Method::PUT,
            "/api/v1/profile",
            Some(&token),
            &json!({"about": "x".repeat(201)}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Interview practice
// ============================================================================

#[tokio::test]
async fn test_generate_questions() {
    let app = create_test_app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/interview/generate",
            None,
            &json!({"skills": ["Rust", "SQL"], "interest": "backend"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["questions"],
        json!([
            "What is ownership?",
            "What is borrowing?",
            "What is a lifetime?"
        ])
    );

    let prompts = app.completions.prompts.lock().unwrap();
    assert!(prompts[0].contains("Rust, SQL"));
    assert!(prompts[0].contains("backend"));
}

#[tokio::test]
async fn test_interview_validation() {
    let app = create_test_app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/interview/generate",
            None,
            &json!({"skills": [], "interest": "backend"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/interview/feedback",
            None,
            &json!({"answers": []}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.completions.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_interview_feedback() {
    let app = create_test_app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/interview/feedback",
            None,
            &json!({"answers": [{"question": "What is Send?", "answer": "Thread transferable"}]}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["feedback"].is_string());

    let prompts = app.completions.prompts.lock().unwrap();
    assert!(prompts[0].contains("Q: What is Send?\nA: Thread transferable"));
}

// ============================================================================
// Internal
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_test_app();
    let response = app.send(get_request("/_internal/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_purge_only_in_test_mode() {
    let app = create_test_app();
    app.register("Alice", "alice@x.com", "secret123").await;

    let response = app
        .send(json_request(Method::DELETE, "/admin/purge", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["users_deleted"], 1);

    let mut config = Config::test_default();
    config.test_mode = false;
    let app = create_test_app_with(config);
    let response = app
        .send(json_request(Method::DELETE, "/admin/purge", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
