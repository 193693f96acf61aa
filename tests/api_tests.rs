// tests/api_tests.rs

use assessment::{
    config::Config,
    models::{admin::NewAdmin, question::Question},
    repository::Storage,
    routes,
    state::AppState,
    utils::hash::hash_password,
};
use serde_json::{Value, json};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-pass-123";

fn question(id: i64, answer: &str) -> Question {
    Question {
        id,
        text: format!("Question {}", id),
        options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        category: "general".to_string(),
        correct_answer: answer.to_string(),
        weight: 1,
        explanation: Some("Analysis".to_string()),
    }
}

/// Storage with a three-question key (answers A, B, C) and one admin.
async fn seeded_storage() -> Storage {
    let storage = Storage::in_memory();
    storage
        .questions
        .replace_all(&[question(1, "A"), question(2, "B"), question(3, "C")])
        .await
        .unwrap();
    storage
        .admins
        .create(&NewAdmin {
            username: "admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
        })
        .await
        .unwrap();
    storage
}

/// Spawns the app on a random port against the given storage.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app_with(storage: Storage) -> String {
    let config = Config::for_tests("test_secret_for_integration_tests");
    let app = routes::create_router(AppState::new(storage, config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn spawn_app() -> String {
    spawn_app_with(seeded_storage().await).await
}

fn unique_email() -> String {
    format!("c_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}

async fn candidate_token(client: &reqwest::Client, address: &str, email: &str) -> String {
    let resp: Value = client
        .post(format!("{}/api/login", address))
        .json(&json!({ "name": "Casey", "email": email }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    resp["token"].as_str().expect("Token not found").to_string()
}

async fn admin_token(client: &reqwest::Client, address: &str) -> String {
    let resp: Value = client
        .post(format!("{}/api/admin/login", address))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .expect("Admin login failed")
        .json()
        .await
        .expect("Failed to parse admin login json");

    resp["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/health", address)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn login_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/login", address))
        .json(&json!({ "name": "Casey", "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn questions_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/questions", address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn questions_do_not_leak_answer_key() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    let questions: Vec<Value> = client
        .get(format!("{}/api/questions", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0]["id"], 1);
    for q in &questions {
        assert!(q.get("correctAnswer").is_none());
        assert!(q.get("explanation").is_none());
        assert!(q.get("weight").is_none());
    }
}

#[tokio::test]
async fn test_assessment_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email();
    let token = candidate_token(&client, &address, &email).await;

    // 1. Fresh login opens a progress record with the full duration
    let progress: Value = client
        .get(format!("{}/api/user-progress", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["hasProgress"], true);
    assert_eq!(progress["currentQuestionIndex"], 0);
    assert!(progress["timeRemaining"].as_u64().unwrap() <= 1800);

    // 2. Autosave a partial answer set
    let saved: Value = client
        .post(format!("{}/api/save-progress", address))
        .bearer_auth(&token)
        .json(&json!({
            "currentQuestionIndex": 1,
            "timeRemaining": 1500,
            "answers": { "1": "A" }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(saved["saved"], true);

    // 3. Resume sees the saved state
    let progress: Value = client
        .get(format!("{}/api/user-progress", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["currentQuestionIndex"], 1);
    assert_eq!(progress["answers"]["1"], "A");
    assert!(progress["timeRemaining"].as_u64().unwrap() <= 1500);

    // 4. Submit: one correct, one wrong, one skipped
    let submit = |answers: Value| {
        client
            .post(format!("{}/api/submit", address))
            .bearer_auth(&token)
            .json(&json!({ "answers": answers }))
            .send()
    };

    let first = submit(json!({ "1": "A", "2": "C", "3": "" })).await.unwrap();
    assert_eq!(first.status().as_u16(), 200);
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["score"], 33);
    assert_eq!(first["correctCount"], 1);
    assert_eq!(first["wrongCount"], 1);
    assert_eq!(first["skippedCount"], 1);

    // 5. Progress is gone after submit
    let progress: Value = client
        .get(format!("{}/api/user-progress", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["hasProgress"], false);

    // 6. A retried submit yields the same score
    let second: Value = submit(json!({ "1": "A", "2": "C", "3": "" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["score"], first["score"]);

    // 7. Exactly one result record exists for the candidate
    let admin = admin_token(&client, &address).await;
    let results: Vec<Value> = client
        .get(format!("{}/api/admin/results", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let mine: Vec<&Value> = results.iter().filter(|r| r["email"] == email.as_str()).collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["completed"], true);

    // 8. The summary is visible on the candidate record
    let users: Vec<Value> = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let me = users.iter().find(|u| u["email"] == email.as_str()).unwrap();
    assert_eq!(me["testSubmitted"], true);
    assert_eq!(me["overallScore"], 33);
}

#[tokio::test]
async fn submit_rejects_malformed_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    for answers in [json!(["A", "B"]), json!({ "1": 7 }), json!("A")] {
        let response = client
            .post(format!("{}/api/submit", address))
            .bearer_auth(&token)
            .json(&json!({ "answers": answers }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    // Nothing was finalized, so progress is still there.
    let progress: Value = client
        .get(format!("{}/api/user-progress", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["hasProgress"], true);
}

#[tokio::test]
async fn save_progress_after_submit_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    client
        .post(format!("{}/api/submit", address))
        .bearer_auth(&token)
        .json(&json!({ "answers": { "1": "A" } }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/save-progress", address))
        .bearer_auth(&token)
        .json(&json!({ "currentQuestionIndex": 2, "timeRemaining": 100, "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn expired_timer_auto_submits_saved_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    client
        .post(format!("{}/api/save-progress", address))
        .bearer_auth(&token)
        .json(&json!({
            "currentQuestionIndex": 2,
            "timeRemaining": 0,
            "answers": { "1": "A", "2": "B" }
        }))
        .send()
        .await
        .unwrap();

    let progress: Value = client
        .get(format!("{}/api/user-progress", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(progress["autoSubmitted"], true);
    assert_eq!(progress["hasProgress"], false);
    assert_eq!(progress["result"]["score"], 67);
    assert_eq!(progress["result"]["skippedCount"], 1);
}

#[tokio::test]
async fn answers_cannot_change_after_time_runs_out() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    let save = |answers: Value| {
        client
            .post(format!("{}/api/save-progress", address))
            .bearer_auth(&token)
            .json(&json!({
                "currentQuestionIndex": 2,
                "timeRemaining": 0,
                "answers": answers
            }))
            .send()
    };

    // Final save as the clock hits zero: all wrong.
    let first = save(json!({ "1": "B", "2": "C", "3": "A" })).await.unwrap();
    assert_eq!(first.status().as_u16(), 200);

    // Later edits are refused.
    let second = save(json!({ "1": "A", "2": "B", "3": "C" })).await.unwrap();
    assert_eq!(second.status().as_u16(), 409);

    // A late manual submit is marked on what was saved.
    let submitted: Value = client
        .post(format!("{}/api/submit", address))
        .bearer_auth(&token)
        .json(&json!({ "answers": { "1": "A", "2": "B", "3": "C" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submitted["score"], 0);
    assert_eq!(submitted["wrongCount"], 3);
}

#[tokio::test]
async fn submit_without_answer_key_is_retryable_failure() {
    let storage = Storage::in_memory();
    let address = spawn_app_with(storage).await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    let questions: Vec<Value> = client
        .get(format!("{}/api/questions", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(questions.is_empty());

    let response = client
        .post(format!("{}/api/submit", address))
        .bearer_auth(&token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = candidate_token(&client, &address, &unique_email()).await;

    let response = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .post(format!("{}/api/admin/login", address))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn test_admin_management_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (alice, bob) = (unique_email(), unique_email());
    candidate_token(&client, &address, &alice).await;
    candidate_token(&client, &address, &bob).await;

    let admin = admin_token(&client, &address).await;

    // 1. Audit log records the sign-in
    let logs: Vec<Value> = client
        .get(format!("{}/api/admin/admin-logs", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["email"], ADMIN_EMAIL);

    let log_id = logs[0]["id"].as_i64().unwrap();
    let response = client
        .delete(format!("{}/api/admin/admin-logs/{}", address, log_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // 2. Single delete
    let response = client
        .delete(format!("{}/api/admin/users/{}", address, alice))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .delete(format!("{}/api/admin/users/{}", address, alice))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // 3. Bulk delete reports per-row outcomes
    let outcomes: Vec<Value> = client
        .post(format!("{}/api/admin/users/bulk-delete", address))
        .bearer_auth(&admin)
        .json(&json!({ "emails": [bob, "ghost@example.com"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["deleted"], true);
    assert_eq!(outcomes[1]["deleted"], false);
    assert_eq!(outcomes[1]["error"], "User not found");

    let users: Vec<Value> = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(users.is_empty());
}
