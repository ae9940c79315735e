// tests/api_tests.rs

use audio_quiz::{config::Config, db, routes, state::AppState};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tempfile::TempDir;

const ADMIN_PASSWORD: &str = "let-me-in";

struct TestApp {
    address: String,
    pool: SqlitePool,
    client: reqwest::Client,
    _uploads: TempDir,
}

/// Helper function to spawn the app on a random port for testing.
/// Every app gets its own in-memory database and upload directory.
async fn spawn_app() -> TestApp {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    db::migrate(&pool).await.expect("Failed to migrate database");

    let uploads = tempfile::tempdir().expect("Failed to create upload dir");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        admin_password: ADMIN_PASSWORD.to_string(),
        upload_dir: uploads.path().to_path_buf(),
        static_dir: uploads.path().join("public"),
        port: 0,
        max_upload_bytes: 5 * 1024 * 1024,
        rust_log: "error".to_string(),
    };

    let state = AppState::new(pool.clone(), config)
        .await
        .expect("Failed to build state");
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
        _uploads: uploads,
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn admin_token(&self) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/admin-login"))
            .json(&json!({ "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    async fn upload(&self, token: &str, name: &str, audio: Vec<u8>) -> i64 {
        let form = Form::new().text("name", name.to_string()).part(
            "audio",
            Part::bytes(audio)
                .file_name("clip.mp3")
                .mime_str("audio/mpeg")
                .unwrap(),
        );
        let response = self
            .client
            .post(self.url("/api/assignment"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Upload failed");
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().expect("Assignment id missing")
    }

    /// Creates an A/B/C question with B correct. Returns (question id, id of B).
    async fn add_question(&self, token: &str, assignment_id: i64, text: &str) -> (i64, i64) {
        let response = self
            .client
            .post(self.url("/api/question"))
            .bearer_auth(token)
            .json(&json!({
                "assignmentId": assignment_id,
                "qtype": "mcq",
                "text": text,
                "choices": [
                    { "label": "A", "is_correct": false },
                    { "label": "B", "is_correct": true },
                    { "label": "C", "is_correct": false }
                ]
            }))
            .send()
            .await
            .expect("Create question failed");
        assert_eq!(response.status().as_u16(), 200);
        let question_id = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

        let questions: Vec<Value> = self
            .client
            .get(self.url(&format!("/api/questions?assignmentId={}", assignment_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let question = questions
            .iter()
            .find(|q| q["id"].as_i64() == Some(question_id))
            .expect("Question not listed");
        let b = question["choices"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["label"] == "B")
            .expect("Choice B not listed");

        (question_id, b["id"].as_i64().unwrap())
    }

    async fn register(&self, name: &str, roll: &str, college: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/register"))
            .json(&json!({ "name": name, "roll": roll, "college": college }))
            .send()
            .await
            .expect("Register failed")
    }

    async fn submit(&self, assignment_id: i64, answers: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/submit"))
            .json(&json!({
                "assignmentId": assignment_id,
                "name": "Alice",
                "roll": "1",
                "college": "X",
                "answers": answers
            }))
            .send()
            .await
            .expect("Submit failed")
    }
}

#[tokio::test]
async fn unknown_path_is_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_login_checks_password() {
    let app = spawn_app().await;

    let wrong = app
        .client
        .post(app.url("/api/admin-login"))
        .json(&json!({ "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    let right = app
        .client
        .post(app.url("/api/admin-login"))
        .json(&json!({ "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(right.status().as_u16(), 200);
    let body: Value = right.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn admin_routes_require_token() {
    let app = spawn_app().await;

    for path in ["/api/users", "/api/answers", "/api/export.csv"] {
        let response = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 401, "{} should be guarded", path);
    }

    let forged = app
        .client
        .get(app.url("/api/users"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status().as_u16(), 401);

    let response = app
        .client
        .post(app.url("/api/question"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn upload_requires_audio_and_defaults_name() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let missing = app
        .client
        .post(app.url("/api/assignment"))
        .bearer_auth(&token)
        .multipart(Form::new().text("name", "No audio"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 400);

    let form = Form::new().part("audio", Part::bytes(vec![1, 2, 3]).file_name("a.mp3"));
    let response = app
        .client
        .post(app.url("/api/assignment"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Untitled Assignment");
    assert!(body["audio"].as_str().unwrap().ends_with("a.mp3"));

    let listed: Vec<Value> = app
        .client
        .get(app.url("/api/assignments"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn question_validation() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let assignment = app.upload(&token, "A1", vec![0; 16]).await;

    let cases = [
        json!({ "assignmentId": assignment, "qtype": "text", "text": "Q",
                "choices": [{ "label": "A", "is_correct": true }, { "label": "B", "is_correct": false }] }),
        json!({ "assignmentId": assignment, "qtype": "mcq", "text": "Q",
                "choices": [{ "label": "A", "is_correct": true }] }),
        json!({ "assignmentId": assignment, "qtype": "mcq", "text": "Q",
                "choices": [{ "label": "A", "is_correct": true }, { "label": "B", "is_correct": true }] }),
        json!({ "assignmentId": assignment, "qtype": "mcq", "text": "",
                "choices": [{ "label": "A", "is_correct": true }, { "label": "B", "is_correct": false }] }),
    ];

    for case in cases {
        let response = app
            .client
            .post(app.url("/api/question"))
            .bearer_auth(&token)
            .json(&case)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "accepted {}", case);
    }

    let unknown = app
        .client
        .post(app.url("/api/question"))
        .bearer_auth(&token)
        .json(&json!({ "assignmentId": 999, "qtype": "mcq", "text": "Q",
                       "choices": [{ "label": "A", "is_correct": "1" }, { "label": "B", "is_correct": 0 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn questions_hide_correct_flag_and_can_be_deleted() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let assignment = app.upload(&token, "A1", vec![0; 16]).await;
    let (question_id, _) = app.add_question(&token, assignment, "Pick B").await;

    let raw = app
        .client
        .get(app.url(&format!("/api/questions?assignmentId={}", assignment)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!raw.contains("is_correct"));

    let missing_param = app.client.get(app.url("/api/questions")).send().await.unwrap();
    assert_eq!(missing_param.status().as_u16(), 400);

    let deleted: Value = app
        .client
        .delete(app.url(&format!("/api/question/{}", question_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["deleted"], 1);

    let choices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM choices")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(choices, 0);

    let listed: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/questions?assignmentId={}", assignment)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn registration_rules() {
    let app = spawn_app().await;

    // Nothing to attempt yet.
    let early = app.register("Alice", "1", "X").await;
    assert_eq!(early.status().as_u16(), 400);
    let body: Value = early.json().await.unwrap();
    assert_eq!(body["error"], "No assignments available.");

    let token = app.admin_token().await;
    app.upload(&token, "A1", vec![0; 16]).await;
    app.upload(&token, "A2", vec![0; 16]).await;

    let blank = app.register("Alice", " ", "X").await;
    assert_eq!(blank.status().as_u16(), 400);

    let first = app.register("Alice", "1", "X").await;
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(first.json::<Value>().await.unwrap()["success"], true);

    let again = app.register("Alice", "1", "X").await;
    assert_eq!(again.status().as_u16(), 400);
    assert_eq!(
        again.json::<Value>().await.unwrap()["error"],
        "This student is already registered."
    );

    let attempts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(attempts, 2);

    // A different college is a different student.
    let other = app.register("Alice", "1", "Y").await;
    assert_eq!(other.status().as_u16(), 200);
}

#[tokio::test]
async fn full_quiz_flow() {
    // Arrange
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let audio: Vec<u8> = (0..=255).collect();
    let assignment = app.upload(&token, "A1", audio.clone()).await;
    let (question_id, b) = app.add_question(&token, assignment, "Pick B").await;
    assert_eq!(app.register("Alice", "1", "X").await.status().as_u16(), 200);

    // Act: listen once
    let stream_url = app.url(&format!(
        "/api/stream/{}?name=Alice&roll=1&college=X",
        assignment
    ));
    let first = app.client.get(&stream_url).send().await.unwrap();
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(first.headers()["accept-ranges"], "bytes");
    assert_eq!(first.bytes().await.unwrap().to_vec(), audio);

    let second = app.client.get(&stream_url).send().await.unwrap();
    assert_eq!(second.status().as_u16(), 403);
    assert_eq!(
        second.json::<Value>().await.unwrap()["error"],
        "Audio already played once."
    );

    // Act: answer
    let response = app
        .submit(assignment, json!([{ "questionId": question_id, "answer": b }]))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let score: Value = response.json().await.unwrap();

    // Assert
    assert_eq!(score, json!({ "score": 1, "total": 1 }));

    let (used, stored_score, stored_total): (bool, i64, i64) =
        sqlx::query_as("SELECT used, score, total FROM attempts WHERE assignment_id = ?")
            .bind(assignment)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert!(used);
    assert_eq!((stored_score, stored_total), (1, 1));

    let users: Value = app
        .client
        .get(app.url("/api/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user = &users["users"][0];
    assert_eq!(user["name"], "Alice");
    assert_eq!(user["used_count"], 1);
    assert_eq!(user["total_assignments"], 1);

    let answers: Value = app
        .client
        .get(app.url("/api/answers?name=Alice&roll=1&college=X"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        answers["answers"],
        json!([{ "assignment": "A1", "question": "Pick B", "answer": "B" }])
    );

    let csv = app
        .client
        .get(app.url("/api/export.csv"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(csv.status().as_u16(), 200);
    assert!(
        csv.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let text = csv.text().await.unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Name,Roll,College,Assignment,Question,Answer"));
    assert_eq!(lines.next(), Some("\"Alice\",\"1\",\"X\",\"A1\",\"Pick B\",\"B\""));
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn submit_scores_only_known_questions() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let first = app.upload(&token, "A1", vec![0; 16]).await;
    let second = app.upload(&token, "A2", vec![0; 16]).await;
    let (q1, b1) = app.add_question(&token, first, "One").await;
    let (q2, _) = app.add_question(&token, first, "Two").await;
    let (foreign, foreign_b) = app.add_question(&token, second, "Elsewhere").await;
    app.register("Alice", "1", "X").await;

    let score: Value = app
        .submit(
            first,
            json!([
                { "questionId": q1, "answer": b1.to_string() },
                { "questionId": q2, "answer": foreign_b },
                { "questionId": foreign, "answer": foreign_b }
            ]),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(score, json!({ "score": 1, "total": 2 }));

    let logged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(logged, 2);
}

#[tokio::test]
async fn submit_edge_cases() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let assignment = app.upload(&token, "A1", vec![0; 16]).await;

    // Not registered yet.
    let stranger = app.submit(assignment, json!([])).await;
    assert_eq!(stranger.status().as_u16(), 403);

    app.register("Alice", "1", "X").await;

    // No questions on the assignment.
    let empty: Value = app.submit(assignment, json!([])).await.json().await.unwrap();
    assert_eq!(empty, json!({ "score": 0, "total": 0 }));

    let missing = app
        .client
        .post(app.url("/api/submit"))
        .json(&json!({ "assignmentId": assignment, "name": "Alice", "roll": "1", "college": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 400);
    assert_eq!(missing.json::<Value>().await.unwrap()["error"], "Missing fields.");
}

#[tokio::test]
async fn odd_answer_values_count_as_wrong() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let assignment = app.upload(&token, "A1", vec![0; 16]).await;
    let (question_id, _) = app.add_question(&token, assignment, "Pick B").await;
    app.register("Alice", "1", "X").await;

    for answer in [json!({ "questionId": question_id, "answer": null }), json!({ "questionId": question_id })] {
        let response = app.submit(assignment, json!([answer])).await;
        assert_eq!(response.status().as_u16(), 200);
        let score: Value = response.json().await.unwrap();
        assert_eq!(score, json!({ "score": 0, "total": 1 }));
    }

    let stored: Vec<String> = sqlx::query_scalar("SELECT answer_text FROM submissions")
        .fetch_all(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, vec![String::new(), String::new()]);
}

#[tokio::test]
async fn numeric_roll_registers_and_streams() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let assignment = app.upload(&token, "A1", vec![9; 32]).await;

    let response = app
        .client
        .post(app.url("/api/register"))
        .json(&json!({ "name": "Alice", "roll": 7, "college": "MIT" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let stream = app
        .client
        .get(app.url(&format!(
            "/api/stream/{}?name=Alice&roll=7&college=MIT",
            assignment
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status().as_u16(), 200);
    assert_eq!(stream.bytes().await.unwrap().len(), 32);
}

#[tokio::test]
async fn malformed_json_gets_json_error() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/register"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing fields.");

    let wrong_shape = app
        .client
        .post(app.url("/api/submit"))
        .json(&json!({ "assignmentId": "one", "answers": "none" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_shape.status().as_u16(), 400);
    assert_eq!(wrong_shape.json::<Value>().await.unwrap()["error"], "Missing fields.");
}

#[tokio::test]
async fn resubmission_overwrites_score_and_appends_rows() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let assignment = app.upload(&token, "A1", vec![0; 16]).await;
    let (question_id, b) = app.add_question(&token, assignment, "Pick B").await;
    app.register("Alice", "1", "X").await;

    let first: Value = app
        .submit(assignment, json!([{ "questionId": question_id, "answer": b }]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first, json!({ "score": 1, "total": 1 }));

    let second: Value = app
        .submit(assignment, json!([{ "questionId": question_id, "answer": b + 1 }]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second, json!({ "score": 0, "total": 1 }));

    let stored: (i64, i64) =
        sqlx::query_as("SELECT score, total FROM attempts WHERE assignment_id = ?")
            .bind(assignment)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(stored, (0, 1));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 2);
}
