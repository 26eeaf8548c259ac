use std::sync::Arc;

use rollcall_model::{AttendanceRecord, StudentDocument, StudentId};
use rollcall_service::db::{MemoryStore, MemoryUsers, UserDirectory};
use rollcall_service::{api, state::AppState};
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct ApiFixture {
    base_url: String,
    client: reqwest::Client,
    store: Arc<MemoryStore>,
    users: Arc<MemoryUsers>,
}

impl ApiFixture {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

async fn start_api() -> ApiFixture {
    let entries: Vec<Value> = ["2024-01-01", "2024-01-15", "2024-02-01"]
        .iter()
        .map(|date| json!({"teacher": "Dr. Rao", "date": date, "time": "09:00", "status": "present"}))
        .collect();
    let store = Arc::new(MemoryStore::with_students(vec![StudentDocument {
        id: StudentId::new("u23cs1042"),
        name: Some("Asha".to_string()),
        attendance: AttendanceRecord::from_json(&json!({"3": {"CS101": entries}})),
    }]));
    let users = Arc::new(MemoryUsers::new());

    let app = api::create_router(AppState::new(store.clone(), users.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ApiFixture {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        users,
    }
}

fn report_body() -> Value {
    json!({
        "subject": "CS101",
        "startDate": "2024-01-01",
        "endDate": "2024-01-31",
        "semester": "3",
        "division": "A"
    })
}

#[tokio::test]
async fn report_returns_rows_with_wire_fields() {
    let api = start_api().await;

    let response = api.post("/api/getAttendanceReport", report_body()).await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let rows: Value = response.json().await.unwrap();
    let row = &rows[0];
    assert_eq!(row["studentId"], "u23cs1042");
    assert_eq!(row["name"], "Asha");
    assert_eq!(row["degree"], "B.Tech");
    assert_eq!(row["department"], "Computer Science and Engineering");
    assert_eq!(row["year"], "2023");
    assert_eq!(row["rollNumber"], "1042");
    assert_eq!(row["attendanceRecords"].as_array().unwrap().len(), 2);
    assert_eq!(row["statistics"]["totalClasses"], 2);
    assert_eq!(row["statistics"]["present"], 2);
    assert_eq!(row["statistics"]["absent"], 0);
    assert_eq!(row["statistics"]["percentage"], 100.0);
}

#[tokio::test]
async fn report_accepts_numeric_semester() {
    let api = start_api().await;

    let mut body = report_body();
    body["semester"] = json!(3);
    let response = api.post("/api/getAttendanceReport", body).await;
    assert_eq!(response.status(), 200);

    let rows: Value = response.json().await.unwrap();
    assert_eq!(rows[0]["studentId"], "u23cs1042");
    assert_eq!(rows[0]["statistics"]["totalClasses"], 2);

    let response = api
        .post(
            "/api/getAttendanceById",
            json!({"studentId": "u23cs1042", "semester": 3, "subject": "CS101"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let row: Value = response.json().await.unwrap();
    assert_eq!(row["statistics"]["totalClasses"], 3);
}

#[tokio::test]
async fn report_with_no_matching_students_is_empty() {
    let api = start_api().await;

    let mut body = report_body();
    body["semester"] = json!("7");
    let response = api.post("/api/getAttendanceReport", body).await;
    assert_eq!(response.status(), 200);
    let rows: Value = response.json().await.unwrap();
    assert_eq!(rows, json!([]));

    let mut body = report_body();
    body["studentIds"] = json!(["u23cs0001"]);
    let response = api.post("/api/getAttendanceReport", body).await;
    assert_eq!(response.status(), 200);
    let rows: Value = response.json().await.unwrap();
    assert_eq!(rows, json!([]));
}

#[tokio::test]
async fn report_validation_error_is_problem_json() {
    let api = start_api().await;

    let mut body = report_body();
    body["subject"] = Value::Null;
    let response = api
        .client
        .post(format!("{}/api/getAttendanceReport", api.base_url))
        .header("x-request-id", "req-test-1")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(
        response.headers()["content-type"],
        "application/problem+json"
    );
    let problem: Value = response.json().await.unwrap();
    assert_eq!(problem["detail"], "Subject code is required");
    assert_eq!(problem["request_id"], "req-test-1");
    assert_eq!(problem["details"][0]["field"], "subject");
}

#[tokio::test]
async fn report_store_failure_is_generic_500() {
    let api = start_api().await;
    api.store.set_unavailable(true);

    let response = api.post("/api/getAttendanceReport", report_body()).await;
    assert_eq!(response.status(), 500);
    let problem: Value = response.json().await.unwrap();
    assert_eq!(problem["detail"], "Failed to retrieve attendance data");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let api = start_api().await;

    let response = api
        .client
        .post(format!("{}/api/getAttendanceReport", api.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let problem: Value = response.json().await.unwrap();
    assert_eq!(problem["code"], "invalid_body");
}

#[tokio::test]
async fn student_report_by_id() {
    let api = start_api().await;

    let response = api
        .post(
            "/api/getAttendanceById",
            json!({"studentId": "u23cs1042", "semester": "3", "subject": "CS101"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let row: Value = response.json().await.unwrap();
    assert_eq!(row["attendanceRecords"].as_array().unwrap().len(), 3);
    assert_eq!(row["statistics"]["totalClasses"], 3);

    let response = api
        .post(
            "/api/getAttendanceById",
            json!({"studentId": "u23cs0000", "semester": "3", "subject": "CS101"}),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = api
        .post("/api/getAttendanceById", json!({"studentId": "u23cs1042"}))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn save_token_registers_push_token() {
    let api = start_api().await;

    let response = api
        .post(
            "/api/save-token",
            json!({"userId": "u23cs1042", "expoToken": "ExponentPushToken[abc]"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Token saved");

    let token = api
        .users
        .push_token(&StudentId::new("u23cs1042"))
        .await
        .unwrap();
    assert_eq!(token.as_deref(), Some("ExponentPushToken[abc]"));

    let response = api
        .post("/api/save-token", json!({"userId": "u23cs1042", "expoToken": " "}))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn readiness_follows_store_health() {
    let api = start_api().await;

    let url = format!("{}/readyz", api.base_url);
    let response = api.client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);

    api.store.set_unavailable(true);
    let response = api.client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["attendance_store"]["status"], "unavailable");

    let response = api
        .client
        .get(format!("{}/healthz", api.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
