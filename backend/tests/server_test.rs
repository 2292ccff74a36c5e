use std::sync::Arc;

use serde_json::{Value, json};

use tutor_api::api::router;
use tutor_api::db::SqliteStore;
use tutor_api::state::AppState;

#[tokio::test]
async fn test_serves_over_tcp() {
    let store = SqliteStore::in_memory()
        .await
        .expect("Failed to create database");
    let app = router(AppState::new(Arc::new(store)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health request failed")
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({ "ok": true }));

    let response = client
        .post(format!("{}/tutors", base))
        .json(&json!({ "tutorName": "Ana", "language": "Spanish", "price": 20 }))
        .send()
        .await
        .expect("create request failed");
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    let id = created["insertedId"].as_str().unwrap();

    let fetched: Value = client
        .get(format!("{}/tutors/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["data"]["review"], 0);

    server.abort();
}
