//! API integration tests against a running server and database

use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so reruns against the same database do not collide
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

async fn post(client: &Client, path: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}{}", BASE_URL, path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn create_named(client: &Client, kind: &str) -> i64 {
    let response = post(client, &format!("/{}", kind), json!({ "name": unique(kind) })).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_bulk_create_customers_partial_success() {
    let client = Client::new();
    let x = unique("X");
    let y = unique("Y");

    let response = post(
        &client,
        "/customers/bulk",
        json!([{ "name": x }, { "name": x }, { "name": y }]),
    )
    .await;
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["succeeded"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"].as_array().unwrap().len(), 2);
    assert_eq!(body["reasons"], json!(["duplicate in the batch", "duplicate in the batch"]));

    // resubmitting the created name is now an "already exists" rejection
    let response = post(&client, "/customers/bulk", json!([{ "name": y }])).await;
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["reasons"], json!(["already exists"]));
}

#[tokio::test]
#[ignore]
async fn test_bulk_delete_reports_missing_ids() {
    let client = Client::new();
    let id = create_named(&client, "roles").await;

    let response = client
        .delete(format!("{}/roles/bulk", BASE_URL))
        .json(&json!([id, i32::MAX]))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["succeeded"][0]["id"], id);
    assert_eq!(body["failed"], json!([i32::MAX]));
    assert_eq!(body["reasons"], json!(["not found"]));
}

#[tokio::test]
#[ignore]
async fn test_equipment_cascade_delete() {
    let client = Client::new();

    let response = post(
        &client,
        "/equipment/bulk",
        json!([{
            "name": "rig",
            "serial_number": unique("RIG"),
            "components": [
                { "name": "pump", "components": [{ "name": "seal" }] },
                { "name": "valve" }
            ]
        }]),
    )
    .await;
    let body: Value = response.json().await.expect("Failed to parse response");
    let root = &body["succeeded"][0];
    let root_id = root["id"].as_str().unwrap().to_string();
    let seal_id = root["components"][0]["components"][0]["id"].as_str().unwrap().to_string();

    let response = client
        .delete(format!("{}/equipment/{}", BASE_URL, root_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    for id in [root_id, seal_id] {
        let response = client
            .get(format!("{}/equipment/{}", BASE_URL, id))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 404);
    }
}

#[tokio::test]
#[ignore]
async fn test_service_request_primary_assignee() {
    let client = Client::new();
    let customer = create_named(&client, "customers").await;
    let job_type = create_named(&client, "job-types").await;

    let mut users = Vec::new();
    for _ in 0..2 {
        let response = post(&client, "/users", json!({ "login": unique("tech") })).await;
        let body: Value = response.json().await.expect("Failed to parse response");
        users.push(body["id"].as_i64().unwrap());
    }

    let response = post(
        &client,
        "/service-requests/bulk",
        json!([{ "contract_id": unique("C"), "customer_id": customer, "job_type_id": job_type }]),
    )
    .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let request_id = body[0]["id"].as_i64().unwrap();

    for user in &users {
        let response = post(
            &client,
            &format!("/service-requests/{}/assignees", request_id),
            json!({ "user_id": user, "is_primary": true }),
        )
        .await;
        assert!(response.status().is_success());
    }

    let body: Value = client
        .get(format!("{}/service-requests/{}", BASE_URL, request_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let primaries: Vec<&Value> = body["assignees"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|link| link["is_primary_assignee"] == true)
        .collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["user_id"], users[1]);
}

#[tokio::test]
#[ignore]
async fn test_service_request_duplicate_contract_rejects_batch() {
    let client = Client::new();
    let customer = create_named(&client, "customers").await;
    let job_type = create_named(&client, "job-types").await;
    let contract = unique("C");

    let item = json!({ "contract_id": contract, "customer_id": customer, "job_type_id": job_type });
    let response = post(&client, "/service-requests/bulk", json!([item.clone(), item])).await;
    assert_eq!(response.status(), 409);

    let body: Value = client
        .get(format!("{}/service-requests", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|request| request["contract_id"] != contract.as_str()));
}
