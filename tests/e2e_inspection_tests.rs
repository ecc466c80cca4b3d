//! End-to-end tests for the cry inspection endpoint.

mod common;

use chrono::Utc;
use common::fixtures::seed_cries;
use common::{TestClient, TestServer, TEST_UID};
use petcry_server::vocab::CryState;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_dog(client: &TestClient) -> i64 {
    let response = client
        .post_json(
            "/pet/create",
            &json!({
                "name": "Bami",
                "gender": "female",
                "age": 3,
                "species": "dog",
                "sub_species": "maltese"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn under_the_sample_floor_no_report_is_returned() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let dog = create_dog(&client).await;

    seed_cries(
        &server.store,
        TEST_UID,
        dog,
        Utc::now(),
        99,
        &[(CryState::Happy, 2.0)],
    );

    let response = client.get(&format!("/cry/inspect?pet_id={}", dog)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn report_contains_the_documented_aggregates() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let dog = create_dog(&client).await;

    // anger dominates both frequency and duration
    seed_cries(
        &server.store,
        TEST_UID,
        dog,
        Utc::now(),
        120,
        &[
            (CryState::Anger, 10.0),
            (CryState::Anger, 10.0),
            (CryState::Play, 4.0),
            (CryState::Happy, 4.0),
        ],
    );

    let response = client.get(&format!("/cry/inspect?pet_id={}", dog)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = response.json().await.unwrap();

    assert_eq!(report["cry_freq_hour"].as_array().unwrap().len(), 24);
    let hour_total: u64 = report["cry_freq_hour"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(hour_total, 120);

    let date_total: u64 = report["cry_freq_date"]["freqs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(date_total, 120);

    // type_freq object keys are ordered ascending by count
    let type_freq = report["type_freq"].as_object().unwrap();
    let keys: Vec<&String> = type_freq.keys().collect();
    assert_eq!(keys, ["happy", "play", "anger"]);
    assert_eq!(type_freq["anger"], json!(60));

    // minimum mean scales to 0, maximum to 1, everything in between
    let duration_of_type = &report["duration_of_type"];
    assert_eq!(duration_of_type["type"][0], "happy");
    let bars: Vec<f64> = duration_of_type["bar_percent"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(bars[0], 0.0);
    assert_eq!(*bars.last().unwrap(), 1.0);
    assert!(bars.iter().all(|b| (0.0..=1.0).contains(b)));
}

#[tokio::test]
async fn second_inspect_is_served_from_cache_even_after_new_cries() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let dog = create_dog(&client).await;

    seed_cries(
        &server.store,
        TEST_UID,
        dog,
        Utc::now(),
        100,
        &[(CryState::Happy, 2.0)],
    );

    let first: Value = client
        .get(&format!("/cry/inspect?pet_id={}", dog))
        .await
        .json()
        .await
        .unwrap();
    assert_ne!(first, Value::Null);

    // a new cry in the same window must not change the cached report
    seed_cries(
        &server.store,
        TEST_UID,
        dog,
        Utc::now(),
        1,
        &[(CryState::Sad, 9.0)],
    );

    let second: Value = client
        .get(&format!("/cry/inspect?pet_id={}", dog))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first, second);
    assert!(second["type_freq"].get("sad").is_none());
}

#[tokio::test]
async fn inspecting_a_foreign_pet_is_denied() {
    let server = TestServer::spawn().await;
    let owner = TestClient::authenticated(server.base_url.clone()).await;
    let other = TestClient::authenticated_as(
        server.base_url.clone(),
        "other-uid",
        "other@example.com",
        "other-nick",
    )
    .await;
    let dog = create_dog(&owner).await;

    let response = other.get(&format!("/cry/inspect?pet_id={}", dog)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
