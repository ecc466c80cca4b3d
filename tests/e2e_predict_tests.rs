//! End-to-end tests for the prediction endpoint with the mock classifier.

mod common;

use common::{TestClient, TestServer};
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
async fn predict_remaps_labels_and_persists_the_cry() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let dog = create_dog(&client).await;

    // the mock classifier answers {whining: 0.1, relax: 0.6, hostile: 0.3}
    let response = client
        .post_file(
            &format!("/cry/predict?pet_id={}", dog),
            "bark.wav",
            "audio/wav",
            b"RIFFfake-wav-payload".to_vec(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cry: Value = response.json().await.unwrap();

    assert_eq!(cry["state"], "happy");
    assert_eq!(
        cry["predictMap"],
        json!({ "sad": 0.1, "happy": 0.6, "anger": 0.3 })
    );
    assert!(cry["audioId"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}_", dog)));

    // the created cry is fetchable like any other
    let response = client.get(&format!("/cry/cry/{}", cry["id"])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn predict_rejects_non_wav_uploads() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let dog = create_dog(&client).await;

    let response = client
        .post_file(
            &format!("/cry/predict?pet_id={}", dog),
            "bark.mp3",
            "audio/mpeg",
            b"not-wav".to_vec(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_requires_ownership() {
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

    let response = other
        .post_file(
            &format!("/cry/predict?pet_id={}", dog),
            "bark.wav",
            "audio/wav",
            b"RIFF".to_vec(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
