//! Keychain endpoints against in-memory storage.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use common::{empty_request, json_request, register, send, test_app};

#[tokio::test]
async fn requires_bearer_token() {
    let app = test_app();

    let missing = send(&app, empty_request(Method::GET, "/api/keychain", None)).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let bogus = send(
        &app,
        empty_request(Method::GET, "/api/keychain", Some("not-a-jwt")),
    )
    .await;
    assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn credential_lifecycle() {
    let app = test_app();
    let token = register(&app, "alice").await;

    let added = send(
        &app,
        json_request(
            Method::POST,
            "/api/keychain/credential",
            Some(&token),
            json!({"title": "Mail", "login": "alice@example.com", "password": "hunter2"}),
        ),
    )
    .await;
    assert_eq!(added.status, StatusCode::CREATED);
    let key_uuid = added.json["key_uuid"].as_str().unwrap().to_string();
    let key_uri = format!("/api/keychain/{key_uuid}");

    let fetched = send(&app, empty_request(Method::GET, &key_uri, Some(&token))).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json["uuid"], json!(key_uuid));
    assert_eq!(fetched.json["type"], "credential");
    assert_eq!(fetched.json["title"], "Mail");
    assert_eq!(fetched.json["data"]["login"], "alice@example.com");
    assert_eq!(fetched.json["data"]["password"], "hunter2");

    let listed = send(&app, empty_request(Method::GET, "/api/keychain", Some(&token))).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json["keys"].as_array().unwrap().len(), 1);

    let deleted = send(&app, empty_request(Method::DELETE, &key_uri, Some(&token))).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = send(&app, empty_request(Method::GET, &key_uri, Some(&token))).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let again = send(&app, empty_request(Method::DELETE, &key_uri, Some(&token))).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn keys_are_private_to_their_owner() {
    let app = test_app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bobby").await;

    let added = send(
        &app,
        json_request(
            Method::POST,
            "/api/keychain/text",
            Some(&alice),
            json!({"title": "Diary", "text": "dear diary"}),
        ),
    )
    .await;
    assert_eq!(added.status, StatusCode::CREATED);
    let key_uri = format!("/api/keychain/{}", added.json["key_uuid"].as_str().unwrap());

    let peek = send(&app, empty_request(Method::GET, &key_uri, Some(&bob))).await;
    assert_eq!(peek.status, StatusCode::NOT_FOUND);
    let listed = send(&app, empty_request(Method::GET, "/api/keychain", Some(&bob))).await;
    assert!(listed.json["keys"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listing_filters_by_type() {
    let app = test_app();
    let token = register(&app, "alice").await;

    let card = send(
        &app,
        json_request(
            Method::POST,
            "/api/keychain/card",
            Some(&token),
            json!({
                "title": "My Card",
                "number": "4716532755237178",
                "exp_date": "12/30",
                "cvv": "123",
                "holder": "Alice"
            }),
        ),
    )
    .await;
    assert_eq!(card.status, StatusCode::CREATED);
    let text = send(
        &app,
        json_request(
            Method::POST,
            "/api/keychain/text",
            Some(&token),
            json!({"title": "Note", "text": "hello"}),
        ),
    )
    .await;
    assert_eq!(text.status, StatusCode::CREATED);

    let cards = send(
        &app,
        empty_request(Method::GET, "/api/keychain?type=card", Some(&token)),
    )
    .await;
    let keys = cards.json["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["type"], "card");
    assert_eq!(keys[0]["title"], "My Card");

    let unknown = send(
        &app,
        empty_request(Method::GET, "/api/keychain?type=rocket", Some(&token)),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_secrets_are_rejected() {
    let app = test_app();
    let token = register(&app, "alice").await;

    let bad_card = send(
        &app,
        json_request(
            Method::POST,
            "/api/keychain/card",
            Some(&token),
            json!({"title": "Card", "number": "1234567890", "exp_date": "1/30", "cvv": "123", "holder": "A"}),
        ),
    )
    .await;
    assert_eq!(bad_card.status, StatusCode::BAD_REQUEST);

    let long_title = send(
        &app,
        json_request(
            Method::POST,
            "/api/keychain/text",
            Some(&token),
            json!({"title": "t".repeat(129), "text": "x"}),
        ),
    )
    .await;
    assert_eq!(long_title.status, StatusCode::BAD_REQUEST);

    let bad_uuid = send(
        &app,
        empty_request(Method::GET, "/api/keychain/not-a-uuid", Some(&token)),
    )
    .await;
    assert_eq!(bad_uuid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn file_upload_round_trip() {
    let app = test_app();
    let token = register(&app, "alice").await;

    let boundary = "keeper-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nblob.bin\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nbinary\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"blob.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&[0, 159, 146, 150, 255]);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/keychain/file")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let added = send(&app, request).await;
    assert_eq!(added.status, StatusCode::CREATED);

    let key_uri = format!("/api/keychain/{}", added.json["key_uuid"].as_str().unwrap());
    let fetched = send(&app, empty_request(Method::GET, &key_uri, Some(&token))).await;
    assert_eq!(fetched.json["type"], "file");
    assert_eq!(fetched.json["title"], "blob.bin");
    assert_eq!(fetched.json["data"]["file"], "AJ+Slv8=");
    assert_eq!(fetched.json["data"]["note"], "binary");
}
