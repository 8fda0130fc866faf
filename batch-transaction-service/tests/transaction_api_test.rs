//! HTTP-level tests for the transaction endpoints against the in-memory store.

mod common;

use axum::http::StatusCode;
use common::*;
use tower::ServiceExt;
use uuid::Uuid;

async fn batch_ids(app: &axum::Router) -> Vec<Uuid> {
    let list = app
        .clone()
        .oneshot(get("/api/transactions?per_page=100", Some(&maker_token())))
        .await
        .unwrap();
    body_json(list).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["id"].as_str().unwrap().parse().unwrap())
        .collect()
}

/// Upload the two-row batch and return the id it was stored under.
async fn create_batch(app: &axum::Router) -> Uuid {
    let before = batch_ids(app).await;

    let response = app
        .clone()
        .oneshot(upload(&maker_token(), TWO_ROW_CSV, &standard_fields()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    batch_ids(app)
        .await
        .into_iter()
        .find(|id| !before.contains(id))
        .expect("new batch should be listed")
}

#[tokio::test]
async fn health_and_metrics_need_no_token() {
    let (app, _) = spawn_app();

    let health = app.clone().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "ok");

    let ready = app.clone().oneshot(get("/ready", None)).await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let metrics = app.oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
}

#[tokio::test]
async fn transaction_routes_require_a_valid_bearer_token() {
    let (app, _) = spawn_app();

    for token in [None, Some("not-a-jwt")] {
        let response = app
            .clone()
            .oneshot(get("/api/transactions", token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(response).await["error"].is_string());
    }
}

#[tokio::test]
async fn upload_creates_batch_with_ordered_details() {
    let (app, store) = spawn_app();

    let response = app
        .clone()
        .oneshot(upload(&maker_token(), TWO_ROW_CSV, &standard_fields()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["total_record"], 2);
    assert_eq!(body["total_amount"], 300.5);
    assert_eq!(body["message"], "Transaction created successfully");
    assert_eq!(store.header_count().await, 1);

    let list = body_json(
        app.clone()
            .oneshot(get("/api/transactions", Some(&maker_token())))
            .await
            .unwrap(),
    )
    .await;
    let header = &list["data"][0];
    assert_eq!(header["transaction_status"], "waiting_approval");
    assert_eq!(header["maker"], "maker-1");
    assert_eq!(header["from_account"], "999");
    assert_eq!(list["pagination"]["total_items"], 1);

    let id = header["id"].as_str().unwrap();
    let detail = app
        .oneshot(get(&format!("/api/transactions/{id}"), Some(&approver_token())))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);

    let rows = body_json(detail).await;
    let rows = rows["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["account_name_dest"], "Alice");
    assert_eq!(rows[0]["amount"], 100.5);
    assert_eq!(rows[1]["account_name_dest"], "Bob");
    assert_eq!(rows[1]["amount"], 200.0);
}

#[tokio::test]
async fn malformed_amount_rejects_whole_upload() {
    let (app, store) = spawn_app();

    let csv = "bank,acc,name,amount\nBCA,1001,Alice,abc\n";
    let response = app
        .oneshot(upload(&maker_token(), csv, &standard_fields()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("row 1"));
    assert_eq!(store.header_count().await, 0);
    assert_eq!(store.detail_count().await, 0);
}

#[tokio::test]
async fn missing_or_invalid_form_fields_are_bad_requests() {
    let (app, store) = spawn_app();

    let no_total = [("total_record", "2"), ("from_account", "999")];
    let response = app
        .clone()
        .oneshot(upload(&maker_token(), TWO_ROW_CSV, &no_total))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_record = [
        ("total_amount", "300.5"),
        ("total_record", "two"),
        ("from_account", "999"),
    ];
    let response = app
        .oneshot(upload(&maker_token(), TWO_ROW_CSV, &bad_record))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.header_count().await, 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, store) = spawn_app_with(&[("MAX_UPLOAD_BYTES", "64")]);

    let csv = format!("h\n{}", "BCA,1001,Alice,1\n".repeat(20));
    let response = app
        .oneshot(upload(&maker_token(), &csv, &standard_fields()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.header_count().await, 0);
}

#[tokio::test]
async fn upload_cap_applies_to_the_file_not_the_form() {
    let (app, store) = spawn_app_with(&[("MAX_UPLOAD_BYTES", "200")]);

    // 2 + 11 * 17 = 189 bytes of file inside a larger multipart body.
    let fits = format!("h\n{}", "BCA,1001,Alice,1\n".repeat(11));
    let response = app
        .clone()
        .oneshot(upload(&maker_token(), &fits, &standard_fields()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let too_big = format!("h\n{}", "BCA,1001,Alice,1\n".repeat(12));
    let response = app
        .oneshot(upload(&maker_token(), &too_big, &standard_fields()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.header_count().await, 1);
}

#[tokio::test]
async fn empty_file_is_a_bad_request() {
    let (app, store) = spawn_app();

    let response = app
        .oneshot(upload(&maker_token(), "", &standard_fields()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("header row"));
    assert_eq!(store.header_count().await, 0);
}

#[tokio::test]
async fn over_long_destination_fields_are_bad_requests() {
    let (app, store) = spawn_app();

    let csv = format!("h\nBCA,{},Alice,1\n", "1".repeat(65));
    let response = app
        .clone()
        .oneshot(upload(&maker_token(), &csv, &standard_fields()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("account_id_dest"));

    let long_account = "9".repeat(65);
    let fields = [
        ("total_amount", "300.5"),
        ("total_record", "2"),
        ("from_account", long_account.as_str()),
    ];
    let response = app
        .oneshot(upload(&maker_token(), TWO_ROW_CSV, &fields))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(store.header_count().await, 0);
    assert_eq!(store.detail_count().await, 0);
}

#[tokio::test]
async fn approve_once_then_conflict() {
    let (app, _) = spawn_app();
    let id = create_batch(&app).await;
    let uri = format!("/api/transactions/{id}");

    let response = app
        .clone()
        .oneshot(patch_status(&uri, &approver_token(), "approved"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Transaction updated successfully"
    );

    let response = app
        .clone()
        .oneshot(patch_status(&uri, &approver_token(), "rejected"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let summary = body_json(
        app.oneshot(get("/api/transactions/summary", Some(&maker_token())))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(summary["total_approved"], 1);
    assert_eq!(summary["total_rejected"], 0);
    assert_eq!(summary["total_waiting_approval"], 0);
}

#[tokio::test]
async fn invalid_status_values_are_rejected() {
    let (app, _) = spawn_app();
    let id = create_batch(&app).await;
    let uri = format!("/api/transactions/{id}");

    for status in ["waiting_approval", "bogus"] {
        let response = app
            .clone()
            .oneshot(patch_status(&uri, &approver_token(), status))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid transaction status");
    }
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let (app, _) = spawn_app();

    let response = app
        .clone()
        .oneshot(patch_status(
            &format!("/api/transactions/{}", Uuid::new_v4()),
            &approver_token(),
            "approved",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get("/api/transactions/not-a-uuid", Some(&maker_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid transaction id");

    let response = app
        .oneshot(get(
            &format!("/api/transactions/{}", Uuid::new_v4()),
            Some(&maker_token()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], serde_json::json!([]));
}

#[tokio::test]
async fn empty_list_has_empty_data_array() {
    let (app, _) = spawn_app();

    let body = body_json(
        app.oneshot(get("/api/transactions", Some(&maker_token())))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(body["data"], serde_json::json!([]));
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["pagination"]["per_page"], 10);
    assert_eq!(body["pagination"]["total_items"], 0);
    assert_eq!(body["pagination"]["total_pages"], 0);
    assert_eq!(body["pagination"]["has_next_page"], false);
    assert_eq!(body["pagination"]["has_prev_page"], false);
}

#[tokio::test]
async fn maximal_page_size_returns_a_single_page() {
    let (app, _) = spawn_app();
    create_batch(&app).await;
    create_batch(&app).await;

    let response = app
        .oneshot(get(
            "/api/transactions?per_page=9223372036854775807",
            Some(&maker_token()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["total_items"], 2);
    assert_eq!(body["pagination"]["has_next_page"], false);
}

#[tokio::test]
async fn list_filters_by_repeated_status_params() {
    let (app, _) = spawn_app();

    let approved = create_batch(&app).await;
    let rejected = create_batch(&app).await;
    create_batch(&app).await;

    for (id, status) in [(approved, "approved"), (rejected, "rejected")] {
        let response = app
            .clone()
            .oneshot(patch_status(
                &format!("/api/transactions/{id}"),
                &approver_token(),
                status,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body = body_json(
        app.clone()
            .oneshot(get(
                "/api/transactions?status=approved&status=rejected",
                Some(&maker_token()),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["pagination"]["total_items"], 2);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|h| h["transaction_status"] != "waiting_approval"));

    let response = app
        .oneshot(get("/api/transactions?status=bogus", Some(&maker_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let (app, _) = spawn_app();

    let response = app
        .oneshot(get("/api/transactions/summary", Some(&maker_token())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}
