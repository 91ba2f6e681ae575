//! Integration tests for room availability search

use axum::http::StatusCode;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::TestApp;

struct Hotel {
    token: String,
    customer: Value,
    room_101: Value,
    room_102: Value,
}

/// Two Single rooms (80.00 a night) and one Double.
async fn hotel(app: &TestApp) -> Hotel {
    let token = app.admin_token().await;
    let single = app.create_rate(&token, "Single", 8_000).await;
    let double = app.create_rate(&token, "Double", 12_000).await;
    let room_101 = app.create_room(&token, "101", &single["id"]).await;
    let room_102 = app.create_room(&token, "102", &single["id"]).await;
    app.create_room(&token, "201", &double["id"]).await;
    let customer = app.create_customer(&token, "Ada").await;

    Hotel {
        token,
        customer,
        room_101,
        room_102,
    }
}

async fn search(app: &TestApp, token: &str, check_in: &str, check_out: &str) -> (StatusCode, Value) {
    app.get(
        &format!(
            "/admin/reservations/availability?room_type=Single&check_in={check_in}&check_out={check_out}"
        ),
        token,
    )
    .await
}

fn room_numbers(body: &Value) -> Vec<String> {
    body["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .map(|room| room["number"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn lists_free_rooms_with_a_quote() {
    let app = TestApp::new().await;
    let hotel = hotel(&app).await;

    let (status, body) = search(&app, &hotel.token, "2026-07-10", "2026-07-12").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["room_type"], "Single");
    assert_eq!(body["price_cents"], 8_000);
    assert_eq!(body["nights"], 2);
    assert_eq!(body["total_cents"], 16_000);
    assert_eq!(room_numbers(&body), vec!["101", "102"]);
}

#[tokio::test]
async fn overlapping_reservation_excludes_room_but_adjacent_does_not() {
    let app = TestApp::new().await;
    let hotel = hotel(&app).await;
    let (status, _) = app
        .book(
            &hotel.token,
            &hotel.customer["id"],
            &hotel.room_101["id"],
            "2026-07-10",
            "2026-07-12",
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = search(&app, &hotel.token, "2026-07-11", "2026-07-13").await;
    assert_eq!(room_numbers(&body), vec!["102"]);

    // Departure day of one stay is the arrival day of the next.
    let (_, body) = search(&app, &hotel.token, "2026-07-12", "2026-07-14").await;
    assert_eq!(room_numbers(&body), vec!["101", "102"]);

    let (_, body) = search(&app, &hotel.token, "2026-07-08", "2026-07-10").await;
    assert_eq!(room_numbers(&body), vec!["101", "102"]);
}

#[tokio::test]
async fn checked_in_blocks_and_checked_out_frees() {
    let app = TestApp::new().await;
    let hotel = hotel(&app).await;
    let (_, reservation) = app
        .book(
            &hotel.token,
            &hotel.customer["id"],
            &hotel.room_102["id"],
            "2026-08-01",
            "2026-08-03",
        )
        .await;
    let uri = format!("/admin/reservations/{}", reservation["id"].as_str().unwrap());

    let (status, _) = app
        .multipart(&format!("{uri}/check-in"), &hotel.token, &[("amount_paid", None, b"16000")])
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = search(&app, &hotel.token, "2026-08-01", "2026-08-02").await;
    assert_eq!(room_numbers(&body), vec!["101"]);

    let (status, _) = app
        .multipart(&format!("{uri}/check-out"), &hotel.token, &[("amount_paid", None, b"0")])
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = search(&app, &hotel.token, "2026-08-01", "2026-08-02").await;
    assert_eq!(room_numbers(&body), vec!["101", "102"]);
}

#[tokio::test]
async fn out_of_service_rooms_are_hidden_and_unbookable() {
    let app = TestApp::new().await;
    let hotel = hotel(&app).await;
    let room_uri = format!("/admin/rooms/{}", hotel.room_101["id"].as_str().unwrap());

    let (status, _) = app
        .put(&room_uri, &hotel.token, json!({ "is_available": false }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = search(&app, &hotel.token, "2026-09-01", "2026-09-02").await;
    assert_eq!(room_numbers(&body), vec!["102"]);

    let (status, _) = app
        .book(
            &hotel.token,
            &hotel.customer["id"],
            &hotel.room_101["id"],
            "2026-09-01",
            "2026-09-02",
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_searches() {
    let app = TestApp::new().await;
    let hotel = hotel(&app).await;

    let (status, _) = app
        .get(
            "/admin/reservations/availability?room_type=Penthouse&check_in=2026-07-10&check_out=2026-07-12",
            &hotel.token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = search(&app, &hotel.token, "2026-07-12", "2026-07-10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = search(&app, &hotel.token, "2026-07-10", "not-a-date").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
