//! Integration tests for the reservation lifecycle: booking, amending,
//! check-in, check-out and removal.

use axum::http::StatusCode;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::TestApp;

struct Booked {
    customer: Value,
    room: Value,
    reservation: Value,
}

/// One Single room at 100.00 a night and a three-night booking on it.
async fn booked(app: &TestApp, token: &str) -> Booked {
    let rate = app.create_rate(token, "Single", 10_000).await;
    let room = app.create_room(token, "101", &rate["id"]).await;
    let customer = app.create_customer(token, "Ada").await;

    let (status, reservation) = app
        .book(token, &customer["id"], &room["id"], "2026-03-01", "2026-03-04")
        .await;
    assert_eq!(status, StatusCode::CREATED, "{reservation}");

    Booked {
        customer,
        room,
        reservation,
    }
}

fn reservation_uri(reservation: &Value, suffix: &str) -> String {
    format!(
        "/admin/reservations/{}{}",
        reservation["id"].as_str().unwrap(),
        suffix
    )
}

fn customer_uri(customer: &Value) -> String {
    format!("/admin/customers/{}", customer["id"].as_str().unwrap())
}

#[tokio::test]
async fn booking_prices_the_stay_and_marks_the_customer() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;

    let reservation = &booked.reservation;
    assert_eq!(reservation["status"], "Reserved");
    assert_eq!(reservation["nights"], 3);
    assert_eq!(reservation["total_cents"], 30_000);
    assert_eq!(reservation["dues_cents"], 30_000);
    assert_eq!(reservation["paid_cents"], 0);

    let (_, customer) = app.get(&customer_uri(&booked.customer), &token).await;
    assert_eq!(customer["status"], "Reserved");
}

#[tokio::test]
async fn overlapping_booking_on_same_room_is_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;
    let other = app.create_customer(&token, "Grace").await;

    let (status, body) = app
        .book(&token, &other["id"], &booked.room["id"], "2026-03-03", "2026-03-05")
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Checking in on the departure day is fine.
    let (status, _) = app
        .book(&token, &other["id"], &booked.room["id"], "2026-03-04", "2026-03-06")
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_bookings_are_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;

    let (status, _) = app
        .book(
            &token,
            &booked.customer["id"],
            &booked.room["id"],
            "2026-04-05",
            "2026-04-05",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .book(
            &token,
            &json!(uuid::Uuid::new_v4()),
            &booked.room["id"],
            "2026-04-01",
            "2026-04-02",
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/admin/reservations",
            &token,
            json!({
                "customer_id": booked.customer["id"],
                "room_id": booked.room["id"],
                "check_in": "2026-04-01",
                "check_out": "2026-04-02",
                "guests": 5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn check_in_then_check_out() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;

    let (status, body) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-in"),
            &token,
            &[
                ("amount_paid", None, b"10000"),
                ("discount", None, b"1000"),
                ("notes", None, b"Paid by card"),
                ("proof_of_payment", Some(("receipt.png", "image/png")), b"PNG"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let reservation = &body["reservation"];
    assert_eq!(reservation["status"], "Checked-In");
    assert_eq!(reservation["total_cents"], 30_000);
    assert_eq!(reservation["discount_cents"], 1_000);
    assert_eq!(reservation["paid_cents"], 10_000);
    assert_eq!(reservation["dues_cents"], 19_000);
    assert_eq!(reservation["notes"], "Paid by card");
    assert!(reservation["checked_in_at"].is_string());
    assert_eq!(reservation["proof_of_payment"].as_array().unwrap().len(), 1);
    assert!(body.get("warnings").is_none());
    assert_eq!(app.images.len(), 1);

    let (_, customer) = app.get(&customer_uri(&booked.customer), &token).await;
    assert_eq!(customer["status"], "Checked-In");

    let (status, body) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-in"),
            &token,
            &[("amount_paid", None, b"0")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Already Checked-In"));

    // More than what is owed.
    let (status, _) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-out"),
            &token,
            &[("amount_paid", None, b"20000")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-out"),
            &token,
            &[("amount_paid", None, b"19000")],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let reservation = &body["reservation"];
    assert_eq!(reservation["status"], "Checked-Out");
    assert_eq!(reservation["paid_cents"], 29_000);
    assert_eq!(reservation["dues_cents"], 0);
    assert_eq!(reservation["discount_cents"], 1_000);
    assert_eq!(reservation["proof_of_payment"].as_array().unwrap().len(), 1);

    let (_, customer) = app.get(&customer_uri(&booked.customer), &token).await;
    assert_eq!(customer["status"], "Checked-Out");
}

#[tokio::test]
async fn check_out_requires_check_in() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;

    let (status, body) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-out"),
            &token,
            &[("amount_paid", None, b"0")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not Checked-In"));
}

#[tokio::test]
async fn check_in_without_a_form_is_a_validation_error() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;

    for suffix in ["/check-in", "/check-out"] {
        let (status, body) = app
            .post(
                &reservation_uri(&booked.reservation, suffix),
                &token,
                json!({ "amount_paid": 100 }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert!(body["message"].as_str().unwrap().contains("multipart"));
    }

    let (status, body) = app
        .post(
            &format!("/admin/rooms/{}/images", booked.room["id"].as_str().unwrap()),
            &token,
            json!({ "images": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn receptionist_discount_is_capped() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let booked = booked(&app, &admin).await;
    let receptionist = app.receptionist_token(10).await;
    let uri = reservation_uri(&booked.reservation, "/check-in");

    // 5000 of 30000 is about 16%.
    let (status, _) = app
        .multipart(&uri, &receptionist, &[("discount", None, b"5000")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .multipart(&uri, &receptionist, &[("discount", None, b"3000")])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reservation"]["dues_cents"], 27_000);
}

#[tokio::test]
async fn admin_discount_is_not_capped() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let booked = booked(&app, &admin).await;

    let (status, body) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-in"),
            &admin,
            &[("discount", None, b"15000")],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reservation"]["dues_cents"], 15_000);
}

#[tokio::test]
async fn failed_proof_upload_is_a_warning() {
    let app = TestApp::with_upload_limit(8).await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;

    let big = vec![b'x'; 64];
    let (status, body) = app
        .multipart(
            &reservation_uri(&booked.reservation, "/check-in"),
            &token,
            &[
                ("amount_paid", None, b"5000"),
                ("proof_of_payment", Some(("small.png", "image/png")), b"tiny"),
                ("proof_of_payment", Some(("huge.png", "image/png")), &big),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reservation"]["status"], "Checked-In");
    assert_eq!(
        body["reservation"]["proof_of_payment"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("huge.png"));
}

#[tokio::test]
async fn amend_reprices_reserved_bookings_only() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;
    let uri = reservation_uri(&booked.reservation, "");

    let (status, body) = app
        .put(&uri, &token, json!({ "check_out": "2026-03-06" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["nights"], 5);
    assert_eq!(body["total_cents"], 50_000);

    let (status, _) = app
        .multipart(&format!("{uri}/check-in"), &token, &[("amount_paid", None, b"0")])
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .put(&uri, &token, json!({ "check_out": "2026-03-07" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn removing_reservations() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;
    let uri = reservation_uri(&booked.reservation, "");

    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, customer) = app.get(&customer_uri(&booked.customer), &token).await;
    assert!(customer["status"].is_null());

    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A guest in the house cannot be removed.
    let (_, second) = app
        .book(
            &token,
            &booked.customer["id"],
            &booked.room["id"],
            "2026-05-01",
            "2026-05-02",
        )
        .await;
    let second_uri = reservation_uri(&second, "");
    app.multipart(
        &format!("{second_uri}/check-in"),
        &token,
        &[("amount_paid", None, b"0")],
    )
    .await;
    let (status, _) = app.delete(&second_uri, &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let booked = booked(&app, &token).await;
    app.book(
        &token,
        &booked.customer["id"],
        &booked.room["id"],
        "2026-06-01",
        "2026-06-03",
    )
    .await;
    app.multipart(
        &reservation_uri(&booked.reservation, "/check-in"),
        &token,
        &[("amount_paid", None, b"0")],
    )
    .await;

    let (status, body) = app.get("/admin/reservations", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 2);
    // Latest stays first.
    assert_eq!(body["data"][0]["check_in"], "2026-06-01");

    let (_, body) = app
        .get("/admin/reservations?status=Checked-In", &token)
        .await;
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["data"][0]["id"], booked.reservation["id"]);

    let (status, _) = app
        .get("/admin/reservations?status=Vacationing", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
