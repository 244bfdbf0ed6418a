//! End-to-end API tests over the in-process router
//!
//! Drives the full stack (auth middleware, handlers, orchestrator, state
//! machine, store) against an in-memory database, the way a client would.

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use market_server::core::{Config, ServerState};
use market_server::db::DbService;
use market_server::{JwtService, Role, api};

struct TestApp {
    app: Router,
    jwt: JwtService,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = Config::with_overrides("/tmp/market-test", 0);
        config.jwt.secret = "api-flow-test-secret-key-of-enough-length".to_string();

        let db = DbService::open_in_memory().await.unwrap();

        // Seed the catalog mirror (the external catalog service's job in prod)
        sqlx::query(
            "INSERT INTO products (id, partner_id, name, price_cents, is_available) VALUES \
             ('espresso', 'partner-1', 'Espresso', 250, 1), \
             ('bagel', 'partner-2', 'Bagel', 400, 1), \
             ('soldout', 'partner-2', 'Sold Out', 100, 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let state = ServerState::with_db(&config, db);
        let jwt = JwtService::with_config(config.jwt.clone());
        let app = api::build_app(&state).with_state(state);

        Self { app, jwt }
    }

    fn token(&self, user_id: &str, role: Role) -> String {
        self.jwt.generate_token(user_id, user_id, role).unwrap()
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn cart_line(product: &str, partner: &str, quantity: i64, price: i64) -> Value {
    json!({
        "product_id": product,
        "partner_id": partner,
        "quantity": quantity,
        "unit_price_cents": price,
    })
}

#[tokio::test]
async fn checkout_then_full_lifecycle() {
    let app = TestApp::new().await;
    let customer = app.token("customer-1", Role::Customer);
    let partner = app.token("partner-1", Role::Partner);

    // Two-partner cart; the client's espresso price is stale on purpose
    let (status, report) = app
        .request(
            "POST",
            "/api/checkout",
            Some(customer.as_str()),
            Some(json!({ "lines": [
                cart_line("espresso", "partner-1", 2, 199),
                cart_line("bagel", "partner-2", 1, 400),
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);

    let p1 = outcomes
        .iter()
        .find(|o| o["partner_id"] == "partner-1")
        .unwrap();
    let order = &p1["order"];
    assert_eq!(order["status"], "in_queue");
    // server-side price, not the stale client one
    assert_eq!(order["total_amount_cents"], 500);
    let token = order["redemption_token"].as_str().unwrap();
    assert!(!token.is_empty());
    let order_id = order["id"].as_str().unwrap().to_string();

    // Partner walks the order through the machine
    for (action, expected) in [
        ("accept", "in_process"),
        ("ready", "ready"),
        ("complete", "completed"),
    ] {
        let (status, body) = app
            .request(
                "POST",
                &format!("/api/orders/{order_id}/{action}"),
                Some(partner.as_str()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{action} failed: {body}");
        assert_eq!(body["status"], expected);
        // token immutable across transitions
        assert_eq!(body["redemption_token"], token);
    }

    // Completed orders may be deleted, and deletion is permanent
    let (status, body) = app
        .request(
            "DELETE",
            &format!("/api/orders/{order_id}"),
            Some(partner.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = app
        .request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some(partner.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partial_checkout_reports_per_group() {
    let app = TestApp::new().await;
    let customer = app.token("customer-1", Role::Customer);

    let (status, report) = app
        .request(
            "POST",
            "/api/checkout",
            Some(customer.as_str()),
            Some(json!({ "lines": [
                cart_line("espresso", "partner-1", 1, 250),
                cart_line("soldout", "partner-2", 1, 100),
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let outcomes = report["outcomes"].as_array().unwrap();
    let p1 = outcomes
        .iter()
        .find(|o| o["partner_id"] == "partner-1")
        .unwrap();
    assert!(p1.get("order").is_some());

    let p2 = outcomes
        .iter()
        .find(|o| o["partner_id"] == "partner-2")
        .unwrap();
    assert_eq!(p2["failure"]["code"], "product_unavailable");
    assert_eq!(p2["failure"]["product_id"], "soldout");
}

#[tokio::test]
async fn invalid_transition_is_rejected_and_state_kept() {
    let app = TestApp::new().await;
    let customer = app.token("customer-1", Role::Customer);
    let partner = app.token("partner-1", Role::Partner);

    let (_, report) = app
        .request(
            "POST",
            "/api/checkout",
            Some(customer.as_str()),
            Some(json!({ "lines": [cart_line("espresso", "partner-1", 1, 250)] })),
        )
        .await;
    let order_id = report["outcomes"][0]["order"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // complete straight from in_queue
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/orders/{order_id}/complete"),
            Some(partner.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = app
        .request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some(partner.as_str()),
            None,
        )
        .await;
    assert_eq!(body["status"], "in_queue");

    // delete before completion is rejected too
    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/orders/{order_id}"),
            Some(partner.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn ownership_is_enforced() {
    let app = TestApp::new().await;
    let customer = app.token("customer-1", Role::Customer);
    let other_customer = app.token("customer-2", Role::Customer);
    let other_partner = app.token("partner-2", Role::Partner);

    let (_, report) = app
        .request(
            "POST",
            "/api/checkout",
            Some(customer.as_str()),
            Some(json!({ "lines": [cart_line("espresso", "partner-1", 1, 250)] })),
        )
        .await;
    let order_id = report["outcomes"][0]["order"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // A different partner cannot transition someone else's order
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/orders/{order_id}/accept"),
            Some(other_partner.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A different customer cannot even read it
    let (status, _) = app
        .request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some(other_customer.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owning customer can
    let (status, _) = app
        .request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some(customer.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn authentication_is_required() {
    let app = TestApp::new().await;

    let (status, _) = app.request("GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request("GET", "/api/orders", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // health stays public
    let (status, body) = app.request("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn partners_cannot_check_out() {
    let app = TestApp::new().await;
    let partner = app.token("partner-1", Role::Partner);

    let (status, _) = app
        .request(
            "POST",
            "/api/checkout",
            Some(partner.as_str()),
            Some(json!({ "lines": [cart_line("espresso", "partner-1", 1, 250)] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn zero_quantity_cart_line_fails_validation() {
    let app = TestApp::new().await;
    let customer = app.token("customer-1", Role::Customer);

    let (status, _) = app
        .request(
            "POST",
            "/api/checkout",
            Some(customer.as_str()),
            Some(json!({ "lines": [cart_line("espresso", "partner-1", 0, 250)] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_order_listing_is_scoped() {
    let app = TestApp::new().await;
    let alice = app.token("customer-1", Role::Customer);
    let bob = app.token("customer-2", Role::Customer);

    app.request(
        "POST",
        "/api/checkout",
        Some(alice.as_str()),
        Some(json!({ "lines": [cart_line("espresso", "partner-1", 1, 250)] })),
    )
    .await;

    let (status, body) = app.request("GET", "/api/orders", Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.request("GET", "/api/orders", Some(bob.as_str()), None).await;
    assert!(body.as_array().unwrap().is_empty());
}
