//! End-to-end API flows against in-memory repositories.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use parking_service::application::notifications::NotificationDispatcher;
use parking_service::application::services::{AuthService, Registration};
use parking_service::domain::RepositoryProvider;
use parking_service::infrastructure::crypto::jwt::{create_token, JwtConfig};
use parking_service::shared::clock::{ManualClock, SharedClock};
use parking_service::{create_api_router, ApiServices, InMemoryRepositoryProvider};

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    admin_token: String,
    user_token: String,
    user_id: String,
}

fn jwt() -> JwtConfig {
    JwtConfig {
        secret: "api-test-secret".into(),
        expiration_hours: 1,
        issuer: "parking-service".into(),
    }
}

async fn app() -> TestApp {
    let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ));
    let shared: SharedClock = clock.clone();

    let auth = AuthService::new(repos.clone(), jwt(), shared.clone()).with_bcrypt_cost(4);
    let admin = auth
        .ensure_default_admin("admin@parking.local", "Admin@123", "System", "Admin")
        .await
        .unwrap()
        .unwrap();
    let user = auth
        .register(Registration {
            first_name: "Jane".into(),
            last_name: "Driver".into(),
            email: "jane@example.com".into(),
            password: "Secret@1".into(),
        })
        .await
        .unwrap();

    let admin_token = create_token(&admin.id, &admin.email, "admin", &jwt()).unwrap();
    let user_token = create_token(&user.id, &user.email, "user", &jwt()).unwrap();

    let services = ApiServices::from_auth(
        repos.clone(),
        shared,
        auth,
        NotificationDispatcher::disabled(repos),
    );

    TestApp {
        router: create_api_router(services, None),
        clock,
        admin_token,
        user_token,
        user_id: user.id,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.admin_token), body).await
    }

    async fn user(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.user_token), body).await
    }

    async fn create_slot(&self, code: &str, spaces: i32, fee: f64) -> String {
        let (status, body) = self
            .admin(
                Method::POST,
                "/api/v1/parking-slots",
                Some(json!({
                    "code": code,
                    "name": format!("Slot {}", code),
                    "location": "North Wing",
                    "totalSpaces": spaces,
                    "chargingFee": fee,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app().await;
    let (status, body) = app
        .send(Method::GET, "/api/v1/parking-slots", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "firstName": "Sam",
                "lastName": "Rider",
                "email": "sam@example.com",
                "password": "Passw0rd!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "firstName": "Sam",
                "lastName": "Again",
                "email": "sam@example.com",
                "password": "Passw0rd!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "sam@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "sam@example.com", "password": "Passw0rd!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tokenType"], "Bearer");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::GET, "/api/v1/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "sam@example.com");
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn slot_administration_is_admin_only() {
    let app = app().await;

    let (status, _) = app
        .user(
            Method::POST,
            "/api/v1/parking-slots",
            Some(json!({
                "code": "A1",
                "name": "Slot A1",
                "location": "North Wing",
                "totalSpaces": 2,
                "chargingFee": 5.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = app.create_slot("A1", 2, 5.0).await;

    let (status, body) = app.user(Method::GET, "/api/v1/parking-slots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .admin(
            Method::PUT,
            &format!("/api/v1/parking-slots/{}", id),
            Some(json!({ "totalSpaces": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalSpaces"], 4);
    assert_eq!(body["data"]["availableSpaces"], 4);

    let (status, _) = app
        .admin(
            Method::POST,
            "/api/v1/parking-slots",
            Some(json!({
                "code": "A1",
                "name": "Duplicate",
                "location": "South",
                "totalSpaces": 1,
                "chargingFee": 1.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .admin(Method::DELETE, &format!("/api/v1/parking-slots/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .user(Method::GET, &format!("/api/v1/parking-slots/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entry_exit_bills_elapsed_time() {
    let app = app().await;
    app.create_slot("B1", 1, 3.0).await;
    let gate = json!({ "plateNumber": "ab-123", "parkingCode": "B1" });

    let (status, body) = app
        .user(Method::POST, "/api/v1/parking-slots/entry", Some(gate.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["userId"], app.user_id.as_str());

    let (status, body) = app
        .user(Method::GET, "/api/v1/parking-slots/active", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Single space taken
    let (status, _) = app
        .user(
            Method::POST,
            "/api/v1/parking-slots/entry",
            Some(json!({ "plateNumber": "ZZ-999", "parkingCode": "B1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.clock.advance(Duration::minutes(90));

    let (status, body) = app
        .user(Method::POST, "/api/v1/parking-slots/exit", Some(gate.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["duration"], 1.5);
    assert_eq!(body["data"]["chargedAmount"], 4.5);
    assert_eq!(body["data"]["parkingRequest"]["status"], "APPROVED");

    let (status, _) = app
        .user(Method::POST, "/api/v1/parking-slots/exit", Some(gate))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.user(Method::GET, "/api/v1/parking-slots", None).await;
    assert_eq!(body["data"][0]["availableSpaces"], 1);
}

#[tokio::test]
async fn report_sums_charges_in_range() {
    let app = app().await;
    app.create_slot("C1", 2, 2.0).await;
    let gate = json!({ "plateNumber": "RPT-1", "parkingCode": "C1" });

    app.user(Method::POST, "/api/v1/parking-slots/entry", Some(gate.clone()))
        .await;
    app.clock.advance(Duration::hours(2));
    app.user(Method::POST, "/api/v1/parking-slots/exit", Some(gate))
        .await;

    let range = json!({ "startDate": "2025-03-01", "endDate": "2025-03-01" });
    let (status, _) = app
        .user(Method::POST, "/api/v1/parking-slots/report", Some(range.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .admin(Method::POST, "/api/v1/parking-slots/report", Some(range))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["totalCharged"], 4.0);
    assert_eq!(body["data"]["completedParkings"], 1);
    assert_eq!(body["data"]["activeParkings"], 0);

    let (status, _) = app
        .admin(
            Method::POST,
            "/api/v1/parking-slots/report",
            Some(json!({ "startDate": "2025-03-02", "endDate": "2025-03-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_approval_flow() {
    let app = app().await;
    app.create_slot("D1", 1, 1.0).await;

    let (status, body) = app
        .user(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({ "plateNumber": "REQ-1", "color": "blue" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let vehicle_id = body["data"]["id"].as_str().unwrap().to_string();

    let check_in = app.clock_now() + Duration::hours(1);
    let (status, body) = app
        .user(
            Method::POST,
            "/api/v1/parking-requests",
            Some(json!({ "vehicleId": vehicle_id, "checkIn": check_in })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "PENDING");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .user(
            Method::PUT,
            &format!("/api/v1/parking-requests/approve/{}", request_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .admin(
            Method::PUT,
            &format!("/api/v1/parking-requests/approve/{}", request_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["slotNumber"], "D1");
    assert_eq!(body["data"]["request"]["status"], "APPROVED");

    // Already decided
    let (status, _) = app
        .admin(
            Method::PUT,
            &format!("/api/v1/parking-requests/reject/{}", request_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .user(Method::GET, "/api/v1/parking-requests/mine", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .admin(Method::GET, "/api/v1/parking-requests?status=APPROVED", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn vehicles_are_private_to_their_owner() {
    let app = app().await;

    let (_, body) = app
        .admin(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({ "plateNumber": "ADM-1", "color": "black" })),
        )
        .await;
    let admin_vehicle = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .user(Method::GET, &format!("/api/v1/vehicles/{}", admin_vehicle), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .user(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({ "plateNumber": "USR-1", "color": "red" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let own = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .user(
            Method::PUT,
            &format!("/api/v1/vehicles/{}", own),
            Some(json!({ "color": "green" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["color"], "green");

    let (_, body) = app.user(Method::GET, "/api/v1/vehicles", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = app.admin(Method::GET, "/api/v1/vehicles", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .user(Method::DELETE, &format!("/api/v1/vehicles/{}", own), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let app = app().await;

    let (status, _) = app
        .admin(
            Method::POST,
            "/api/v1/parking-slots",
            Some(json!({
                "code": "E1",
                "name": "Slot E1",
                "location": "East",
                "totalSpaces": 0,
                "chargingFee": 1.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .admin(
            Method::POST,
            "/api/v1/parking-slots",
            Some(json!({ "code": "E1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn user_administration_and_own_account() {
    let app = app().await;

    let (status, _) = app.user(Method::GET, "/api/v1/users", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.admin(Method::GET, "/api/v1/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .admin(Method::GET, "/api/v1/users/search/jan", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["email"], "jane@example.com");

    let (status, body) = app
        .user(
            Method::PUT,
            "/api/v1/users/me",
            Some(json!({ "lastName": "Rider", "email": "Jane.Rider@Example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["firstName"], "Jane");
    assert_eq!(body["data"]["email"], "jane.rider@example.com");

    let (status, _) = app
        .user(
            Method::PUT,
            "/api/v1/users/me",
            Some(json!({ "email": "admin@parking.local" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .user(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(json!({ "currentPassword": "nope", "newPassword": "Newer@22" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .user(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(json!({ "currentPassword": "Secret@1", "newPassword": "Newer@22" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "jane.rider@example.com", "password": "Newer@22" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // parked at the gate: the account cannot go yet
    app.create_slot("U1", 1, 1.0).await;
    let gate = json!({ "plateNumber": "RAD 100A", "parkingCode": "U1" });
    let (status, _) = app
        .user(Method::POST, "/api/v1/parking-slots/entry", Some(gate.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.user(Method::DELETE, "/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .admin(Method::DELETE, &format!("/api/v1/users/{}", app.user_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .user(Method::POST, "/api/v1/parking-slots/exit", Some(gate))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.user(Method::DELETE, "/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.user(Method::GET, "/api/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .admin(Method::DELETE, &format!("/api/v1/users/{}", app.user_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.admin(Method::GET, "/api/v1/users", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

impl TestApp {
    fn clock_now(&self) -> chrono::DateTime<Utc> {
        use parking_service::shared::clock::Clock;
        self.clock.now()
    }
}
