use std::fs::File;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use viajes::{
    auth,
    config::AppConfig,
    db::{init_pool, run_migrations},
    models::user::UserRole,
    routes::create_router,
    state::AppState,
};

struct TestApp {
    router: Router,
    state: AppState,
    _root: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let db_path = root.path().join("api.sqlite");
        File::create(&db_path).expect("db file");
        let config = AppConfig {
            database_url: format!("sqlite://{}", db_path.to_string_lossy()),
            max_page_size: 5,
            ..AppConfig::default()
        };
        let db = init_pool(&config.database_url).await.expect("pool");
        run_migrations(&db).await.expect("migrations");
        let state = AppState::new(config, db);
        Self {
            router: create_router(state.clone()),
            state,
            _root: root,
        }
    }

    async fn token_for(&self, email: &str, role: UserRole) -> String {
        let user = auth::register_user(&self.state, email, "secreto123", role)
            .await
            .expect("register");
        auth::create_session(&self.state, &user.id)
            .await
            .expect("session")
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn trip_body(origin: &str, destination: &str) -> Value {
    json!({
        "truck": "ABC123",
        "driver": "Juan Pérez",
        "origin": origin,
        "destination": destination,
        "fuelType": "Diésel",
        "liters": 15000,
        "departureTime": (Utc::now() + Duration::hours(1)).to_rfc3339(),
        "status": "Cancelled",
    })
}

#[tokio::test]
async fn trip_routes_require_a_bearer_token() {
    let app = TestApp::new().await;
    let (status, _) = app.send("GET", "/api/trips", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/api/trips/stats", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let app = TestApp::new().await;
    auth::register_user(&app.state, "Ops@Example.com", "secreto123", UserRole::User)
        .await
        .expect("register");

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ops@example.com", "password": "wrong-one" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ops@example.com", "password": "secreto123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().expect("token").to_string();

    let (status, _) = app.send("GET", "/api/trips", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn only_admins_register_admins() {
    let app = TestApp::new().await;
    let user_token = app.token_for("user@example.com", UserRole::User).await;
    let admin_token = app.token_for("admin@example.com", UserRole::Admin).await;
    let body = json!({ "email": "boss@example.com", "password": "secreto123", "role": "admin" });

    let (status, _) = app
        .send("POST", "/api/auth/register", Some(&user_token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .send("POST", "/api/auth/register", Some(&admin_token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user"]["role"], "admin");
}

#[tokio::test]
async fn create_update_cancel_round() {
    let app = TestApp::new().await;
    let token = app.token_for("ops@example.com", UserRole::User).await;

    let (status, created) = app
        .send("POST", "/api/trips", Some(&token), Some(trip_body("Planta X", "Estación Y")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "InTransit");
    assert_eq!(created["fuelType"], "Diesel");
    let id = created["id"].as_str().expect("id").to_string();

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/api/trips/{id}"),
            Some(&token),
            Some(json!({ "status": "Finalizado", "expectedVersion": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Completed");
    assert_eq!(updated["version"], 2);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/trips/{id}"),
            Some(&token),
            Some(json!({ "liters": 100, "expectedVersion": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, cancelled) = app
        .send("DELETE", &format!("/api/trips/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["trip"]["status"], "Cancelled");

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/trips/{id}"),
            Some(&token),
            Some(json!({ "liters": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send("GET", "/api/trips/does-not-exist", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_payload_lists_every_field() {
    let app = TestApp::new().await;
    let token = app.token_for("ops@example.com", UserRole::User).await;

    let mut body = trip_body("A", "A");
    body["liters"] = json!(40_000);
    let (status, response) = app.send("POST", "/api/trips", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<_> = response["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .map(|err| err["field"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(fields, vec!["destination", "liters"]);

    let (_, all) = app.send("GET", "/api/trips/all", Some(&token), None).await;
    assert_eq!(all.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn listing_caps_limit_and_rejects_unknown_filters() {
    let app = TestApp::new().await;
    let token = app.token_for("ops@example.com", UserRole::User).await;
    for _ in 0..7 {
        let (status, _) = app
            .send("POST", "/api/trips", Some(&token), Some(trip_body("Planta X", "Estación Y")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app
        .send("GET", "/api/trips?page=1&limit=50&driver=", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["limit"], 5);
    assert_eq!(page["total"], 7);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["records"].as_array().map(Vec::len), Some(5));

    let (status, page) = app
        .send("GET", "/api/trips?page=abc&fuelType=GNC", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["total"], 0);

    let (status, _) = app
        .send("GET", "/api/trips?conductor=juan", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("GET", "/api/trips?fuelType=Kerosene", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "fuelType");

    let (status, stats) = app.send("GET", "/api/trips/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 7);
    assert_eq!(stats["totalLiters"], 105_000);
    assert_eq!(stats["byStatus"]["InTransit"], 7);
    assert_eq!(stats["byFuelType"]["Diesel"], 7);
}

#[tokio::test]
async fn listing_without_filters_uses_defaults() {
    let app = TestApp::new().await;
    let token = app.token_for("ops@example.com", UserRole::User).await;
    let (status, _) = app
        .send("POST", "/api/trips", Some(&token), Some(trip_body("Planta X", "Estación Y")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    for uri in ["/api/trips", "/api/trips?page=1", "/api/trips?status=InTransit"] {
        let (status, page) = app.send("GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {page}");
        assert_eq!(page["page"], 1);
        assert_eq!(page["limit"], 5);
        assert_eq!(page["total"], 1);
    }

    let (status, all) = app.send("GET", "/api/trips/all", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(Vec::len), Some(1));
}
