use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_cell::{IdentityResolver, StaticProfileDirectory};
use practice_cell::{practice_routes, BackendFactory, PracticeState};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser, TEST_JWT_SECRET};

fn create_test_app(user: &TestUser) -> Router {
    let config = TestConfig::offline().to_arc();
    let directory = Arc::new(StaticProfileDirectory::new(vec![user.to_profile("Dr. Test")]));
    let factory = Arc::new(BackendFactory::from_config(config.clone()));
    let state = PracticeState::new(config, factory, IdentityResolver::new(directory));
    practice_routes(Arc::new(state))
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_workspace_requires_authentication() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let app = create_test_app(&user);

    let response = app
        .oneshot(Request::builder().uri("/workspace").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_workspace_loads_demo_data_without_backend() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let response = app.oneshot(request("GET", "/workspace", &token, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["effective_user"], user.id.as_str());
    assert_eq!(body["view"], "dashboard");
    assert_eq!(body["loading"], false);
    assert_eq!(body["patients"].as_array().unwrap().len(), 3);
    assert_eq!(body["appointments"][0]["time"], "10:00");
    assert_eq!(body["appointments"][1]["time"], "14:00");
}

#[tokio::test]
async fn test_past_appointment_is_a_validation_error() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let yesterday = Local::now().date_naive() - Duration::days(1);
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/appointments",
            &token,
            Some(json!({
                "patient_id": "pat_any",
                "date": yesterday,
                "time": "10:00",
                "duration_minutes": 50,
                "appointment_type": "ONLINE"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Appointments cannot be scheduled in the past"
    );

    let workspace = body_json(app.oneshot(request("GET", "/workspace", &token, None)).await.unwrap()).await;
    assert_eq!(workspace["appointments"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_created_patient_is_searchable() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/patients",
            &token,
            Some(json!({ "name": "Ana Lima", "email": "ana@example.com", "phone": "+55 11 91234 5678" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total_patients"], 4);

    let response = app
        .oneshot(request("GET", "/patients?q=ANA", &token, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["patients"][0]["name"], "Ana Lima");
}

#[tokio::test]
async fn test_status_update_shows_on_dashboard() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let workspace = body_json(app.clone().oneshot(request("GET", "/workspace", &token, None)).await.unwrap()).await;
    let id = workspace["appointments"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/appointments/{}", id),
            &token,
            Some(json!({ "status": "CONFIRMED", "notes": "Asked to bring journal." })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["appointment"]["status"], "CONFIRMED");

    let dashboard = body_json(app.oneshot(request("GET", "/dashboard", &token, None)).await.unwrap()).await;
    assert_eq!(dashboard["todays_count"], 2);
    assert_eq!(dashboard["todays_appointments"][0]["status"], "CONFIRMED");
    assert!(dashboard["next_session"].is_null());
}

#[tokio::test]
async fn test_unknown_appointment_update_is_rejected() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let response = app
        .oneshot(request(
            "PATCH",
            "/appointments/apt_missing",
            &token,
            Some(json!({ "status": "CANCELLED" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_navigation_selects_rendered_projection() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let response = app
        .clone()
        .oneshot(request("PUT", "/view", &token, Some(json!({ "view": "calendar" }))))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["previous"], "dashboard");

    let view = body_json(app.oneshot(request("GET", "/view", &token, None)).await.unwrap()).await;
    assert_eq!(view["view"], "calendar");
    assert!(view["days"].as_array().unwrap().len() >= 28);
}

#[tokio::test]
async fn test_psychologist_cannot_impersonate() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let response = app
        .oneshot(request(
            "POST",
            "/impersonation",
            &token,
            Some(json!({ "user_id": "someone-else" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_impersonation_switches_effective_user() {
    let user = TestUser::admin("root@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/impersonation",
            &token,
            Some(json!({ "user_id": "psy_1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stale"], false);
    assert_eq!(body["workspace"]["effective_user"], "psy_1");

    let response = app
        .oneshot(request("DELETE", "/impersonation", &token, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["workspace"]["effective_user"], user.id.as_str());
}

#[tokio::test]
async fn test_whatsapp_link_prefills_reminder() {
    let user = TestUser::psychologist("alice@companionpsi.com");
    let token = JwtTestUtils::create_test_token(&user, TEST_JWT_SECRET, Some(1));
    let app = create_test_app(&user);

    let workspace = body_json(app.clone().oneshot(request("GET", "/workspace", &token, None)).await.unwrap()).await;
    let id = workspace["appointments"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/appointments/{}/whatsapp-link", id), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://wa.me/15550101?text=Ol%C3%A1%20John%20Doe"));
    assert!(body["text"].as_str().unwrap().contains("às 10:00"));

    let missing = app
        .oneshot(request("GET", "/appointments/apt_missing/whatsapp-link", &token, None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}
