use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use santa_core::{
    ParticipantSeed, RandomSource, SantaService, SqliteStore, Store, Token,
};
use santa_server::{build_router, state::AppState};
use serde_json::Value;
use tower::ServiceExt;

const BASE_URL: &str = "https://santa.example";

/// Every shuffle is the identity; no draw can succeed.
struct Identity;

impl RandomSource for Identity {
    fn pick_at_most(&mut self, upper: usize) -> usize {
        upper
    }
}

fn roster(names: &[&str]) -> Vec<ParticipantSeed> {
    names.iter().map(|name| ParticipantSeed::new(*name)).collect()
}

fn service(names: &[&str]) -> Arc<SantaService<dyn Store>> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
    Arc::new(SantaService::new(store, roster(names)))
}

fn app(service: Arc<SantaService<dyn Store>>) -> Router {
    build_router(AppState::new(service, BASE_URL, Duration::from_secs(5)))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn health_reports_reachable_store() {
    let app = app(service(&["Alice", "Bob"]));
    let (status, _, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["backend"], "sqlite");
    assert_eq!(json["reachable"], true);
}

#[tokio::test]
async fn reveal_returns_receiver_without_tokens() {
    let service = service(&["Alice", "Bob", "Carol"]);
    let alice = service.ensure_token("Alice").unwrap();
    let app = app(Arc::clone(&service));

    let (status, _, body) = send(&app, "GET", &format!("/reveal/{alice}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains(alice.as_str()));

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["giver"]["name"], "Alice");
    let receiver = json["receiver"]["name"].as_str().unwrap().to_string();
    assert_ne!(receiver, "Alice");

    let (_, _, again) = send(&app, "GET", &format!("/reveal/{alice}")).await;
    assert_eq!(again, body);
    assert_eq!(service.assignments().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let app = app(service(&["Alice", "Bob"]));

    let (status, _, body) = send(&app, "GET", &format!("/reveal/{}", Token::generate())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert!(json["error"].is_string());

    let (status, _, _) = send(&app, "GET", "/reveal/garbage").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_of_one_is_a_server_error() {
    let service = service(&["Solo"]);
    let solo = service.ensure_token("Solo").unwrap();
    let app = app(service);

    let (status, _, _) = send(&app, "GET", &format!("/reveal/{solo}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn exhausted_draw_is_server_error() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let service: Arc<SantaService<dyn Store>> = Arc::new(SantaService::with_source(
        store,
        roster(&["Alice", "Bob", "Carol"]),
        Box::new(Identity),
    ));
    let alice = service.ensure_token("Alice").unwrap();
    let app = app(Arc::clone(&service));

    let (status, _, _) = send(&app, "GET", &format!("/reveal/{alice}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(service.assignments().unwrap().is_empty());
}

#[tokio::test]
async fn exports_are_csv() {
    let service = service(&["Alice", "Bob", "Carol"]);
    let bob = service.ensure_token("Bob").unwrap();
    let app = app(Arc::clone(&service));

    let (status, content_type, links) = send(&app, "GET", "/admin/links.csv").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/csv"));
    assert_eq!(links.lines().next(), Some("name,link"));
    assert!(links
        .lines()
        .any(|line| line == format!("Bob,{BASE_URL}/reveal/{bob}")));

    send(&app, "GET", &format!("/reveal/{bob}")).await;
    let (status, _, table) = send(&app, "GET", "/admin/assignments.csv").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        table.lines().next(),
        Some("giver,giver_birthday,giver_anniversary,receiver,receiver_birthday,receiver_anniversary,link")
    );
    assert_eq!(table.lines().count(), 4);
}

#[tokio::test]
async fn reset_clears_assignments_and_keeps_links() {
    let service = service(&["Alice", "Bob", "Carol"]);
    let carol = service.ensure_token("Carol").unwrap();
    let app = app(Arc::clone(&service));

    send(&app, "GET", &format!("/reveal/{carol}")).await;
    assert_eq!(service.assignments().unwrap().len(), 3);

    let (status, _, body) = send(&app, "POST", "/admin/reset").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert!(service.assignments().unwrap().is_empty());
    assert_eq!(service.ensure_token("Carol").unwrap(), carol);

    let (status, _, _) = send(&app, "GET", &format!("/reveal/{carol}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn concurrent_reveals_agree_on_one_draw() {
    let names = ["Alice", "Bob", "Carol", "Dave", "Erin", "Frank"];
    let service = service(&names);
    let tokens: Vec<Token> = names
        .iter()
        .map(|name| service.ensure_token(name).unwrap())
        .collect();
    let app = app(Arc::clone(&service));

    let requests = tokens.iter().map(|token| {
        let app = app.clone();
        let uri = format!("/reveal/{token}");
        tokio::spawn(async move { send(&app, "GET", &uri).await })
    });
    let mut receivers = Vec::new();
    for request in requests.collect::<Vec<_>>() {
        let (status, _, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        receivers.push((
            json["giver"]["name"].as_str().unwrap().to_string(),
            json["receiver"]["name"].as_str().unwrap().to_string(),
        ));
    }
    receivers.sort();

    let mut stored: Vec<(String, String)> = service
        .assignments()
        .unwrap()
        .into_iter()
        .map(|a| (a.giver_name, a.receiver_name))
        .collect();
    stored.sort();
    assert_eq!(receivers, stored);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app(service(&["Alice", "Bob"]));
    let (status, _, _) = send(&app, "GET", "/admin/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
