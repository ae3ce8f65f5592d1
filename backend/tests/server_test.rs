use std::fs;
use std::path::Path;
use std::sync::Arc;

use dataprep::server::{serve, AppState};
use dataprep::AppConfig;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write(root: &Path, rel: &str, value: Value) {
    let file = root.join(rel);
    fs::create_dir_all(file.parent().expect("parent")).expect("mkdir");
    fs::write(file, serde_json::to_string_pretty(&value).expect("json")).expect("write");
}

/// Catalog with an API preset, a CSV file preset and a preset without source.
fn catalog(api_url: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    write(root, "sources/users.json", json!({
        "id": 1, "name": "Users API", "source_type": "api",
        "config": {"url": api_url, "root_key": "users"}
    }));
    write(root, "sources/signups.json", json!({
        "id": 2, "name": "Signups CSV", "source_type": "file",
        "config": {"path": "data/signups.csv"}
    }));
    fs::create_dir_all(root.join("data")).expect("mkdir");
    fs::write(
        root.join("data/signups.csv"),
        "email;status\na@x.io;active\nb@x.io;inactive\na@x.io;active\n",
    )
    .expect("write csv");

    write(root, "presets/active-users.json", json!({
        "id": 1, "name": "Active users", "source_id": 1,
        "steps": [
            {"step_type": "filter_rows", "config": {"column": "status", "condition": "==", "value": "active"}, "order": 0},
            {"step_type": "drop_columns", "config": {"columns": ["status"]}, "order": 1}
        ]
    }));
    write(root, "presets/signups.json", json!({
        "id": 2, "name": "Signups", "source_id": 2,
        "steps": [
            {"step_type": "remove_duplicates", "config": {"subset": ["email"]}, "order": 0}
        ]
    }));
    write(root, "presets/broken.json", json!({
        "id": 3, "name": "Broken", "source_id": 1,
        "steps": [{"step_type": "explode_column", "config": {}, "order": 0}]
    }));
    write(root, "presets/detached.json", json!({"id": 4, "name": "Detached"}));
    dir
}

async fn spawn(catalog_dir: &Path) -> String {
    let config = AppConfig::default().with_catalog_dir(Some(catalog_dir.to_path_buf()));
    let state = AppState::from_config(&config).expect("state");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(serve(listener, Arc::new(state)));
    format!("http://{}", addr)
}

async fn users_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                {"name": "Ada", "status": "active", "address": {"city": "London"}},
                {"name": "Bob", "status": "inactive", "address": {"city": "Paris"}}
            ]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_health() {
    let dir = catalog("http://unused");
    let base = spawn(dir.path()).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_run_api_preset() {
    let api = users_api().await;
    let dir = catalog(&format!("{}/users", api.uri()));
    let base = spawn(dir.path()).await;

    let response = reqwest::get(format!("{}/presets/active-users/run", base))
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body, json!([{"name": "Ada", "address__city": "London"}]));
}

#[tokio::test]
async fn test_run_file_preset_with_post() {
    let dir = catalog("http://unused");
    let base = spawn(dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/presets/signups/run", base))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.expect("json");
    assert_eq!(
        body,
        json!([
            {"email": "a@x.io", "status": "active"},
            {"email": "b@x.io", "status": "inactive"}
        ])
    );
}

#[tokio::test]
async fn test_unknown_slug_is_404() {
    let dir = catalog("http://unused");
    let base = spawn(dir.path()).await;

    let response = reqwest::get(format!("{}/presets/nope/run", base))
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json");
    assert!(body["error"].as_str().expect("error").contains("nope"));
}

#[tokio::test]
async fn test_failed_run_is_400_with_error() {
    let api = users_api().await;
    let dir = catalog(&format!("{}/users", api.uri()));
    let base = spawn(dir.path()).await;

    for slug in ["broken", "detached"] {
        let response = reqwest::get(format!("{}/presets/{}/run", base, slug))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "{}", slug);
        let body: Value = response.json().await.expect("json");
        assert!(body["error"].is_string(), "{}", slug);
    }
}

#[tokio::test]
async fn test_list_presets() {
    let dir = catalog("http://unused");
    let base = spawn(dir.path()).await;

    let body: Value = reqwest::get(format!("{}/api/presets", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(body["count"], 4);
    let slugs: Vec<&str> = body["presets"]
        .as_array()
        .expect("presets")
        .iter()
        .map(|p| p["slug"].as_str().expect("slug"))
        .collect();
    assert_eq!(slugs, vec!["active-users", "broken", "detached", "signups"]);
    assert_eq!(body["presets"][3]["source"], "Signups CSV");
}
