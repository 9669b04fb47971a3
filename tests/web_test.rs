// Integration tests for the HTTP surface

use serde_json::{json, Value};
use switcher_core::settings::Settings;
use switcher_core::web::{router, AppState};
use tempfile::TempDir;

const SNAPSHOT: &str = r#"
domain "d1" owner="owner-1" {
    group "g1" name="Release 1" {
        config "c1" key="FEATURE_X" {
            strategy "s1" type="VALUE" operation="EXIST" {
                values {
                    - "premium"
                }
            }
        }
    }
}
"#;

async fn spawn_app() -> (String, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("acme.kdl"), SNAPSHOT).unwrap();

    let mut settings = Settings::default();
    settings.data.snapshot_dir = dir.path().to_path_buf();
    let state = AppState::build(settings).expect("Failed to build app state");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    (format!("http://{addr}"), dir)
}

#[tokio::test]
async fn test_criteria_endpoint() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let res: Value = client
        .post(format!("{base}/v1/criteria/FEATURE_X"))
        .json(&json!({
            "domain": "d1",
            "entries": [{ "strategy": "VALUE_VALIDATION", "input": "premium" }],
            "show_strategies": true
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(res["result"], json!(true));
    assert_eq!(res["reason"], json!("Success"));
    assert_eq!(res["strategies"][0]["strategy"], json!("VALUE"));

    let missing = client
        .post(format!("{base}/v1/criteria/NOPE"))
        .json(&json!({ "domain": "d1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verify_endpoint() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();
    let elements = json!([{ "id": "g1", "name": "Release 1" }]);

    let owner: Value = client
        .post(format!("{base}/v1/verify"))
        .json(&json!({
            "actor": "owner-1",
            "domain": "d1",
            "actions": ["READ"],
            "router": "GROUP",
            "elements": elements
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(owner["elements"], elements);

    let stranger = client
        .post(format!("{base}/v1/verify"))
        .json(&json!({
            "actor": "nobody",
            "domain": "d1",
            "actions": ["READ"],
            "router": "GROUP",
            "elements": elements
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(stranger.status(), reqwest::StatusCode::FORBIDDEN);

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(health.status().is_success());
}
