//! Gateway integration tests
//!
//! The non-ignored tests exercise the route table and state construction
//! without any network. The ignored tests need a running gateway fronting a
//! live remote instance:
//!
//! `LORABRIDGE_REMOTE_URL=http://nas:8188 cargo test --test gateway_tests -- --ignored --nocapture`

use lorabridge::api::server::build_state;
use lorabridge::remote::Disposition;
use lorabridge::remote::LocalAction;
use lorabridge::AppConfig;
use lorabridge::BridgeEvent;
use lorabridge::RouteTable;

const GATEWAY_URL: &str = "http://127.0.0.1:9188";

#[test]
fn default_table_matches_deployment_routes() {
    let table = RouteTable::lora_manager_defaults();

    // Event-broadcasting routes stay local
    for (path, action) in [
        (
            "/api/lm/loras/get_trigger_words",
            LocalAction::GetTriggerWords,
        ),
        ("/api/lm/update-lora-code", LocalAction::UpdateLoraCode),
        ("/api/lm/update-node-widget", LocalAction::UpdateNodeWidget),
        ("/api/lm/register-nodes", LocalAction::RegisterNodes),
    ] {
        assert_eq!(
            table.route(path).unwrap().disposition,
            Disposition::LocalHandle(action),
            "{path}"
        );
    }

    // The rest of the manager surface forwards
    for path in [
        "/api/lm/loras/list",
        "/api/lm/checkpoints/list",
        "/loras_static/widget.js",
        "/example_images_static/x.png",
        "/loras",
        "/loras/recipes",
        "/statistics",
    ] {
        assert_eq!(
            table.route(path).unwrap().disposition,
            Disposition::Forward,
            "{path}"
        );
    }

    // Editor-native routes are none of the gateway's business
    assert!(table.route("/api/prompt").is_err());
    assert!(table.route("/").is_err());
}

#[tokio::test]
async fn state_builds_without_remote_configuration() {
    let state = build_state(AppConfig::default()).unwrap();
    assert!(!state.config.is_configured());
    assert!(state.cache.is_empty().await);

    // Metadata lookups degrade instead of failing
    let (path, words) = state.client.lora_info("missing").await;
    assert_eq!(path, "missing");
    assert!(words.is_empty());
    assert_eq!(state.client.lora_hash("missing").await, None);
}

#[tokio::test]
async fn local_handle_events_reach_subscribers() {
    let state = build_state(AppConfig::default()).unwrap();
    let mut rx = state.events.subscribe();

    state.events.emit(BridgeEvent::TriggerWordUpdate {
        node_id: -1,
        trigger_words: vec!["word".to_string()],
    });

    match rx.recv().await.unwrap() {
        BridgeEvent::TriggerWordUpdate { trigger_words, .. } => {
            assert_eq!(trigger_words, vec!["word".to_string()]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "Requires running gateway (cargo test --test gateway_tests -- --ignored --nocapture)"]
async fn health_endpoint_responds() {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{GATEWAY_URL}/health"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["success"], true);
}

#[tokio::test]
#[ignore = "Requires running gateway fronting a live remote instance"]
async fn forwarded_list_route_returns_items() {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{GATEWAY_URL}/api/lm/loras/list?page_size=10"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["items"].is_array());
}

#[tokio::test]
#[ignore = "Requires running gateway"]
async fn unrouted_path_is_not_found() {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{GATEWAY_URL}/definitely/not/a/route"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore = "Requires running gateway"]
async fn update_lora_code_acknowledges() {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{GATEWAY_URL}/api/lm/update-lora-code"))
        .json(&serde_json::json!({
            "node_id": -1,
            "graph_id": "root",
            "lora_code": "<lora:test:0.8>",
            "mode": "append",
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["broadcast"], true);
}
