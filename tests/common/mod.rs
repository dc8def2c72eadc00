use campus_counsel::config::{ConsultationConfig, LlmConfig};
use campus_counsel::consultation::ConsultationService;
use campus_counsel::providers::ChatGateway;
use campus_counsel::storage::SqliteStorage;
use campus_counsel::telemetry::TracingTelemetry;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("consultations.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Chat-completions config pointing at a mock server
#[allow(dead_code)]
pub fn chat_completions_config(server_uri: &str) -> LlmConfig {
    LlmConfig {
        api_url: format!("{}/v1", server_uri),
        api_key: Some("test-key".to_string()),
        model: Some("gpt-4o-mini".to_string()),
        ..Default::default()
    }
}

/// Successful chat-completions response body
#[allow(dead_code)]
pub fn chat_completion_body(reply: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply },
            "finish_reason": "stop"
        }]
    })
}

/// Service over temp SQLite storage and the given LLM config
#[allow(dead_code)]
pub fn create_service(llm: &LlmConfig) -> (Arc<ConsultationService>, TempDir) {
    let (storage, tmp) = create_temp_storage();
    let telemetry = TracingTelemetry::shared();
    let gateway = ChatGateway::new(llm, telemetry.clone()).expect("failed to create gateway");
    let service = ConsultationService::new(
        Arc::new(storage),
        Arc::new(gateway),
        telemetry,
        &ConsultationConfig::default(),
    );
    (Arc::new(service), tmp)
}

/// Request bodies received by a mock server, decoded as JSON
#[allow(dead_code)]
pub async fn received_bodies(server: &wiremock::MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| !r.body.is_empty())
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}
