//! End-to-end dispatcher tests built from a Config, with wiremock standing in
//! for the model and the retrieval endpoint.

use serde_json::json;
use std::sync::Arc;
use switchboard_engine::config::Config;
use switchboard_engine::dispatcher::{Dispatcher, TASKS_DISABLED_NOTICE};
use switchboard_engine::intent::DomainTag;
use switchboard_engine::secrets::{SecretCache, SecretManager};
use sdk::errors::EngineError;
use sdk::service::QueryService;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn secrets() -> Arc<SecretCache> {
    Arc::new(SecretCache::new(Arc::new(SecretManager::new(
        "switchboard-dispatcher-test",
    ))))
}

fn config(model: &MockServer, kb: Option<&MockServer>) -> Config {
    let mut config = Config::default();
    config.llm.ollama.base_url = model.uri();
    // Never launch a real tool server from tests
    config.tasks.command = "/nonexistent/mcp-server".to_string();
    config.knowledge_base.knowledge_base_id = kb.map(|_| "KB123".to_string());
    config.knowledge_base.endpoint = kb.map(MockServer::uri);
    config
}

#[tokio::test]
async fn test_general_route_end_to_end() {
    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "<thinking>greet</thinking>こんにちは！" }
        })))
        .expect(1)
        .mount(&model)
        .await;

    let dispatcher = Dispatcher::from_config_with_secrets(&config(&model, None), secrets())
        .await
        .unwrap();

    let response = dispatcher.dispatch("こんにちは").await.unwrap();
    assert_eq!(response.domain, DomainTag::General);
    assert_eq!(response.text, "こんにちは！");
}

#[tokio::test]
async fn test_task_route_without_token_returns_notice() {
    if std::env::var("ASANA_ACCESS_TOKEN").is_ok() {
        return;
    }
    let model = MockServer::start().await;

    let dispatcher = Dispatcher::from_config_with_secrets(&config(&model, None), secrets())
        .await
        .unwrap();
    assert!(!dispatcher.status().tasks.enabled);

    let answer = dispatcher.generate("今週の期限のタスク").await.unwrap();
    assert_eq!(answer, TASKS_DISABLED_NOTICE);
}

#[tokio::test]
async fn test_unreachable_tool_server_leaves_tasks_disabled() {
    let model = MockServer::start().await;
    let secrets = secrets();
    secrets.insert("asana_access_token", "1/1234567890:abcdefabcdefabcdefabcdefabcdefab");

    let dispatcher = Dispatcher::from_config_with_secrets(&config(&model, None), secrets)
        .await
        .unwrap();

    let status = dispatcher.status();
    assert!(!status.tasks.enabled);
    assert!(!status.tasks.connected);
}

#[tokio::test]
async fn test_document_route_end_to_end() {
    let kb = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/knowledgebases/KB123/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retrievalResults": [{
                "content": { "text": "経費精算は翌月5日締めです。" },
                "location": { "s3Location": { "uri": "s3://docs/expense.md" } }
            }]
        })))
        .mount(&kb)
        .await;

    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("翌月5日締め"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "経費精算マニュアルによると、翌月5日締めです。" }
        })))
        .mount(&model)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "role": "assistant",
                "content": "{\"function\": \"search_knowledge_base\", \"arguments\": {\"query\": \"経費精算\"}}"
            }
        })))
        .mount(&model)
        .await;

    let dispatcher = Dispatcher::from_config_with_secrets(&config(&model, Some(&kb)), secrets())
        .await
        .unwrap();
    assert!(dispatcher.status().knowledge_base.enabled);

    let response = dispatcher.dispatch("経費精算の手順を知りたい").await.unwrap();
    assert_eq!(response.domain, DomainTag::Document);
    assert_eq!(response.text, "経費精算マニュアルによると、翌月5日締めです。");
}

#[tokio::test]
async fn test_backend_failure_is_an_error_not_text() {
    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&model)
        .await;

    let dispatcher = Dispatcher::from_config_with_secrets(&config(&model, None), secrets())
        .await
        .unwrap();

    let result = dispatcher.dispatch("hello").await;
    assert!(matches!(result, Err(EngineError::AllProvidersExhausted)));
}
