mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use campus_counsel::config::LlmConfig;
use campus_counsel::error::{categorize, ErrorCategory};
use campus_counsel::prompts::FALLBACK_REPLY;

use common::{chat_completion_body, chat_completions_config, create_service, received_bodies};

async fn mount_reply(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body(reply)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_message_creates_session_and_one_exchange() {
    let server = MockServer::start().await;
    mount_reply(&server, "Try breaking tasks down.").await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let exchange = service
        .send_message("u1", None, "I feel overwhelmed")
        .await
        .unwrap();
    assert_eq!(exchange.message, "I feel overwhelmed");
    assert_eq!(exchange.response, "Try breaking tasks down.");
    assert_eq!(exchange.user_id, "u1");

    let history = service.get_history("u1", &exchange.session_id).await.unwrap();
    assert_eq!(history, vec![exchange.clone()]);

    let sessions = service.list_sessions("u1").await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, exchange.session_id);
    assert!(sessions[0].updated_at >= sessions[0].created_at);
}

#[tokio::test]
async fn test_history_grows_with_each_send_and_is_replayed() {
    let server = MockServer::start().await;
    mount_reply(&server, "I hear you.").await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let first = service.send_message("u1", None, "one").await.unwrap();
    let sid = first.session_id.clone();
    service.send_message("u1", Some(&sid), "two").await.unwrap();
    service.send_message("u1", Some(&sid), "three").await.unwrap();

    let history = service.get_history("u1", &sid).await.unwrap();
    let messages: Vec<&str> = history.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["one", "two", "three"]);
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 3);
    let last = bodies[2]["messages"].as_array().unwrap();
    // system + 2 prior exchanges + new message
    assert_eq!(last.len(), 6);
    assert_eq!(last[1], json!({"role": "user", "content": "one"}));
    assert_eq!(last[2], json!({"role": "assistant", "content": "I hear you."}));
    assert_eq!(last[5], json!({"role": "user", "content": "three"}));
}

#[tokio::test]
async fn test_foreign_session_id_starts_new_session_without_leaking_history() {
    let server = MockServer::start().await;
    mount_reply(&server, "ok").await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let mine = service
        .send_message("u1", None, "something private")
        .await
        .unwrap();
    let theirs = service
        .send_message("u2", Some(&mine.session_id), "hello")
        .await
        .unwrap();

    assert_ne!(theirs.session_id, mine.session_id);
    assert_eq!(service.get_history("u1", &mine.session_id).await.unwrap().len(), 1);

    let bodies = received_bodies(&server).await;
    let second = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(second.len(), 2);
    assert!(!bodies[1].to_string().contains("something private"));
}

#[tokio::test]
async fn test_unknown_and_garbage_session_ids_start_new_sessions() {
    let server = MockServer::start().await;
    mount_reply(&server, "ok").await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let unknown = "7d444840-9dc0-11d1-b245-5ffdce74fad2";
    let a = service.send_message("u1", Some(unknown), "a").await.unwrap();
    assert_ne!(a.session_id, unknown);

    let b = service
        .send_message("u1", Some("'; DROP TABLE consultations; --"), "b")
        .await
        .unwrap();
    assert_ne!(b.session_id, a.session_id);
    assert_eq!(service.list_sessions("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limited_send_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let session = service.start_session("u1").await.unwrap();
    let err = service
        .send_message("u1", Some(&session.id), "hello")
        .await
        .unwrap_err();
    assert_eq!(categorize(&err), ErrorCategory::RateLimited);

    assert!(service.get_history("u1", &session.id).await.unwrap().is_empty());
    let sessions = service.list_sessions("u1").await.unwrap();
    assert_eq!(sessions[0].updated_at, session.updated_at);
}

#[tokio::test]
async fn test_empty_reply_is_persisted_as_fallback() {
    let server = MockServer::start().await;
    mount_reply(&server, "   ").await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let exchange = service.send_message("u1", None, "hello").await.unwrap();
    assert_eq!(exchange.response, FALLBACK_REPLY);

    let history = service.get_history("u1", &exchange.session_id).await.unwrap();
    assert_eq!(history[0].response, FALLBACK_REPLY);
}

#[tokio::test]
async fn test_missing_key_fails_after_session_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("ok")))
        .expect(0)
        .mount(&server)
        .await;
    let config = LlmConfig {
        api_key: None,
        ..chat_completions_config(&server.uri())
    };
    let (service, _tmp) = create_service(&config);

    let session = service.get_or_create_session("u1", None).await.unwrap();
    let err = service.send_in_session(&session, "hello").await.unwrap_err();
    assert_eq!(categorize(&err), ErrorCategory::ConfigurationMissing);
    assert!(service.get_history("u1", &session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_message_rejected_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("ok")))
        .expect(0)
        .mount(&server)
        .await;
    let (service, _tmp) = create_service(&chat_completions_config(&server.uri()));

    let text = "a".repeat(4001);
    let err = service.send_message("u1", None, &text).await.unwrap_err();
    assert_eq!(categorize(&err), ErrorCategory::InvalidInput);
    assert!(service.list_sessions("u1").await.unwrap().is_empty());
}
