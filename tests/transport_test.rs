// Integration tests for the HTTP transports, report store and asset fetch

use mockito::Matcher;
use qrqc::config::{AssetLoader, AssetsConfig};
use qrqc::conversation::ChatTurn;
use qrqc::report::{ProxyReportStore, ReportStore, StoredReport};
use qrqc::transport::{
    GatedTransport, GeminiTransport, PromptRequest, ProxyTransport, QuotaGate, Transport,
};
use qrqc::QrqcError;
use serde_json::json;
use std::sync::Arc;

fn candidate_body(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

fn request() -> PromptRequest {
    PromptRequest::new(
        vec![ChatTurn::initial_problem("Machine X stops frequently")],
        "Problem: Machine X stops frequently",
    )
}

#[tokio::test]
async fn test_gemini_returns_candidate_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Regex(r"^/models/gemini-2\.0-flash:generateContent".into()))
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::PartialJson(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "Machine X stops frequently"}]},
                {"role": "user", "parts": [{"text": "Problem: Machine X stops frequently"}]}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candidate_body("When did it start?"))
        .create_async()
        .await;

    let transport = GeminiTransport::new("test-key".into(), 5)
        .unwrap()
        .with_base_url(server.url());

    let reply = transport.send_prompt(&request()).await.unwrap();
    assert_eq!(reply, "When did it start?");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_429_is_quota_and_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .with_status(429)
        .with_body(r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#)
        .expect(1)
        .create_async()
        .await;

    let transport = GeminiTransport::new("test-key".into(), 5)
        .unwrap()
        .with_base_url(server.url());

    let result = transport.send_prompt(&request()).await;
    assert!(matches!(result, Err(QrqcError::QuotaExceeded { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_server_error_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .with_status(503)
        .with_body("unavailable")
        .expect(3)
        .create_async()
        .await;

    let transport = GeminiTransport::new("test-key".into(), 5)
        .unwrap()
        .with_base_url(server.url());

    let result = transport.send_prompt(&request()).await;
    assert!(matches!(result, Err(QrqcError::Transport(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_posts_form_and_unwraps_envelope() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/wp-admin/admin-ajax.php")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("action".into(), "gemini_proxy_request".into()),
            Matcher::UrlEncoded("nonce".into(), "abc123".into()),
            Matcher::Regex("payload_json=".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"success": true, "data": serde_json::from_str::<serde_json::Value>(&candidate_body("Who noticed it?")).unwrap()})
                .to_string(),
        )
        .create_async()
        .await;

    let transport = ProxyTransport::new(format!("{}/wp-admin/admin-ajax.php", server.url()), 5)
        .unwrap()
        .with_nonce("abc123");

    let reply = transport.send_prompt(&request()).await.unwrap();
    assert_eq!(reply, "Who noticed it?");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_relayed_429_is_quota() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ajax")
        .with_status(500)
        .with_body(r#"{"success": false, "data": {"message": "Gemini API error (HTTP 429)"}}"#)
        .expect(1)
        .create_async()
        .await;

    let transport = ProxyTransport::new(format!("{}/ajax", server.url()), 5).unwrap();

    let result = transport.send_prompt(&request()).await;
    assert!(matches!(result, Err(QrqcError::QuotaExceeded { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_forwarded_rate_limit_trips_quota_gate() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ajax")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "data": {"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let proxy = ProxyTransport::new(format!("{}/ajax", server.url()), 5).unwrap();
    let gate = Arc::new(QuotaGate::new(60));
    let transport = GatedTransport::new(Arc::new(proxy), gate.clone());

    let first = transport.send_prompt(&request()).await;
    assert!(matches!(first, Err(QrqcError::QuotaExceeded { until: Some(_) })));

    // Gate is armed, so no second request reaches the relay
    let second = transport.send_prompt(&request()).await;
    assert!(matches!(second, Err(QrqcError::QuotaExceeded { .. })));
    assert!(gate.unavailable_until().is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_store_uploads_base64_report() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ajax")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("action".into(), "store_report".into()),
            Matcher::UrlEncoded("file_name".into(), "report_20261014_093700.pdf".into()),
            Matcher::UrlEncoded("problem_statement".into(), "Machine X stops frequently".into()),
            // base64("%PDF")
            Matcher::UrlEncoded("report_content".into(), "JVBERg==".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"success": true, "data": {"message": "stored"}}"#)
        .create_async()
        .await;

    let store = ProxyReportStore::new(format!("{}/ajax", server.url()), None).unwrap();
    store
        .store(&StoredReport {
            file_name: "report_20261014_093700.pdf".into(),
            problem_statement: "Machine X stops frequently".into(),
            content: b"%PDF".to_vec(),
        })
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_store_failure_is_persistence_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ajax")
        .with_status(200)
        .with_body(r#"{"success": false, "data": "Impossible de sauvegarder le fichier."}"#)
        .create_async()
        .await;

    let store = ProxyReportStore::new(format!("{}/ajax", server.url()), None).unwrap();
    let result = store
        .store(&StoredReport {
            file_name: "r.pdf".into(),
            problem_statement: String::new(),
            content: vec![],
        })
        .await;
    assert!(matches!(result, Err(QrqcError::Persistence(msg)) if msg.contains("sauvegarder")));
}

#[tokio::test]
async fn test_assets_fetched_once_over_http() {
    let mut server = mockito::Server::new_async().await;
    let prompts = server
        .mock("GET", "/qrqc_config.json")
        .with_status(200)
        .with_body(
            json!({
                "prompts": {"initial": "{{probleme_initial}}", "followUp": "{{reponse_utilisateur}}", "reportGeneration": "r"},
                "schema": {"type": "OBJECT"}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let template = server
        .mock("GET", "/qrqc_report_template.json")
        .with_status(200)
        .with_body(r#"[{"type": "header", "text": "QRQC"}, {"type": "chat_transcript"}]"#)
        .expect(1)
        .create_async()
        .await;

    let loader = AssetLoader::new(AssetsConfig {
        prompts_url: format!("{}/qrqc_config.json", server.url()),
        template_url: format!("{}/qrqc_report_template.json", server.url()),
    })
    .unwrap();

    let first = loader.get().await.unwrap();
    let second = loader.get().await.unwrap();

    assert_eq!(first.template.len(), 2);
    assert_eq!(second.prompts.initial_prompt("x"), "x");
    prompts.assert_async().await;
    template.assert_async().await;
}

#[tokio::test]
async fn test_asset_http_error_is_config_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let loader = AssetLoader::new(AssetsConfig {
        prompts_url: format!("{}/missing.json", server.url()),
        template_url: format!("{}/missing.json", server.url()),
    })
    .unwrap();

    assert!(matches!(loader.get().await, Err(QrqcError::Config(_))));
}

#[tokio::test]
async fn test_shipped_assets_load_from_disk() {
    let root = env!("CARGO_MANIFEST_DIR");
    let loader = AssetLoader::new(AssetsConfig {
        prompts_url: format!("{}/assets/json/qrqc_config.json", root),
        template_url: format!("{}/assets/json/qrqc_report_template.json", root),
    })
    .unwrap();

    let assets = loader.get().await.unwrap();
    assert!(assets.prompts.initial_prompt("Leak").contains("Leak"));
    assert!(assets.prompts.prompts.resume.is_some());
    assert_eq!(assets.prompts.required_fields().len(), 4);
    assert!(!assets.template.is_empty());
}
