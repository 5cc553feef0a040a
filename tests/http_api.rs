//! HTTP surface tests over a real listener

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::*;
use quill::core::Config;
use quill::server::{build_router, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestApp {
    base: String,
    dir: TempDir,
    factory: Arc<ScriptedFactory>,
    client: reqwest::Client,
}

impl TestApp {
    async fn spawn(provider: ScriptedProvider) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.sandbox.data_dir = dir.path().join("data");
        config.agent.typing_delay_ms = 0;
        config.credentials.aliases =
            HashMap::from([("test".to_string(), "sk-real-token".to_string())]);

        let factory = Arc::new(ScriptedFactory::new(provider));
        let state = AppState::new(config, factory.clone()).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            dir,
            factory,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn data(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join("data").join(rel)
    }
}

/// `data:` payloads of an SSE body, in order
fn sse_payloads(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn(ScriptedProvider::replies(&[])).await;

    let body: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_agent_stream_over_sse() {
    let app = TestApp::spawn(ScriptedProvider::replies(&[
        &tool_call(json!({"action": "create_file", "path": "ch1.md", "content": "Once"})),
        "[TO_USER]Ok",
    ]))
    .await;

    let res = app
        .client
        .post(app.url("/api/agent/stream"))
        .json(&json!({
            "apiKey": "test",
            "messages": [{"role": "user", "content": "start chapter one"}],
            "selectedFile": "data/ch1.md"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let payloads = sse_payloads(&res.text().await.unwrap());
    assert_eq!(payloads.last().map(String::as_str), Some("[DONE]"));
    assert!(payloads.contains(&r#"{"choices":[{"delta":{"content":"O"}}]}"#.to_string()));

    let flush: Value = serde_json::from_str(&payloads[payloads.len() - 2]).unwrap();
    assert_eq!(flush["changedFiles"], json!(["data/ch1.md"]));
    assert_eq!(flush["modifiedLines"]["data/ch1.md"], json!([1]));
    assert_eq!(flush["diffData"]["data/ch1.md"]["newContent"], "Once");

    let tool: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(tool["toolEvent"]["status"], "start");
    assert_eq!(tool["toolEvent"]["agent"], "main_agent");

    assert_eq!(
        *app.factory.tokens.lock().unwrap(),
        vec!["sk-real-token".to_string()]
    );
    assert_eq!(std::fs::read_to_string(app.data("ch1.md")).unwrap(), "Once");
}

#[tokio::test]
async fn test_stream_requires_api_key() {
    let app = TestApp::spawn(ScriptedProvider::replies(&[])).await;

    for route in ["/api/agent/stream", "/api/chat/stream"] {
        let res = app
            .client
            .post(app.url(route))
            .json(&json!({"messages": []}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Missing API key");
    }
    assert_eq!(app.factory.provider.calls(), 0);
}

#[tokio::test]
async fn test_chat_stream_over_sse() {
    let app = TestApp::spawn(ScriptedProvider::replies(&["Hey"])).await;

    let body = app
        .client
        .post(app.url("/api/chat/stream"))
        .json(&json!({
            "apiKey": "sk-direct",
            "systemPrompt": "Be brief.",
            "messages": [{"Role": "user", "Content": "hi"}]
        }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 4);
    assert_eq!(payloads[3], "[DONE]");
    assert_eq!(app.factory.provider.request(0).len(), 2);
    assert_eq!(
        *app.factory.tokens.lock().unwrap(),
        vec!["sk-direct".to_string()]
    );
}

#[tokio::test]
async fn test_file_lifecycle() {
    let app = TestApp::spawn(ScriptedProvider::replies(&[])).await;
    let c = &app.client;

    let res = c
        .put(app.url("/api/files/data/book/ch1.md"))
        .json(&json!({"content": "line one\nline two"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let read: Value = c
        .get(app.url("/api/files/data/book/ch1.md"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["content"], "line one\nline two");

    let created = c
        .post(app.url("/api/files"))
        .json(&json!({"path": "data", "type": "file", "name": "notes.md"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);

    let again = c
        .post(app.url("/api/files"))
        .json(&json!({"path": "data", "type": "file", "name": "notes.md"}))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["error"], "File or folder already exists");

    let tree: Value = c
        .get(app.url("/api/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tree[0]["name"], "book");
    assert_eq!(tree[0]["type"], "folder");
    assert_eq!(tree[0]["children"][0]["path"], "data/book/ch1.md");
    assert_eq!(tree[1]["path"], "data/notes.md");

    let renamed = c
        .patch(app.url("/api/files/data/notes.md"))
        .json(&json!({"newName": "ideas.md"}))
        .send()
        .await
        .unwrap();
    assert_eq!(renamed.status(), StatusCode::OK);
    assert!(app.data("ideas.md").exists());

    let clash = c
        .patch(app.url("/api/files/data/ideas.md"))
        .json(&json!({"newName": "book"}))
        .send()
        .await
        .unwrap();
    assert_eq!(clash.status(), StatusCode::CONFLICT);

    let deleted = c
        .delete(app.url("/api/files/data/book"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(!app.data("book").exists());

    let missing = c
        .get(app.url("/api/files/data/book/ch1.md"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn test_line_endpoints() {
    let app = TestApp::spawn(ScriptedProvider::replies(&[])).await;
    std::fs::write(app.data("ch.md"), "a\nb\nc").unwrap();
    let c = &app.client;

    let line: Value = c
        .get(app.url("/api/lines/data/ch.md?line=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(line, json!({"content": "b", "lineNumber": 2, "totalLines": 3}));

    let edited: Value = c
        .put(app.url("/api/lines/data/ch.md?line=3"))
        .json(&json!({"content": "C"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        edited,
        json!({
            "success": true,
            "lineNumber": 3,
            "oldContent": "c",
            "newContent": "C",
            "totalLines": 3
        })
    );
    assert_eq!(std::fs::read_to_string(app.data("ch.md")).unwrap(), "a\nb\nC");

    let too_far = c
        .get(app.url("/api/lines/data/ch.md?line=9"))
        .send()
        .await
        .unwrap();
    assert_eq!(too_far.status(), StatusCode::BAD_REQUEST);
    let body: Value = too_far.json().await.unwrap();
    assert_eq!(body["error"], "Line number 9 exceeds file length (3 lines)");

    let bad = c
        .get(app.url("/api/lines/data/ch.md?line=zero"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_restore_and_containment() {
    let app = TestApp::spawn(ScriptedProvider::replies(&[])).await;
    std::fs::write(app.data("ch.md"), "edited by agent").unwrap();
    let c = &app.client;

    let restored: Value = c
        .post(app.url("/api/files/restore"))
        .json(&json!({"path": "data/ch.md", "content": "first draft"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restored, json!({"ok": true}));
    assert_eq!(std::fs::read_to_string(app.data("ch.md")).unwrap(), "first draft");

    let no_path = c
        .post(app.url("/api/files/restore"))
        .json(&json!({"content": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(no_path.status(), StatusCode::BAD_REQUEST);

    let escape = c
        .post(app.url("/api/files"))
        .json(&json!({"path": "data", "type": "file", "name": "../../escape.md"}))
        .send()
        .await
        .unwrap();
    assert_eq!(escape.status(), StatusCode::FORBIDDEN);
    let body: Value = escape.json().await.unwrap();
    assert_eq!(body["error"], "Access denied");

    let root = c.delete(app.url("/api/files/data")).send().await.unwrap();
    assert_eq!(root.status(), StatusCode::FORBIDDEN);
    assert!(app.data("ch.md").exists());
}
