//! Backends against a local fake provider server.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{Value, json};

use insight_ai::{
    AiError, AiSettings, CHAT_ERROR_MESSAGE, ChatMessage, ChatSession, Provider, RiskLevel,
    analyze_device, backend_for, predictive_analysis,
};
use insight_types::{Device, DeviceSpec, Reading};

const REPORT: &str = r#"{"riskLevel":"Medium","prediction":"Pressure creeping up","recommendations":["Inspect seals"]}"#;

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Recorded {
    fn push(&self, headers: HeaderMap, body: Value) {
        self.requests.lock().unwrap().push((headers, body));
    }

    fn last(&self) -> (HeaderMap, Value) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

fn sse(lines: &[String]) -> Response {
    let body: String = lines.iter().map(|l| format!("{l}\n\n")).collect();
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn openai(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let stream = body["stream"].as_bool().unwrap_or(false);
    rec.push(headers, body);
    if stream {
        let mut lines: Vec<String> = ["Pump ", "looks ", "fine."]
            .iter()
            .map(|t| format!("data: {}", json!({"choices": [{"delta": {"content": t}}]})))
            .collect();
        lines.push("data: [DONE]".into());
        lines.push(format!("data: {}", json!({"choices": [{"delta": {"content": "ignored"}}]})));
        sse(&lines)
    } else {
        Json(json!({"choices": [{"message": {"role": "assistant", "content": REPORT}}]})).into_response()
    }
}

async fn anthropic(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let stream = body["stream"].as_bool().unwrap_or(false);
    rec.push(headers, body);
    if stream {
        sse(&[
            "event: message_start".into(),
            format!("data: {}", json!({"type": "message_start", "message": {}})),
            format!("data: {}", json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "All "}})),
            format!("data: {}", json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "clear."}})),
            format!("data: {}", json!({"type": "message_stop"})),
        ])
    } else {
        Json(json!({"content": [{"type": "text", "text": REPORT}]})).into_response()
    }
}

async fn gemini(
    State(rec): State<Recorded>,
    Path(target): Path<String>,
    Query(query): Query<std::collections::HashMap<String, String>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    body["_target"] = json!(target);
    body["_alt"] = json!(query.get("alt"));
    rec.push(headers, body);
    if target.ends_with(":streamGenerateContent") {
        sse(&[
            format!("data: {}", json!({"candidates": [{"content": {"parts": [{"text": "Vibration "}], "role": "model"}}]})),
            format!("data: {}", json!({"candidates": [{"content": {"parts": [{"text": "is high."}], "role": "model"}}]})),
        ])
    } else {
        Json(json!({"candidates": [{"content": {"parts": [{"text": REPORT}], "role": "model"}}]})).into_response()
    }
}

async fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, r#"{"error":"bad key"}"#).into_response()
}

async fn spawn_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/openai/v1/chat/completions", post(openai))
        .route("/anthropic/v1/messages", post(anthropic))
        .route("/gemini/v1beta/models/{target}", post(gemini))
        .route("/denied/chat/completions", post(unauthorized))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

fn device() -> Device {
    Device::new(
        DeviceSpec::new("pmp-003", "Coolant Pump Gamma", "Modbus RTU"),
        Reading::now(78.0, 182.0, 3.6),
    )
}

fn settings(base: &str, provider: Provider) -> AiSettings {
    let mut settings = AiSettings::default();
    settings.provider = provider;
    settings.gemini.api_key = "gem-key".into();
    settings.gemini.base_url = Some(format!("{base}/gemini/v1beta"));
    settings.openai.api_key = "sk-test".into();
    settings.openai.base_url = Some(format!("{base}/openai/v1/"));
    settings.anthropic.api_key = "ant-key".into();
    settings.anthropic.base_url = Some(format!("{base}/anthropic/v1"));
    settings.iotteam.api_key = "iot-key".into();
    settings.iotteam.base_url = Some(format!("{base}/denied"));
    settings
}

#[tokio::test]
async fn test_openai_analysis_and_chat() {
    let (base, recorded) = spawn_server().await;
    let settings = settings(&base, Provider::OpenAi);
    let backend = backend_for(&settings, reqwest::Client::new()).unwrap();

    let analysis = analyze_device(backend.as_ref(), &device()).await.unwrap();
    assert_eq!(analysis.risk_level, RiskLevel::Medium);
    let (headers, body) = recorded.last();
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert!(body["messages"][0]["content"].as_str().unwrap().contains("Coolant Pump Gamma"));

    let mut session = ChatSession::with_history(vec![
        ChatMessage::user("hi"),
        ChatMessage::model("hello"),
    ]);
    let reply = session.send("How is the pump?", backend.as_ref(), &[device()]).await.unwrap();
    assert_eq!(reply.text(), "Pump looks fine.");

    let (_, body) = recorded.last();
    assert_eq!(body["stream"], true);
    let roles: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["system", "user", "assistant", "user"]);
    assert!(body["messages"][0]["content"].as_str().unwrap().contains("pmp-003"));
}

#[tokio::test]
async fn test_anthropic_analysis_and_chat() {
    let (base, recorded) = spawn_server().await;
    let settings = settings(&base, Provider::Anthropic);

    let analysis = predictive_analysis(&settings, reqwest::Client::new(), &device())
        .await
        .unwrap();
    assert_eq!(analysis.recommendations, ["Inspect seals"]);
    let (headers, body) = recorded.last();
    assert_eq!(headers["x-api-key"], "ant-key");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["max_tokens"], 1024);

    let backend = backend_for(&settings, reqwest::Client::new()).unwrap();
    let mut stream = backend
        .stream_chat("sys", &[ChatMessage::user("status?")])
        .await
        .unwrap();
    let mut text = String::new();
    while let Some(token) = stream.next().await {
        text.push_str(&token.unwrap());
    }
    assert_eq!(text, "All clear.");
    let (_, body) = recorded.last();
    assert_eq!(body["system"], "sys");
    assert_eq!(body["max_tokens"], 2048);
}

#[tokio::test]
async fn test_gemini_analysis_and_chat() {
    let (base, recorded) = spawn_server().await;
    let settings = settings(&base, Provider::Gemini);
    let backend = backend_for(&settings, reqwest::Client::new()).unwrap();

    let analysis = analyze_device(backend.as_ref(), &device()).await.unwrap();
    assert_eq!(analysis.prediction, "Pressure creeping up");
    let (headers, body) = recorded.last();
    assert_eq!(headers["x-goog-api-key"], "gem-key");
    assert_eq!(body["_target"], "gemini-2.5-flash:generateContent");
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");

    let mut session = ChatSession::new();
    let reply = session.send("vibration?", backend.as_ref(), &[]).await.unwrap();
    assert_eq!(reply.text(), "Vibration is high.");
    let (_, body) = recorded.last();
    assert_eq!(body["_target"], "gemini-2.5-flash:streamGenerateContent");
    assert_eq!(body["_alt"], "sse");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "vibration?");
    assert!(body["systemInstruction"]["parts"][0]["text"].as_str().unwrap().contains("Current time is"));
}

#[tokio::test]
async fn test_error_status_surfaces() {
    let (base, _) = spawn_server().await;
    let settings = settings(&base, Provider::IotTeam);
    let backend = backend_for(&settings, reqwest::Client::new()).unwrap();

    match backend.analyze("prompt").await {
        Err(AiError::Api { provider, status, body }) => {
            assert_eq!(provider, Provider::IotTeam);
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("expected API error, got {:?}", other.map(|_| ())),
    }

    let mut session = ChatSession::new();
    let reply = session.send("hi", backend.as_ref(), &[]).await.unwrap();
    assert_eq!(reply.text(), CHAT_ERROR_MESSAGE);
    assert!(predictive_analysis(&settings, reqwest::Client::new(), &device()).await.is_none());
}
