//! Shared fixtures: a scripted LLM client and request helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use llm_phraser::prompt::{PromptBuilder, PromptMode, PromptPair};
use llm_phraser::providers::{LlmClient, ProviderError};
use llm_phraser::server;
use llm_phraser::service::PhrasingService;

pub const MAX_BODY_BYTES: usize = 1_024;

/// What the scripted client does on `generate`.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail,
    Hang,
}

/// LLM client that follows a script and records every prompt it receives.
pub struct ScriptedClient {
    script: Script,
    prompts: Mutex<Vec<PromptPair>>,
}

impl ScriptedClient {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<PromptPair> {
        self.prompts.lock().expect("prompt log lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(&self, prompt: &PromptPair) -> Result<String, ProviderError> {
        self.prompts.lock().expect("prompt log lock").push(prompt.clone());
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(ProviderError::HttpStatus {
                status: 503,
                body: "upstream unavailable".to_owned(),
            }),
            Script::Hang => {
                std::future::pending::<()>().await;
                Err(ProviderError::Unavailable("unreachable".to_owned()))
            }
        }
    }

    fn model_id(&self) -> &str {
        "test/scripted"
    }
}

pub fn builder() -> Arc<PromptBuilder> {
    Arc::new(PromptBuilder::builtin(PromptMode::Paraphrase))
}

pub fn app(builder: Arc<PromptBuilder>, client: Arc<ScriptedClient>) -> Router {
    let service = PhrasingService::new(builder, client, Duration::from_millis(200));
    server::router(service, MAX_BODY_BYTES)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn post_json(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/phrase")
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .expect("request should build")
}
