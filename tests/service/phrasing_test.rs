//! Phrasing service wiring and request validation tests.

use std::sync::Arc;
use std::time::Duration;

use llm_phraser::catalog::keys;
use llm_phraser::config::{LlmProviderKind, PhraserConfig};
use llm_phraser::prompt::{PhraserInput, PromptBuilder, PromptMode};
use llm_phraser::providers::echo::TemplateEchoClient;
use llm_phraser::service::{load_builder, InputError, PhraseRequest, PhrasingService};

fn echo_config() -> PhraserConfig {
    let mut config = PhraserConfig::default();
    config.llm.provider = LlmProviderKind::None;
    config
}

#[test]
fn into_input_defaults_missing_key_to_fallback() {
    let input = PhraseRequest::default()
        .into_input()
        .expect("empty request is valid");
    assert_eq!(input, PhraserInput::new(keys::DEFAULT, None));
}

#[test]
fn into_input_rejects_negative_and_non_finite_prices() {
    let negative = PhraseRequest {
        decision_key: Some("STANDARD_COUNTER".to_owned()),
        counter_price: Some(-1.0),
        ..PhraseRequest::default()
    };
    assert_eq!(negative.into_input(), Err(InputError::NegativePrice(-1.0)));

    for price in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let request = PhraseRequest {
            counter_price: Some(price),
            ..PhraseRequest::default()
        };
        assert_eq!(request.into_input(), Err(InputError::NonFinitePrice));
    }
}

#[test]
fn into_input_accepts_zero_price() {
    let request = PhraseRequest {
        decision_key: Some("ACCEPT_FINAL".to_owned()),
        counter_price: Some(0.0),
        ..PhraseRequest::default()
    };
    assert!(request.into_input().is_ok());
}

#[test]
fn response_key_is_used_when_decision_key_is_absent() {
    let request: PhraseRequest =
        serde_json::from_str(r#"{"response_key": "FINAL_OFFER", "counter_price": 1}"#)
            .expect("should deserialize");
    let input = request.into_input().expect("should validate");
    assert_eq!(input, PhraserInput::new(keys::FINAL_OFFER, Some(1.0)));
}

#[test]
fn decision_key_wins_when_both_keys_are_sent() {
    let request: PhraseRequest = serde_json::from_str(
        r#"{"decision_key": "STANDARD_COUNTER", "response_key": "REJECT_LOWBALL", "counter_price": 48000.0}"#,
    )
    .expect("both key fields should deserialize");
    let input = request.into_input().expect("should validate");
    assert_eq!(input.decision_key.as_str(), keys::STANDARD_COUNTER);
}

#[tokio::test]
async fn echo_service_returns_rendered_template() {
    let service = PhrasingService::from_config(&echo_config()).expect("service should build");
    let input = PhraserInput::new(keys::ACCEPT_FINAL, Some(50_000.0));

    let output = service.phrase(&input).await.expect("echo should phrase");
    assert!(output.response_text.contains("$50,000"));
    assert!(!output.response_text.starts_with("Template:"));
}

#[tokio::test]
async fn echo_service_serves_catalog_without_template_prefix() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        "version = \"plain\"\n[families]\nDEFAULT = [\"Thanks for reaching out.\"]\n",
    )
    .expect("should write catalog");

    let mut config = echo_config();
    config.prompt.catalog_path = Some(path);
    config.validate().expect("echo with paraphrase mode is valid");

    let service = PhrasingService::from_config(&config).expect("service should build");
    let output = service
        .phrase(&PhraserInput::new("ANY", None))
        .await
        .expect("echo should phrase unprefixed templates");
    assert_eq!(output.response_text, "Thanks for reaching out.");
}

#[tokio::test]
async fn echo_service_trims_and_guards_like_any_client() {
    let service = PhrasingService::new(
        Arc::new(PromptBuilder::builtin(PromptMode::Paraphrase)),
        Arc::new(TemplateEchoClient),
        Duration::from_secs(1),
    );
    let output = service
        .phrase(&PhraserInput::new(keys::REJECT_LOWBALL, None))
        .await
        .expect("echo should phrase");
    assert_eq!(output.response_text, output.response_text.trim());
    assert!(!output.response_text.starts_with("Template:"));
}

#[test]
fn from_config_fails_without_api_key() {
    let config = PhraserConfig::default();
    assert!(config.llm.api_key.is_none());
    assert!(PhrasingService::from_config(&config).is_err());
}

#[test]
fn load_builder_reads_catalog_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        r#"
version = "custom-1"

[families]
ACCEPT_FINAL = ["Template: Sold at {price}."]
DEFAULT = ["Template: Hi there."]
"#,
    )
    .expect("should write catalog");

    let mut config = echo_config();
    config.prompt.catalog_path = Some(path);

    let builder = load_builder(&config).expect("catalog should load");
    assert_eq!(builder.catalog().version(), "custom-1");
    assert_eq!(
        builder.possible_user_prompts(&PhraserInput::new(keys::ACCEPT_FINAL, Some(9.0))),
        ["Template: Sold at $9."]
    );
}

#[test]
fn load_builder_reports_invalid_catalog_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        "version = \"bad\"\n[families]\nDEFAULT = [\"Template: below my cost\"]\n",
    )
    .expect("should write catalog");

    let mut config = echo_config();
    config.prompt.catalog_path = Some(path);

    let err = load_builder(&config).expect_err("disclosing catalog must fail");
    assert!(format!("{err:#}").contains("my cost"));
}

#[test]
fn load_builder_defaults_to_builtin_catalog_for_mode() {
    let mut config = echo_config();
    config.prompt.mode = PromptMode::Instruction;
    let builder = load_builder(&config).expect("builtin catalog");
    assert_eq!(builder.mode(), PromptMode::Instruction);
    assert!(builder.catalog().contains(&keys::FINAL_OFFER.into()));
}

#[test]
fn demo_config_parses_and_points_at_demo_catalog() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let contents =
        std::fs::read_to_string(root.join("demos/phraser.toml")).expect("demo config exists");
    let mut config = PhraserConfig::from_toml(&contents).expect("demo config should parse");
    assert_eq!(config.llm.provider, LlmProviderKind::Groq);

    let catalog_path = config
        .prompt
        .catalog_path
        .clone()
        .expect("demo config sets a catalog");
    config.prompt.catalog_path = Some(root.join(catalog_path));
    let builder = load_builder(&config).expect("demo catalog should load");
    assert_eq!(builder.catalog().version(), "demo-1");
}
