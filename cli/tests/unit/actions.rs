//! Post-run actions: builtins, API payload expansion, auth, and failures
//! scoped to the action.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use stagehand_cli::application::ports::NullSink;
use stagehand_cli::application::services::actions::{ActionContext, run_action};
use stagehand_cli::application::services::modules::{ModuleRun, run_module};
use stagehand_cli::domain::action::{ActionOutcome, ApiBody, HttpMethod};
use stagehand_cli::domain::error::ActionError;
use stagehand_cli::domain::manifest::ModuleManifest;
use stagehand_cli::infra::token::StaticTokenProvider;

use crate::helpers;
use crate::mocks::{MockRunner, MockTransport, captured};

const MODULE: &str = r#"{
  "id": "artists",
  "name": "Artists",
  "runtime": {"type": "cli", "command": "python3"},
  "output": {"selectable": true, "columns": [{"key": "email", "label": "Email"}, {"key": "name", "label": "Name"}]},
  "actions": [
    {"id": "copy", "label": "Copy emails", "type": "builtin", "action": "copy_column", "column": "email"},
    {"id": "json", "label": "Copy all", "type": "builtin", "action": "copy_all_as_structured"},
    {"id": "export", "label": "Export", "type": "builtin", "action": "export_artifact"},
    {"id": "subscribe", "label": "Subscribe", "type": "api", "endpoint": "newsletter/subscribe",
     "payload": {"contacts": "{{selected_rows}}", "list": "{{settings.newsletter_list}}", "meta": {"source": "stagehand"}},
     "requires_auth": true},
    {"id": "ping", "label": "Ping", "type": "api", "endpoint": "https://hooks.example.org/ping", "method": "GET"}
  ]
}"#;

const RESULT: &str = r#"{"success": true, "results": [
  {"name": "Ana", "email": "ana@x.test"},
  {"name": "Bo, Jr.", "email": "bo@x.test"},
  {"name": "Cy", "email": "cy@x.test"}
]}"#;

async fn fixture(dir: &std::path::Path) -> (ModuleManifest, ModuleRun) {
    let manifest = helpers::module(dir, "artists", MODULE);
    let runner = MockRunner::with(vec![Ok(captured(0, &[RESULT]))]);
    let run = run_module(&manifest, &BTreeMap::new(), &runner, &NullSink, Duration::from_secs(5))
        .await
        .unwrap();
    (manifest, run)
}

fn settings() -> BTreeMap<String, String> {
    BTreeMap::from([("newsletter_list".to_string(), "artists".to_string())])
}

#[tokio::test]
async fn test_api_action_expands_selected_rows_and_settings() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, mut run) = fixture(dir.path()).await;
    run.selection.toggle(1); // deselect Bo

    let transport = MockTransport::responding(201, r#"{"subscribed": 2}"#);
    let settings = settings();
    let ctx = ActionContext {
        transport: &transport,
        tokens: &StaticTokenProvider(Some("tok".into())),
        settings: &settings,
        api_base_url: Some("https://example.org/wp-json/"),
    };

    let outcome = run_action(&manifest, "subscribe", &run, &ctx).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Api {
            status: 201,
            body: ApiBody::Json(json!({"subscribed": 2})),
        }
    );

    let request = &transport.requests.borrow()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, "https://example.org/wp-json/newsletter/subscribe");
    assert_eq!(request.bearer_token.as_deref(), Some("tok"));
    assert_eq!(
        request.body,
        Some(json!({
            "contacts": [
                {"name": "Ana", "email": "ana@x.test"},
                {"name": "Cy", "email": "cy@x.test"}
            ],
            "list": "artists",
            "meta": {"source": "stagehand"}
        }))
    );
}

#[tokio::test]
async fn test_authenticated_action_without_token_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, run) = fixture(dir.path()).await;
    let transport = MockTransport::responding(200, "ok");
    let settings = settings();
    let ctx = ActionContext {
        transport: &transport,
        tokens: &StaticTokenProvider(None),
        settings: &settings,
        api_base_url: Some("https://example.org"),
    };

    let err = run_action(&manifest, "subscribe", &run, &ctx).await.unwrap_err();
    assert!(matches!(err, ActionError::NotAuthenticated));
    assert!(transport.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_rejection_and_network_errors_leave_run_intact() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, run) = fixture(dir.path()).await;
    let before = run.rows.clone();
    let settings = settings();
    let tokens = StaticTokenProvider(Some("tok".into()));

    let rejecting = MockTransport::responding(422, "list not found");
    let ctx = ActionContext {
        transport: &rejecting,
        tokens: &tokens,
        settings: &settings,
        api_base_url: Some("https://example.org"),
    };
    let err = run_action(&manifest, "subscribe", &run, &ctx).await.unwrap_err();
    assert!(matches!(err, ActionError::Rejected { status: 422, ref body } if body == "list not found"));

    let offline = MockTransport::offline();
    let ctx = ActionContext {
        transport: &offline,
        tokens: &tokens,
        settings: &settings,
        api_base_url: Some("https://example.org"),
    };
    let err = run_action(&manifest, "subscribe", &run, &ctx).await.unwrap_err();
    assert!(matches!(err, ActionError::Network(_)));
    assert_eq!(run.rows, before);
}

#[tokio::test]
async fn test_missing_setting_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, run) = fixture(dir.path()).await;
    let transport = MockTransport::responding(200, "");
    let ctx = ActionContext {
        transport: &transport,
        tokens: &StaticTokenProvider(Some("tok".into())),
        settings: &BTreeMap::<String, String>::new(),
        api_base_url: Some("https://example.org"),
    };
    let err = run_action(&manifest, "subscribe", &run, &ctx).await.unwrap_err();
    assert!(matches!(err, ActionError::UnresolvedSetting(ref key) if key == "newsletter_list"));
    assert!(transport.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_get_action_sends_no_body_and_keeps_text_response() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, run) = fixture(dir.path()).await;
    let transport = MockTransport::responding(200, "pong");
    let ctx = ActionContext {
        transport: &transport,
        tokens: &StaticTokenProvider(None),
        settings: &settings(),
        api_base_url: None,
    };
    let outcome = run_action(&manifest, "ping", &run, &ctx).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Api {
            status: 200,
            body: ApiBody::Text("pong".into()),
        }
    );
    let request = &transport.requests.borrow()[0];
    assert_eq!(request.method, HttpMethod::Get);
    assert!(request.body.is_none());
    assert!(request.bearer_token.is_none());
}

#[tokio::test]
async fn test_builtin_actions_follow_selection() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, mut run) = fixture(dir.path()).await;
    let transport = MockTransport::responding(200, "");
    let settings = settings();
    let ctx = ActionContext {
        transport: &transport,
        tokens: &StaticTokenProvider(None),
        settings: &settings,
        api_base_url: None,
    };

    let copied = run_action(&manifest, "copy", &run, &ctx).await.unwrap();
    assert_eq!(
        copied,
        ActionOutcome::Clipboard {
            text: "ana@x.test\nbo@x.test\ncy@x.test".into()
        }
    );

    run.selection.clear();
    run.selection.toggle(1);
    let ActionOutcome::Export { file_name, contents } =
        run_action(&manifest, "export", &run, &ctx).await.unwrap()
    else {
        panic!("expected an export");
    };
    assert!(file_name.starts_with("artists-") && file_name.ends_with(".csv"));
    assert_eq!(contents, "Email,Name\r\nbo@x.test,\"Bo, Jr.\"\r\n");

    let ActionOutcome::Clipboard { text } = run_action(&manifest, "json", &run, &ctx).await.unwrap()
    else {
        panic!("expected clipboard text");
    };
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, json!([{"name": "Bo, Jr.", "email": "bo@x.test"}]));
    assert!(transport.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_empty_selection_and_unknown_action() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, mut run) = fixture(dir.path()).await;
    let transport = MockTransport::responding(200, "");
    let settings = settings();
    let ctx = ActionContext {
        transport: &transport,
        tokens: &StaticTokenProvider(None),
        settings: &settings,
        api_base_url: None,
    };

    run.selection.clear();
    assert!(matches!(
        run_action(&manifest, "copy", &run, &ctx).await,
        Err(ActionError::NothingSelected)
    ));
    assert!(matches!(
        run_action(&manifest, "nope", &run, &ctx).await,
        Err(ActionError::UnknownAction(_))
    ));
}
